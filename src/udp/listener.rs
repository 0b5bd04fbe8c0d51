use std::sync::Arc;

use tracing::{debug, warn};
use transport::PacketEndpoint;

use crate::crypto::EncryptionKey;
use crate::pool::BufferPool;
use crate::salt::{RandomSaltGenerator, SaltGenerator};
use crate::security::ReplayProtector;
use crate::udp::ProxySocket;
use crate::Error;

/// Hands out [`ProxySocket`]s connected to one endpoint.
///
/// All sockets created by a listener share its key, buffer pool, salt
/// generator and replay protector.
pub struct PacketListener<E> {
    endpoint: E,
    key: Arc<EncryptionKey>,
    salt_generator: Arc<dyn SaltGenerator>,
    replay: Option<Arc<ReplayProtector>>,
    pool: Arc<BufferPool>,
}

impl<E: PacketEndpoint> PacketListener<E> {
    pub fn new(endpoint: E, key: Arc<EncryptionKey>) -> Self {
        Self {
            endpoint,
            key,
            salt_generator: Arc::new(RandomSaltGenerator),
            replay: None,
            pool: Arc::new(BufferPool::new()),
        }
    }

    pub fn set_salt_generator(&mut self, salt_generator: Arc<dyn SaltGenerator>) {
        self.salt_generator = salt_generator;
    }

    pub fn set_replay_protector(&mut self, protector: Option<Arc<ReplayProtector>>) {
        self.replay = protector;
    }

    #[inline]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Connect to the endpoint and wrap the connection.
    pub async fn listen_packet(&self) -> Result<ProxySocket<E::Conn>, Error> {
        let conn = match self.endpoint.connect_packet().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(message = "connect packet endpoint failed", %err);
                return Err(Error::EndpointUnreachable(err));
            }
        };

        debug!(message = "packet channel established", cipher = %self.key.kind());

        let mut socket = ProxySocket::with_pool(conn, self.key.clone(), self.pool.clone());
        socket.set_salt_generator(self.salt_generator.clone());
        socket.set_replay_protector(self.replay.clone());

        Ok(socket)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tokio::net::UdpSocket;
    use transport::UdpEndpoint;

    use super::*;
    use crate::crypto::CipherKind;
    use crate::udp::decrypt_payload;
    use crate::{Address, MAX_PACKET_SIZE};

    struct Unreachable;

    impl PacketEndpoint for Unreachable {
        type Conn = UdpSocket;

        async fn connect_packet(&self) -> io::Result<UdpSocket> {
            Err(io::ErrorKind::ConnectionRefused.into())
        }
    }

    fn key() -> Arc<EncryptionKey> {
        Arc::new(EncryptionKey::new(CipherKind::CHACHA20_POLY1305, "secret").unwrap())
    }

    #[tokio::test]
    async fn unreachable() {
        let listener = PacketListener::new(Unreachable, key());

        match listener.listen_packet().await {
            Err(Error::EndpointUnreachable(err)) => {
                assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused)
            }
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("connected to nowhere"),
        }
    }

    #[tokio::test]
    async fn sockets_share_key_and_pool() {
        crate::trace::test_init();

        let key = key();
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = UdpEndpoint::new(server.local_addr().unwrap().to_string());
        let listener = PacketListener::new(endpoint, key.clone());

        let first = listener.listen_packet().await.unwrap();
        let second = listener.listen_packet().await.unwrap();
        assert!(Arc::ptr_eq(first.pool(), second.pool()));
        assert!(Arc::ptr_eq(first.key(), second.key()));

        let target: Address = "9.9.9.9:53".parse().unwrap();
        first.send(&target, b"one").await.unwrap();
        second.send(&target, b"two").await.unwrap();
        assert_eq!(listener.pool().idle(), 1);

        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut received = Vec::new();
        for _ in 0..2 {
            let (n, _) = server.recv_from(&mut buf).await.unwrap();
            let (addr, range) = decrypt_payload(&mut buf[..n], &key).unwrap();
            assert_eq!(addr, target);
            received.push(buf[range].to_vec());
        }

        received.sort();
        assert_eq!(received, vec![b"one".to_vec(), b"two".to_vec()]);
    }
}
