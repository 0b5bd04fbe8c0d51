use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, trace, warn};
use transport::DatagramConn;

use crate::crypto::EncryptionKey;
use crate::pool::BufferPool;
use crate::salt::{RandomSaltGenerator, SaltGenerator};
use crate::security::ReplayProtector;
use crate::udp::crypto::{decrypt_payload, encrypt_payload};
use crate::{Address, Error};

async fn with_timeout<F, T>(timeout: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        None => fut.await,
        Some(d) => match time::timeout(d, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::ErrorKind::TimedOut.into()),
        },
    }
}

/// Encrypted datagram channel to a ShadowSocks server
///
/// Wraps a connected [`DatagramConn`], every `send` seals one packet and
/// every `recv` returns the data of one authenticated packet. Datagrams
/// which fail to authenticate, carry a malformed address or replay a known
/// salt are logged and dropped, `recv` keeps waiting for the next one.
pub struct ProxySocket<C> {
    conn: C,
    key: Arc<EncryptionKey>,
    salt_generator: Arc<dyn SaltGenerator>,
    replay: Option<Arc<ReplayProtector>>,
    pool: Arc<BufferPool>,
    send_timeout: Option<Duration>,
    recv_timeout: Option<Duration>,
}

impl<C: DatagramConn> ProxySocket<C> {
    pub fn new(conn: C, key: Arc<EncryptionKey>) -> Self {
        Self::with_pool(conn, key, Arc::new(BufferPool::new()))
    }

    /// Create a socket leasing its scratch buffers from `pool`
    pub fn with_pool(conn: C, key: Arc<EncryptionKey>, pool: Arc<BufferPool>) -> Self {
        Self {
            conn,
            key,
            salt_generator: Arc::new(RandomSaltGenerator),
            replay: None,
            pool,
            send_timeout: None,
            recv_timeout: None,
        }
    }

    pub fn set_salt_generator(&mut self, salt_generator: Arc<dyn SaltGenerator>) {
        self.salt_generator = salt_generator;
    }

    /// Drop received packets whose salt the protector has seen before.
    pub fn set_replay_protector(&mut self, protector: Option<Arc<ReplayProtector>>) {
        self.replay = protector;
    }

    pub fn set_timeouts(&mut self, send: Option<Duration>, recv: Option<Duration>) {
        self.send_timeout = send;
        self.recv_timeout = recv;
    }

    #[inline]
    pub fn key(&self) -> &Arc<EncryptionKey> {
        &self.key
    }

    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    #[inline]
    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Close the underlying connection
    pub fn close(self) {
        drop(self.conn)
    }

    /// Send `payload` to `addr` through the proxy, returns the payload length.
    pub async fn send(&self, addr: &Address, payload: &[u8]) -> Result<usize, Error> {
        let mut buf = self.pool.lease();
        let packet_len =
            encrypt_payload(&mut buf, addr, payload, &self.key, &*self.salt_generator)?;

        trace!(
            message = "udp proxy send",
            %addr,
            payload = payload.len(),
            packet = packet_len
        );

        let sent = with_timeout(self.send_timeout, self.conn.send(&buf[..packet_len])).await?;
        if sent != packet_len {
            warn!(
                message = "udp proxy send incomplete",
                %addr,
                expected = packet_len,
                sent
            );
        }

        Ok(payload.len())
    }

    /// Receive the next valid packet, copies its data to `buf` and returns
    /// the data length and the address it came from.
    ///
    /// If `buf` is too small, it is filled with the beginning of the data and
    /// [`Error::BufferTooSmall`] is returned.
    ///
    /// The receive timeout covers the whole call, dropped packets do not
    /// restart it.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, Address), Error> {
        match self.recv_timeout {
            None => self.recv_packet(buf).await,
            Some(d) => match time::timeout(d, self.recv_packet(buf)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::from(io::ErrorKind::TimedOut).into()),
            },
        }
    }

    async fn recv_packet(&self, buf: &mut [u8]) -> Result<(usize, Address), Error> {
        loop {
            let mut recv_buf = self.pool.lease();
            let n = self.conn.recv(&mut recv_buf).await?;

            let (addr, range) = match decrypt_payload(&mut recv_buf[..n], &self.key) {
                Ok(x) => x,
                Err(err) => {
                    debug!(message = "drop invalid udp packet", packet = n, %err);
                    continue;
                }
            };

            if let Some(replay) = &self.replay {
                let salt = &recv_buf[..self.key.salt_size()];
                if replay.check_and_record(salt) {
                    warn!(message = "drop replayed udp packet", %addr, err = %Error::Replayed);
                    continue;
                }
            }

            let data = &recv_buf[range];
            trace!(
                message = "udp proxy recv",
                %addr,
                packet = n,
                payload = data.len()
            );

            if data.len() > buf.len() {
                let copied = buf.len();
                buf.copy_from_slice(&data[..copied]);

                return Err(Error::BufferTooSmall {
                    copied,
                    required: data.len(),
                    addr,
                });
            }

            buf[..data.len()].copy_from_slice(data);
            return Ok((data.len(), addr));
        }
    }
}
