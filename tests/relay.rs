use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use shadowsocks_udp::{
    decrypt_payload, encrypt_payload, Address, CipherKind, ConnectOpts, EncryptionKey,
    RandomSaltGenerator, ReplayCheckingSaltGenerator, ReplayProtector, ServerConfig,
    MAX_PACKET_SIZE,
};
use tokio::net::UdpSocket;

const PASSWORD: &str = "correct horse battery staple";

async fn echo_server() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let (n, from) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(&buf[..n], from).await.unwrap();
        }
    });

    addr
}

/// A minimal ShadowSocks UDP server, relays every packet to its target and
/// seals the response back to the client.
async fn proxy_server(key: Arc<EncryptionKey>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let outbound = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut buf = vec![0u8; MAX_PACKET_SIZE];

        loop {
            let (n, client) = socket.recv_from(&mut buf).await.unwrap();
            let (target, range) = match decrypt_payload(&mut buf[..n], &key) {
                Ok(x) => x,
                Err(_) => continue,
            };

            let target_addr = match &target {
                Address::SocketAddress(addr) => *addr,
                Address::DomainNameAddress(..) => continue,
            };
            outbound.send_to(&buf[range], target_addr).await.unwrap();

            let mut data = [0u8; 2048];
            let (n, from) = outbound.recv_from(&mut data).await.unwrap();

            let n = encrypt_payload(
                &mut buf,
                &Address::from(from),
                &data[..n],
                &key,
                &RandomSaltGenerator,
            )
            .unwrap();
            socket.send_to(&buf[..n], client).await.unwrap();
        }
    });

    addr
}

#[tokio::test]
async fn relay_through_proxy() {
    let echo = echo_server().await;

    for kind in [
        CipherKind::AES_128_GCM,
        CipherKind::AES_192_GCM,
        CipherKind::AES_256_GCM,
        CipherKind::CHACHA20_POLY1305,
    ] {
        let key = Arc::new(EncryptionKey::new(kind, PASSWORD).unwrap());
        let server = proxy_server(key).await;
        let config = ServerConfig::new(server, PASSWORD, kind).unwrap();

        let mut listener = config.listener(ConnectOpts::default());
        listener.set_salt_generator(Arc::new(ReplayCheckingSaltGenerator::new(Arc::new(
            ReplayProtector::default(),
        ))));

        let mut socket = listener.listen_packet().await.unwrap();
        socket.set_timeouts(Some(Duration::from_secs(1)), Some(Duration::from_secs(5)));

        let target = Address::from(echo);
        let payloads: [&[u8]; 3] = [b"ping", &[], &[0x5a; 1400]];
        for payload in payloads {
            let n = socket.send(&target, payload).await.unwrap();
            assert_eq!(n, payload.len());

            let mut buf = [0u8; 2048];
            let (n, from) = socket.recv(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], payload, "{}", kind);
            assert_eq!(from, target);
        }

        socket.close();
    }
}

#[tokio::test]
async fn wrong_password_times_out() {
    let echo = echo_server().await;

    let server_key = Arc::new(EncryptionKey::new(CipherKind::AES_256_GCM, PASSWORD).unwrap());
    let server = proxy_server(server_key).await;

    let config = ServerConfig::new(server, "wrong password", CipherKind::AES_256_GCM).unwrap();
    let mut socket = config
        .listener(ConnectOpts::default())
        .listen_packet()
        .await
        .unwrap();
    socket.set_timeouts(None, Some(Duration::from_millis(200)));

    socket.send(&Address::from(echo), b"ping").await.unwrap();

    let mut buf = [0u8; 64];
    let err = socket.recv(&mut buf).await.unwrap_err();
    assert_eq!(
        std::io::Error::from(err).kind(),
        std::io::ErrorKind::TimedOut
    );
}

#[tokio::test]
async fn from_url() {
    let echo = echo_server().await;
    let key = Arc::new(EncryptionKey::from_method("chacha20-ietf-poly1305", PASSWORD).unwrap());
    let server = proxy_server(key).await;

    let url = format!(
        "ss://chacha20-ietf-poly1305:{}@{}#test",
        PASSWORD.replace(' ', "%20"),
        server
    );
    let config = ServerConfig::from_url(&url).unwrap();
    assert_eq!(config.remarks(), Some("test"));

    let socket = config
        .listener(ConnectOpts::default())
        .listen_packet()
        .await
        .unwrap();
    socket.send(&Address::from(echo), b"hello").await.unwrap();

    let mut buf = [0u8; 64];
    let (n, _) = socket.recv(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello");
}
