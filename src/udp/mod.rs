//! ShadowSocks UDP with AEAD ciphers
//!
//! ## Packet format
//!
//! shadowsocks UDP Request and Response (before encrypted)
//! ```ignore
//! +------+----------+----------+----------+
//! | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +------+----------+----------+----------+
//! |  1   | Variable |    2     | Variable |
//! +------+----------+----------+----------+
//! ```
//!
//! shadowsocks UDP Request and Response (after encrypted)
//! ```ignore
//! +-------+--------------+-------+
//! |  SALT |    PAYLOAD   |  TAG  |
//! +-------+--------------+-------+
//! | Fixed |   Variable   | Fixed |
//! +-------+--------------+-------+
//! ```
//!
//! The whole packet is at most [`MAX_PACKET_SIZE`](crate::MAX_PACKET_SIZE) bytes.

mod crypto;
mod listener;
mod proxy_socket;

pub use crypto::{decrypt_payload, encrypt_payload, pack, pack_in_place, unpack};
pub use listener::PacketListener;
pub use proxy_socket::ProxySocket;
