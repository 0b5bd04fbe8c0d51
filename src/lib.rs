//! AEAD packet framing for the ShadowSocks UDP protocol
//!
//! Every datagram is sealed on its own, with a subkey derived from the
//! master key and a fresh random salt.
//!
//! ```plain
//! +--------+------------------------------------+-------+
//! |  SALT  | ATYP | DST.ADDR | DST.PORT |  DATA  |  TAG  |
//! +--------+------------------------------------+-------+
//!          |<------------ encrypted ----------->|
//! ```
//!
//! The [`ProxySocket`] wraps any connected [`DatagramConn`], and a
//! [`PacketListener`] creates them for one [`PacketEndpoint`].

mod addr;
mod config;
mod crypto;
mod error;
mod pool;
mod salt;
mod security;
mod udp;

#[cfg(test)]
mod trace;

pub use addr::{Address, AddressError};
pub use config::{ServerConfig, UrlParseError};
pub use crypto::{bytes_to_key, Cipher, CipherKind, EncryptionKey, ParseCipherKindError, Subkey};
pub use error::Error;
pub use pool::{BufferLease, BufferPool};
pub use salt::{RandomSaltGenerator, ReplayCheckingSaltGenerator, SaltGenerator};
pub use security::{ReplayConfig, ReplayProtector};
pub use transport::{ConnectOpts, DatagramConn, PacketEndpoint, UdpEndpoint};
pub use udp::{
    decrypt_payload, encrypt_payload, pack, pack_in_place, unpack, PacketListener, ProxySocket,
};

/// Maximum size of a sealed packet, salt and tag included
pub const MAX_PACKET_SIZE: usize = 16 * 1024;
