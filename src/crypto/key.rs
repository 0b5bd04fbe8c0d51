use std::fmt;

use hkdf::Hkdf;
use sha1::Sha1;

use super::aead::Cipher;
use super::kdf::bytes_to_key;
use super::{CipherKind, MAX_KEY_LEN};
use crate::Error;

const SUBKEY_INFO: &[u8] = b"ss-subkey";

/// Master key of a cipher method.
///
/// Immutable once built, share it with `Arc` between sockets. Every packet
/// is sealed with its own subkey derived from this key and the packet salt.
#[derive(Clone)]
pub struct EncryptionKey {
    kind: CipherKind,
    secret: Box<[u8]>,
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl EncryptionKey {
    /// Derive the master key from a password, the way every shadowsocks
    /// implementation does for the AEAD ciphers.
    pub fn new(kind: CipherKind, password: &str) -> Result<Self, Error> {
        if password.is_empty() {
            return Err(Error::InvalidKey("password must not be empty".into()));
        }

        let mut secret = vec![0u8; kind.key_len()].into_boxed_slice();
        bytes_to_key(password.as_bytes(), &mut secret);

        Ok(Self { kind, secret })
    }

    /// Build from a method name, e.g. `aes-256-gcm`, and a password
    pub fn from_method(method: &str, password: &str) -> Result<Self, Error> {
        let kind = method.parse::<CipherKind>()?;
        Self::new(kind, password)
    }

    /// Use `secret` as the master key directly
    pub fn from_secret(kind: CipherKind, secret: &[u8]) -> Result<Self, Error> {
        if secret.len() != kind.key_len() {
            return Err(Error::InvalidKey(format!(
                "{} is expecting a {} bytes key, but found {} bytes",
                kind,
                kind.key_len(),
                secret.len()
            )));
        }

        Ok(Self {
            kind,
            secret: secret.into(),
        })
    }

    #[inline]
    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    #[inline]
    pub fn salt_size(&self) -> usize {
        self.kind.salt_len()
    }

    #[inline]
    pub fn tag_size(&self) -> usize {
        self.kind.tag_len()
    }

    /// HKDF-SHA1 with the salt, the master key as IKM and `ss-subkey` as info.
    ///
    /// Deterministic, equal salts give equal subkeys.
    pub fn derive_subkey(&self, salt: &[u8]) -> Result<Subkey, Error> {
        if salt.len() != self.salt_size() {
            return Err(Error::InvalidKey(format!(
                "{} is expecting a {} bytes salt, but found {} bytes",
                self.kind,
                self.salt_size(),
                salt.len()
            )));
        }

        let mut subkey = Subkey {
            buf: [0u8; MAX_KEY_LEN],
            len: self.secret.len(),
        };

        let hk = Hkdf::<Sha1>::new(Some(salt), &self.secret);
        hk.expand(SUBKEY_INFO, &mut subkey.buf[..subkey.len])
            .map_err(|err| Error::InvalidKey(format!("HKDF-SHA1 expand failed, {}", err)))?;

        Ok(subkey)
    }

    /// The AEAD cipher for the packet carrying `salt`
    pub fn cipher(&self, salt: &[u8]) -> Result<Cipher, Error> {
        let subkey = self.derive_subkey(salt)?;
        Cipher::new(self.kind, subkey.as_ref())
    }
}

/// A per-packet key
pub struct Subkey {
    buf: [u8; MAX_KEY_LEN],
    len: usize,
}

impl AsRef<[u8]> for Subkey {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
