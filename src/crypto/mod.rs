mod aead;
mod kdf;
mod key;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use aead::Cipher;
pub use kdf::bytes_to_key;
pub use key::{EncryptionKey, Subkey};

/// Longest key among all supported ciphers
pub const MAX_KEY_LEN: usize = 32;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CipherKind {
    AES_128_GCM,
    AES_192_GCM,
    AES_256_GCM,
    CHACHA20_POLY1305,
}

impl CipherKind {
    /// Key length of the cipher
    pub fn key_len(&self) -> usize {
        match *self {
            CipherKind::AES_128_GCM => 128 / 8,
            CipherKind::AES_192_GCM => 192 / 8,
            CipherKind::AES_256_GCM => 256 / 8,
            CipherKind::CHACHA20_POLY1305 => 256 / 8,
        }
    }

    /// AEAD Cipher's TAG length
    pub fn tag_len(&self) -> usize {
        16
    }

    /// AEAD Cipher's SALT length
    pub fn salt_len(&self) -> usize {
        self.key_len()
    }

    /// AEAD Cipher's nonce length
    pub fn nonce_len(&self) -> usize {
        12
    }
}

impl Display for CipherKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CipherKind::AES_128_GCM => "aes-128-gcm",
            CipherKind::AES_192_GCM => "aes-192-gcm",
            CipherKind::AES_256_GCM => "aes-256-gcm",
            CipherKind::CHACHA20_POLY1305 => "chacha20-ietf-poly1305",
        };

        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported cipher {0:?}")]
pub struct ParseCipherKindError(String);

impl FromStr for CipherKind {
    type Err = ParseCipherKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // RFC 5116 names are accepted too, e.g. AEAD_AES_256_GCM
            "aes-128-gcm" | "aead_aes_128_gcm" | "aead-128" => Ok(CipherKind::AES_128_GCM),
            "aes-192-gcm" | "aead_aes_192_gcm" | "aead-192" => Ok(CipherKind::AES_192_GCM),
            "aes-256-gcm" | "aead_aes_256_gcm" | "aead-256" => Ok(CipherKind::AES_256_GCM),
            "chacha20-ietf-poly1305" | "chacha20-poly1305" | "aead_chacha20_poly1305" => {
                Ok(CipherKind::CHACHA20_POLY1305)
            }
            _ => Err(ParseCipherKindError(s.to_owned())),
        }
    }
}

impl From<ParseCipherKindError> for crate::Error {
    fn from(err: ParseCipherKindError) -> Self {
        crate::Error::InvalidKey(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let names = [
            "aes-128-gcm",
            "aes-192-gcm",
            "aes-256-gcm",
            "chacha20-ietf-poly1305",
        ];

        for name in names {
            let kind = name.parse::<CipherKind>().unwrap();
            assert_eq!(kind.to_string(), name);
            assert_eq!(kind.salt_len(), kind.key_len());
            assert!(kind.key_len() <= MAX_KEY_LEN);
        }

        assert_eq!(
            "AES-256-GCM".parse::<CipherKind>(),
            Ok(CipherKind::AES_256_GCM)
        );
        assert!("rc4-md5".parse::<CipherKind>().is_err());
    }

    #[test]
    fn parse_aead_aliases() {
        let cases = [
            ("AEAD_AES_128_GCM", CipherKind::AES_128_GCM),
            ("AEAD_AES_192_GCM", CipherKind::AES_192_GCM),
            ("AEAD_AES_256_GCM", CipherKind::AES_256_GCM),
            ("AEAD_CHACHA20_POLY1305", CipherKind::CHACHA20_POLY1305),
            ("AEAD-256", CipherKind::AES_256_GCM),
            ("aead-128", CipherKind::AES_128_GCM),
        ];

        for (name, kind) in cases {
            assert_eq!(name.parse::<CipherKind>(), Ok(kind), "{}", name);
        }

        assert!("AEAD-512".parse::<CipherKind>().is_err());
    }
}
