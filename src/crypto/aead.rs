use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes192;
use aes_gcm::{AeadInPlace, Aes128Gcm, Aes256Gcm, AesGcm, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;

use super::CipherKind;
use crate::Error;

type Aes192Gcm = AesGcm<Aes192, U12>;

#[allow(clippy::large_enum_variant)]
enum CipherVariant {
    Aes128Gcm(Aes128Gcm),
    Aes192Gcm(Aes192Gcm),
    Aes256Gcm(Aes256Gcm),
    ChaCha20Poly1305(ChaCha20Poly1305),
}

impl CipherVariant {
    fn new(kind: CipherKind, key: &[u8]) -> Result<Self, Error> {
        let invalid =
            |_| Error::InvalidKey(format!("{} requires a {} bytes key", kind, kind.key_len()));

        let variant = match kind {
            CipherKind::AES_128_GCM => {
                CipherVariant::Aes128Gcm(Aes128Gcm::new_from_slice(key).map_err(invalid)?)
            }
            CipherKind::AES_192_GCM => {
                CipherVariant::Aes192Gcm(Aes192Gcm::new_from_slice(key).map_err(invalid)?)
            }
            CipherKind::AES_256_GCM => {
                CipherVariant::Aes256Gcm(Aes256Gcm::new_from_slice(key).map_err(invalid)?)
            }
            CipherKind::CHACHA20_POLY1305 => CipherVariant::ChaCha20Poly1305(
                ChaCha20Poly1305::new_from_slice(key).map_err(invalid)?,
            ),
        };

        Ok(variant)
    }

    fn encrypt(&self, nonce: &[u8], plaintext: &mut [u8], tag_out: &mut [u8]) -> bool {
        let nonce = GenericArray::from_slice(nonce);
        let tag = match *self {
            CipherVariant::Aes128Gcm(ref c) => c.encrypt_in_place_detached(nonce, &[], plaintext),
            CipherVariant::Aes192Gcm(ref c) => c.encrypt_in_place_detached(nonce, &[], plaintext),
            CipherVariant::Aes256Gcm(ref c) => c.encrypt_in_place_detached(nonce, &[], plaintext),
            CipherVariant::ChaCha20Poly1305(ref c) => {
                c.encrypt_in_place_detached(nonce, &[], plaintext)
            }
        };

        match tag {
            Ok(tag) => {
                tag_out.copy_from_slice(tag.as_slice());
                true
            }
            Err(_) => false,
        }
    }

    fn decrypt(&self, nonce: &[u8], ciphertext: &mut [u8], tag_in: &[u8]) -> bool {
        let nonce = GenericArray::from_slice(nonce);
        let tag = GenericArray::from_slice(tag_in);
        let ret = match *self {
            CipherVariant::Aes128Gcm(ref c) => {
                c.decrypt_in_place_detached(nonce, &[], ciphertext, tag)
            }
            CipherVariant::Aes192Gcm(ref c) => {
                c.decrypt_in_place_detached(nonce, &[], ciphertext, tag)
            }
            CipherVariant::Aes256Gcm(ref c) => {
                c.decrypt_in_place_detached(nonce, &[], ciphertext, tag)
            }
            CipherVariant::ChaCha20Poly1305(ref c) => {
                c.decrypt_in_place_detached(nonce, &[], ciphertext, tag)
            }
        };

        ret.is_ok()
    }
}

/// An AEAD cipher keyed with a per-packet subkey.
///
/// Each subkey seals exactly one packet, so the nonce is always zero.
pub struct Cipher {
    cipher: CipherVariant,
    kind: CipherKind,
}

impl Cipher {
    const ZERO_NONCE: [u8; 12] = [0u8; 12];

    pub fn new(kind: CipherKind, subkey: &[u8]) -> Result<Self, Error> {
        debug_assert_eq!(kind.nonce_len(), Self::ZERO_NONCE.len());

        Ok(Self {
            cipher: CipherVariant::new(kind, subkey)?,
            kind,
        })
    }

    #[inline]
    pub fn tag_len(&self) -> usize {
        self.kind.tag_len()
    }

    /// Seal `plaintext_in_ciphertext_out[..len - tag_len]` in place, the tag
    /// is written to the last `tag_len` bytes.
    pub fn encrypt(&self, plaintext_in_ciphertext_out: &mut [u8]) -> Result<(), Error> {
        let len = plaintext_in_ciphertext_out.len();
        if len < self.tag_len() {
            return Err(Error::FrameTooShort {
                min: self.tag_len(),
                found: len,
            });
        }

        let (plaintext, tag_out) = plaintext_in_ciphertext_out.split_at_mut(len - self.tag_len());
        if self.cipher.encrypt(&Self::ZERO_NONCE, plaintext, tag_out) {
            Ok(())
        } else {
            Err(Error::PayloadTooLarge {
                size: len,
                max: crate::MAX_PACKET_SIZE,
            })
        }
    }

    /// Verify and open `ciphertext_in_plaintext_out` in place, the plaintext
    /// ends up in the first `len - tag_len` bytes.
    pub fn decrypt(&self, ciphertext_in_plaintext_out: &mut [u8]) -> Result<(), Error> {
        let len = ciphertext_in_plaintext_out.len();
        if len < self.tag_len() {
            return Err(Error::FrameTooShort {
                min: self.tag_len(),
                found: len,
            });
        }

        let (ciphertext, tag_in) = ciphertext_in_plaintext_out.split_at_mut(len - self.tag_len());
        if self.cipher.decrypt(&Self::ZERO_NONCE, ciphertext, tag_in) {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed)
        }
    }
}
