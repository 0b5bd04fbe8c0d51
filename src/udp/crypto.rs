//! Crypto protocol for ShadowSocks UDP
//!
//! Payload with AEAD cipher
//!
//! ```plain
//! UDP (after encryption, *ciphertext*)
//! +--------+-----------+-----------+
//! |  SALT  |  *Data*   |  Data_TAG |
//! +--------+-----------+-----------+
//! | Fixed  | Variable  |   Fixed   |
//! +--------+-----------+-----------+
//! ```
//!
//! Every packet has its own salt, the subkey derived from it seals exactly
//! one packet so the nonce is always zero.
//!
//! All functions here work in place on a single buffer. When sealing, the
//! plaintext lives at `buf[salt_len..salt_len + plaintext_len]`, the salt is
//! written in front of it and the tag right after it. When opening, the
//! plaintext replaces the ciphertext at the same offsets.

use std::ops::Range;

use crate::crypto::EncryptionKey;
use crate::salt::SaltGenerator;
use crate::{Address, Error, MAX_PACKET_SIZE};

#[inline]
fn check_sealed_len(
    buf: &[u8],
    plaintext_len: usize,
    key: &EncryptionKey,
) -> Result<usize, Error> {
    let size = key.salt_size() + plaintext_len + key.tag_size();
    let max = buf.len().min(MAX_PACKET_SIZE);
    if size > max {
        return Err(Error::PayloadTooLarge { size, max });
    }

    Ok(size)
}

/// Seal the plaintext already placed at `buf[salt_len..salt_len + plaintext_len]`.
///
/// Writes the salt to `buf[..salt_len]`, the ciphertext over the plaintext
/// and the tag after it. Returns the packet length.
pub fn pack_in_place<G>(
    buf: &mut [u8],
    plaintext_len: usize,
    key: &EncryptionKey,
    salt_generator: &G,
) -> Result<usize, Error>
where
    G: SaltGenerator + ?Sized,
{
    let size = check_sealed_len(buf, plaintext_len, key)?;

    let (salt, data) = buf[..size].split_at_mut(key.salt_size());
    salt_generator.new_salt(salt);

    let cipher = key.cipher(salt)?;
    cipher.encrypt(data)?;

    Ok(size)
}

/// Copy `plaintext` into `dst` after the salt region and seal it.
///
/// Returns the packet length, the packet is `dst[..len]`.
pub fn pack<G>(
    dst: &mut [u8],
    plaintext: &[u8],
    key: &EncryptionKey,
    salt_generator: &G,
) -> Result<usize, Error>
where
    G: SaltGenerator + ?Sized,
{
    check_sealed_len(dst, plaintext.len(), key)?;

    let salt_len = key.salt_size();
    dst[salt_len..salt_len + plaintext.len()].copy_from_slice(plaintext);

    pack_in_place(dst, plaintext.len(), key, salt_generator)
}

/// Verify and decrypt the packet in `buf` in place.
///
/// Returns the plaintext, which is `buf[salt_len..buf.len() - tag_len]`.
pub fn unpack<'a>(buf: &'a mut [u8], key: &EncryptionKey) -> Result<&'a mut [u8], Error> {
    let salt_len = key.salt_size();
    let tag_len = key.tag_size();
    if buf.len() < salt_len + tag_len {
        return Err(Error::FrameTooShort {
            min: salt_len + tag_len,
            found: buf.len(),
        });
    }

    let (salt, data) = buf.split_at_mut(salt_len);
    let cipher = key.cipher(salt)?;
    cipher.decrypt(data)?;

    let plaintext_len = data.len() - tag_len;
    Ok(&mut data[..plaintext_len])
}

/// Build a packet carrying `addr` and `payload` in `buf`, returns the packet length.
///
/// ```plain
/// +------+----------+----------+----------+
/// | ATYP | DST.ADDR | DST.PORT |   DATA   |
/// +------+----------+----------+----------+
/// |  1   | Variable |    2     | Variable |
/// +------+----------+----------+----------+
/// ```
pub fn encrypt_payload<G>(
    buf: &mut [u8],
    addr: &Address,
    payload: &[u8],
    key: &EncryptionKey,
    salt_generator: &G,
) -> Result<usize, Error>
where
    G: SaltGenerator + ?Sized,
{
    let addr_len = addr.serialized_len();
    check_sealed_len(buf, addr_len + payload.len(), key)?;

    // The salt region stays untouched until the plaintext is complete
    let salt_len = key.salt_size();
    let addr_len = addr
        .encode(&mut buf[salt_len..])
        .map_err(Error::InvalidDestination)?;
    let payload_start = salt_len + addr_len;
    buf[payload_start..payload_start + payload.len()].copy_from_slice(payload);

    pack_in_place(buf, addr_len + payload.len(), key, salt_generator)
}

/// Open a packet in `buf` and split the address from the data.
///
/// Returns the address and where the data is in `buf`.
pub fn decrypt_payload(
    buf: &mut [u8],
    key: &EncryptionKey,
) -> Result<(Address, Range<usize>), Error> {
    let plaintext = unpack(buf, key)?;
    let (addr, addr_len) = Address::decode(plaintext).map_err(Error::MalformedAddress)?;

    let salt_len = key.salt_size();
    Ok((addr, salt_len + addr_len..salt_len + plaintext.len()))
}
