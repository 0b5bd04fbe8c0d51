use md5::{Digest, Md5};

/// OpenSSL's `EVP_BytesToKey` with MD5 and a single round, fills all of `key`.
pub fn bytes_to_key(password: &[u8], key: &mut [u8]) {
    let key_len = key.len();
    let mut last_digest: Option<[u8; 16]> = None;

    let mut offset = 0usize;
    while offset < key_len {
        let mut m = Md5::new();
        if let Some(digest) = last_digest {
            m.update(digest);
        }

        m.update(password);

        let digest: [u8; 16] = m.finalize().into();

        let amt = std::cmp::min(key_len - offset, digest.len());
        key[offset..offset + amt].copy_from_slice(&digest[..amt]);

        offset += amt;
        last_digest = Some(digest);
    }
}
