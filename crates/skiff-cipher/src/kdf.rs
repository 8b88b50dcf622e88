//! Passphrase key derivation.
//!
//! Compatibility path for keying a cipher directly from a passphrase, kept
//! for stored-key formats that predate the transport KDF. New code derives
//! keys from the handshake, not from here.

use md5::{Digest, Md5, digest::generic_array::GenericArray};
use zeroize::Zeroizing;

/// Length of a passphrase-derived key.
pub const PASSPHRASE_KEY_LEN: usize = 16;

/// Derive a fixed-size cipher key from a passphrase with MD5.
///
/// The digest is exactly the historical construction; it carries no salt and
/// no work factor. The returned buffer zeroizes itself on drop.
#[must_use]
pub fn passphrase_key(passphrase: &str) -> Zeroizing<[u8; PASSPHRASE_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; PASSPHRASE_KEY_LEN]);
    let mut hasher = Md5::new();
    hasher.update(passphrase.as_bytes());
    hasher.finalize_into(GenericArray::from_mut_slice(&mut key[..]));
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_empty_string() {
        let key = passphrase_key("");
        assert_eq!(
            key.to_vec(),
            hex::decode("d41d8cd98f00b204e9800998ecf8427e").unwrap()
        );
    }

    #[test]
    fn test_md5_abc() {
        let key = passphrase_key("abc");
        assert_eq!(
            key.to_vec(),
            hex::decode("900150983cd24fb0d6963f7d28e17f72").unwrap()
        );
    }

    #[test]
    fn test_distinct_passphrases_distinct_keys() {
        assert_ne!(
            passphrase_key("correct horse").to_vec(),
            passphrase_key("battery staple").to_vec()
        );
    }
}
