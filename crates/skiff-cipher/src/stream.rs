//! Legacy RC4 stream cipher engine.
//!
//! Kept in-crate because the privilege-separation handoff must export the
//! raw permutation state verbatim; no packaged RC4 exposes it. The early
//! keystream of RC4 is biased, so the arcfour128/arcfour256 descriptors
//! discard a warm-up prefix at initialization.

use zeroize::Zeroize;

use crate::error::{CipherError, Result};

/// Serialized engine state length: the 256-byte permutation plus both
/// indices.
pub(crate) const ENGINE_STATE_LEN: usize = 258;

/// RC4 keystream generator.
pub(crate) struct LegacyStreamCipher {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl LegacyStreamCipher {
    pub(crate) fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (idx, v) in s.iter_mut().enumerate() {
            *v = idx as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(s[i])
                .wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Self { s, i: 0, j: 0 }
    }

    /// Advance the keystream without producing output. Used to skip the
    /// biased warm-up prefix.
    pub(crate) fn discard(&mut self, n: usize) {
        for _ in 0..n {
            self.next_byte();
        }
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }

    /// XOR the keystream over `src` into `dest`.
    pub(crate) fn xor_stream(&mut self, dest: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dest.len(), src.len());
        for (d, s) in dest.iter_mut().zip(src.iter()) {
            *d = s ^ self.next_byte();
        }
    }

    /// Export the raw engine state as an opaque blob.
    pub(crate) fn export_state(&self) -> [u8; ENGINE_STATE_LEN] {
        let mut out = [0u8; ENGINE_STATE_LEN];
        out[..256].copy_from_slice(&self.s);
        out[256] = self.i;
        out[257] = self.j;
        out
    }

    /// Import a blob previously produced by [`Self::export_state`].
    pub(crate) fn import_state(&mut self, blob: &[u8]) -> Result<()> {
        if blob.len() != ENGINE_STATE_LEN {
            return Err(CipherError::InvalidArgument);
        }
        self.s.copy_from_slice(&blob[..256]);
        self.i = blob[256];
        self.j = blob[257];
        Ok(())
    }
}

impl Drop for LegacyStreamCipher {
    fn drop(&mut self) {
        self.s.zeroize();
        self.i.zeroize();
        self.j.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Classic RC4 test vector: key "Key", plaintext "Plaintext".
    #[test]
    fn test_rc4_known_answer() {
        let mut c = LegacyStreamCipher::new(b"Key");
        let mut dest = [0u8; 9];
        c.xor_stream(&mut dest, b"Plaintext");
        assert_eq!(&dest, &hex::decode("bbf316e8d940af0ad3").unwrap()[..]);
    }

    #[test]
    fn test_rc4_discard_equals_skipped_keystream() {
        let plain = [0u8; 32];

        let mut skipped = LegacyStreamCipher::new(b"warmup-key");
        skipped.discard(1536);
        let mut a = [0u8; 32];
        skipped.xor_stream(&mut a, &plain);

        let mut manual = LegacyStreamCipher::new(b"warmup-key");
        let junk_src = [0u8; 1536];
        let mut junk = [0u8; 1536];
        manual.xor_stream(&mut junk, &junk_src);
        let mut b = [0u8; 32];
        manual.xor_stream(&mut b, &plain);

        assert_eq!(a, b);
    }

    #[test]
    fn test_rc4_state_export_import_resumes() {
        let mut orig = LegacyStreamCipher::new(b"sekrit");
        let mut head = [0u8; 13];
        orig.xor_stream(&mut head, &[0u8; 13]);

        let blob = orig.export_state();
        let mut resumed = LegacyStreamCipher::new(b"unrelated");
        resumed.import_state(&blob).unwrap();

        let mut a = [0u8; 21];
        let mut b = [0u8; 21];
        orig.xor_stream(&mut a, &[0u8; 21]);
        resumed.xor_stream(&mut b, &[0u8; 21]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rc4_import_rejects_wrong_length() {
        let mut c = LegacyStreamCipher::new(b"k");
        assert_eq!(
            c.import_state(&[0u8; 257]),
            Err(CipherError::InvalidArgument)
        );
    }
}
