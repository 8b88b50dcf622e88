//! AES-GCM adapter with the transport's fixed/invocation-counter IV.
//!
//! The 12-byte IV is split into a 4-byte fixed field and an 8-byte
//! big-endian invocation counter. Each packet is sealed under the current IV
//! and the counter then advances by one, on both directions, so the IV never
//! repeats under one key. The sequence number plays no part here.

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};
use zeroize::Zeroize;

use crate::error::{CipherError, Result};
use crate::registry::GcmAlg;

/// GCM IV length in bytes.
pub(crate) const GCM_IV_LEN: usize = 12;

enum GcmEngine {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

/// One keyed GCM cipher with its evolving invocation-counter IV.
pub(crate) struct GcmCipher {
    engine: GcmEngine,
    iv: [u8; GCM_IV_LEN],
}

impl GcmCipher {
    pub(crate) fn new(alg: GcmAlg, key: &[u8], iv: &[u8]) -> Result<Self> {
        let engine = match alg {
            GcmAlg::Aes128 => GcmEngine::Aes128(
                Aes128Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            GcmAlg::Aes256 => GcmEngine::Aes256(
                Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
        };
        let mut fixed = [0u8; GCM_IV_LEN];
        fixed.copy_from_slice(&iv[..GCM_IV_LEN]);
        Ok(Self { engine, iv: fixed })
    }

    /// Encrypt `buf` in place under the current IV, writing the tag to
    /// `tag_out`, then advance the invocation counter.
    pub(crate) fn seal(&mut self, aad: &[u8], buf: &mut [u8], tag_out: &mut [u8]) -> Result<()> {
        let nonce = Nonce::from_slice(&self.iv);
        let tag = match &self.engine {
            GcmEngine::Aes128(c) => c.encrypt_in_place_detached(nonce, aad, buf),
            GcmEngine::Aes256(c) => c.encrypt_in_place_detached(nonce, aad, buf),
        }
        .map_err(|_| CipherError::Primitive)?;
        tag_out.copy_from_slice(&tag);
        self.advance_invocation();
        Ok(())
    }

    /// Verify `tag` and decrypt `buf` in place under the current IV, then
    /// advance the invocation counter.
    pub(crate) fn open(&mut self, aad: &[u8], buf: &mut [u8], tag: &[u8]) -> Result<()> {
        let nonce = Nonce::from_slice(&self.iv);
        let tag = Tag::from_slice(tag);
        match &self.engine {
            GcmEngine::Aes128(c) => c.decrypt_in_place_detached(nonce, aad, buf, tag),
            GcmEngine::Aes256(c) => c.decrypt_in_place_detached(nonce, aad, buf, tag),
        }
        .map_err(|_| CipherError::MacInvalid)?;
        self.advance_invocation();
        Ok(())
    }

    fn advance_invocation(&mut self) {
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&self.iv[4..]);
        let next = u64::from_be_bytes(counter).wrapping_add(1);
        self.iv[4..].copy_from_slice(&next.to_be_bytes());
    }

    pub(crate) fn iv(&self) -> &[u8; GCM_IV_LEN] {
        &self.iv
    }

    pub(crate) fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        if iv.len() != GCM_IV_LEN {
            return Err(CipherError::InvalidArgument);
        }
        self.iv.copy_from_slice(iv);
        Ok(())
    }
}

impl Drop for GcmCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}
