//! Software counter mode over the AES block primitive.
//!
//! The counter block is kept as raw bytes so the privilege-separation
//! handoff can export and re-import it verbatim. Each input block (including
//! a trailing partial block) consumes one counter value, big-endian.

use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use zeroize::Zeroize;

use crate::error::{CipherError, Result};
use crate::registry::CtrAlg;

/// Counter block length (one AES block).
pub(crate) const CTR_BLOCK_LEN: usize = 16;

enum CtrEngine {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
}

/// One keyed software-CTR cipher with its running counter block.
pub(crate) struct SoftCtrCipher {
    engine: CtrEngine,
    ctr: [u8; CTR_BLOCK_LEN],
}

impl SoftCtrCipher {
    pub(crate) fn new(alg: CtrAlg, key: &[u8], iv: &[u8]) -> Result<Self> {
        let engine = match alg {
            CtrAlg::Aes128 => CtrEngine::Aes128(
                aes::Aes128::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            CtrAlg::Aes192 => CtrEngine::Aes192(
                aes::Aes192::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            CtrAlg::Aes256 => CtrEngine::Aes256(
                aes::Aes256::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
        };
        let mut ctr = [0u8; CTR_BLOCK_LEN];
        ctr.copy_from_slice(&iv[..CTR_BLOCK_LEN]);
        Ok(Self { engine, ctr })
    }

    /// XOR the keystream over `src` into `dest`, advancing the counter by
    /// one per (possibly partial) block.
    pub(crate) fn xor_stream(&mut self, dest: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dest.len(), src.len());
        let mut block = [0u8; CTR_BLOCK_LEN];
        for (d, s) in dest
            .chunks_mut(CTR_BLOCK_LEN)
            .zip(src.chunks(CTR_BLOCK_LEN))
        {
            block.copy_from_slice(&self.ctr);
            self.encrypt_block(&mut block);
            for (db, (sb, kb)) in d.iter_mut().zip(s.iter().zip(block.iter())) {
                *db = sb ^ kb;
            }
            increment_be(&mut self.ctr);
        }
        block.zeroize();
    }

    fn encrypt_block(&self, block: &mut [u8; CTR_BLOCK_LEN]) {
        let block = GenericArray::from_mut_slice(block);
        match &self.engine {
            CtrEngine::Aes128(c) => c.encrypt_block(block),
            CtrEngine::Aes192(c) => c.encrypt_block(block),
            CtrEngine::Aes256(c) => c.encrypt_block(block),
        }
    }

    pub(crate) fn counter(&self) -> &[u8; CTR_BLOCK_LEN] {
        &self.ctr
    }

    pub(crate) fn set_counter(&mut self, ctr: &[u8]) -> Result<()> {
        if ctr.len() != CTR_BLOCK_LEN {
            return Err(CipherError::InvalidArgument);
        }
        self.ctr.copy_from_slice(ctr);
        Ok(())
    }
}

impl Drop for SoftCtrCipher {
    fn drop(&mut self) {
        self.ctr.zeroize();
    }
}

fn increment_be(ctr: &mut [u8; CTR_BLOCK_LEN]) {
    for byte in ctr.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}
