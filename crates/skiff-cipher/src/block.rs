//! CBC-mode adapter over the block-cipher engines.
//!
//! The running chaining value is held here rather than inside the mode
//! wrapper so it can be exported and re-imported across the privilege
//! boundary. Each call re-seeds a fresh encryptor/decryptor from the stored
//! IV; the IV then advances to the last ciphertext block of the call.

use alloc::vec::Vec;

use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit,
    generic_array::GenericArray,
};
use zeroize::Zeroize;

use crate::error::{CipherError, Result};
use crate::registry::BlockAlg;

enum BlockEngine {
    Des(des::Des),
    TdesEde3(des::TdesEde3),
    Blowfish(blowfish::Blowfish),
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
}

/// One keyed CBC cipher with its evolving IV.
pub(crate) struct CbcCipher {
    engine: BlockEngine,
    iv: Vec<u8>,
}

impl CbcCipher {
    pub(crate) fn new(alg: BlockAlg, key: &[u8], iv: &[u8]) -> Result<Self> {
        let engine = match alg {
            BlockAlg::Des => BlockEngine::Des(
                des::Des::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            BlockAlg::TdesEde3 => BlockEngine::TdesEde3(
                des::TdesEde3::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            BlockAlg::Blowfish => BlockEngine::Blowfish(
                blowfish::Blowfish::new_from_slice(key)
                    .map_err(|_| CipherError::InvalidArgument)?,
            ),
            BlockAlg::Aes128 => BlockEngine::Aes128(
                aes::Aes128::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            BlockAlg::Aes192 => BlockEngine::Aes192(
                aes::Aes192::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            BlockAlg::Aes256 => BlockEngine::Aes256(
                aes::Aes256::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
        };
        Ok(Self {
            engine,
            iv: iv.to_vec(),
        })
    }

    /// Encrypt whole blocks in place. `data` length must already be a
    /// multiple of the block size.
    pub(crate) fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match &self.engine {
            BlockEngine::Des(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
            BlockEngine::TdesEde3(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Blowfish(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes128(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes192(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes256(c) => cbc_encrypt(c.clone(), &mut self.iv, data),
        }
    }

    /// Decrypt whole blocks in place. `data` length must already be a
    /// multiple of the block size.
    pub(crate) fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match &self.engine {
            BlockEngine::Des(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
            BlockEngine::TdesEde3(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Blowfish(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes128(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes192(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
            BlockEngine::Aes256(c) => cbc_decrypt(c.clone(), &mut self.iv, data),
        }
    }

    pub(crate) fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub(crate) fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        if iv.len() != self.iv.len() {
            return Err(CipherError::InvalidArgument);
        }
        self.iv.copy_from_slice(iv);
        Ok(())
    }
}

impl Drop for CbcCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

fn cbc_encrypt<C>(core: C, iv: &mut [u8], data: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher,
{
    let bs = iv.len();
    let mut enc =
        cbc::Encryptor::<C>::inner_iv_slice_init(core, iv).map_err(|_| CipherError::Internal)?;
    for block in data.chunks_exact_mut(bs) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    iv.copy_from_slice(&data[data.len() - bs..]);
    Ok(())
}

fn cbc_decrypt<C>(core: C, iv: &mut [u8], data: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher,
{
    let bs = iv.len();
    let mut next_iv = [0u8; 16];
    next_iv[..bs].copy_from_slice(&data[data.len() - bs..]);
    let mut dec =
        cbc::Decryptor::<C>::inner_iv_slice_init(core, iv).map_err(|_| CipherError::Internal)?;
    for block in data.chunks_exact_mut(bs) {
        dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    iv.copy_from_slice(&next_iv[..bs]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    // SP 800-38A, CBC-AES128.Encrypt, blocks 1-2.
    #[test]
    fn test_cbc_aes128_known_answer() {
        let key = unhex("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = unhex("000102030405060708090a0b0c0d0e0f");
        let mut data = unhex(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51",
        );
        let expect = unhex(
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2",
        );

        let mut c = CbcCipher::new(BlockAlg::Aes128, &key, &iv).unwrap();
        c.encrypt(&mut data).unwrap();
        assert_eq!(data, expect);
        // IV advanced to the last ciphertext block.
        assert_eq!(c.iv(), &expect[16..]);
    }

    #[test]
    fn test_cbc_split_calls_match_single_call() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let plain = [0x33u8; 64];

        let mut one = CbcCipher::new(BlockAlg::Aes128, &key, &iv).unwrap();
        let mut whole = plain;
        one.encrypt(&mut whole).unwrap();

        let mut two = CbcCipher::new(BlockAlg::Aes128, &key, &iv).unwrap();
        let mut split = plain;
        let (a, b) = split.split_at_mut(32);
        two.encrypt(a).unwrap();
        two.encrypt(b).unwrap();

        assert_eq!(whole, split);
    }

    #[test]
    fn test_cbc_roundtrip_all_engines() {
        let cases = [
            (BlockAlg::Des, 8usize, 8usize),
            (BlockAlg::TdesEde3, 24, 8),
            (BlockAlg::Blowfish, 16, 8),
            (BlockAlg::Aes128, 16, 16),
            (BlockAlg::Aes192, 24, 16),
            (BlockAlg::Aes256, 32, 16),
        ];
        for (alg, key_len, bs) in cases {
            let key = alloc::vec![0x42u8; key_len];
            let iv = alloc::vec![0x24u8; bs];
            let plain = alloc::vec![0x5au8; bs * 4];

            let mut enc = CbcCipher::new(alg, &key, &iv).unwrap();
            let mut data = plain.clone();
            enc.encrypt(&mut data).unwrap();
            assert_ne!(data, plain);

            let mut dec = CbcCipher::new(alg, &key, &iv).unwrap();
            dec.decrypt(&mut data).unwrap();
            assert_eq!(data, plain);
        }
    }

    #[test]
    fn test_set_iv_rejects_wrong_length() {
        let mut c = CbcCipher::new(BlockAlg::Aes128, &[0u8; 16], &[0u8; 16]).unwrap();
        assert_eq!(c.set_iv(&[0u8; 8]), Err(CipherError::InvalidArgument));
        assert!(c.set_iv(&[1u8; 16]).is_ok());
    }
}
