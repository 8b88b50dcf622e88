//! ChaCha20-Poly1305 packet encryption with sequence-number nonces.
//!
//! The 64-byte key splits into two independent ChaCha20 keys: the main key
//! encrypts the payload and feeds the Poly1305 tag key, the header key
//! encrypts only the 4-byte packet-length field so the receiver can frame
//! the stream before authenticating it. The per-packet nonce is the
//! big-endian packet sequence number; callers must never reuse a sequence
//! number in one direction under one key.
//!
//! Layout of one packet: the length field (AAD), the payload, then a 16-byte
//! Poly1305 tag over everything before it. The tag key is the first 32 bytes
//! of the main-key keystream at counter 0; the payload keystream starts at
//! counter 1.

use chacha20::{
    ChaCha20Legacy,
    cipher::{KeyIvInit, StreamCipher, StreamCipherSeek},
};
use poly1305::{Poly1305, universal_hash::KeyInit};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CipherError, Result};

/// Combined key length: two independent 256-bit ChaCha20 keys.
pub const CHACHAPOLY_KEY_LEN: usize = 64;

/// Poly1305 tag length.
pub const CHACHAPOLY_TAG_LEN: usize = 16;

/// One ChaCha20 block; the payload keystream starts after it.
const CHACHA_BLOCK_LEN: u64 = 64;

/// Keyed ChaCha20-Poly1305 packet cipher.
///
/// Stateless between packets: everything varying per packet derives from the
/// caller-supplied sequence number. Both key halves are zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct ChaChaPolyCipher {
    main_key: [u8; 32],
    header_key: [u8; 32],
}

impl ChaChaPolyCipher {
    /// Create a cipher from a 64-byte combined key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidArgument`] if `key` is not 64 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != CHACHAPOLY_KEY_LEN {
            return Err(CipherError::InvalidArgument);
        }
        let mut main_key = [0u8; 32];
        let mut header_key = [0u8; 32];
        main_key.copy_from_slice(&key[..32]);
        header_key.copy_from_slice(&key[32..]);
        Ok(Self {
            main_key,
            header_key,
        })
    }

    fn main_cipher(&self, seqnr: u32) -> ChaCha20Legacy {
        let nonce = u64::from(seqnr).to_be_bytes();
        ChaCha20Legacy::new((&self.main_key).into(), (&nonce).into())
    }

    fn header_cipher(&self, seqnr: u32) -> ChaCha20Legacy {
        let nonce = u64::from(seqnr).to_be_bytes();
        ChaCha20Legacy::new((&self.header_key).into(), (&nonce).into())
    }

    /// Transform one packet.
    ///
    /// `src` and `dest` hold `aadlen` length-field bytes, `len` payload
    /// bytes, and `authlen` tag bytes (tag present in `src` only when
    /// decrypting, in `dest` only when encrypting). On decrypt the tag is
    /// verified in constant time before any payload byte is decrypted.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] if `authlen` is not the Poly1305 tag
    /// length; [`CipherError::MacInvalid`] on tag mismatch.
    #[allow(clippy::too_many_arguments)]
    pub fn crypt(
        &self,
        seqnr: u32,
        dest: &mut [u8],
        src: &[u8],
        len: usize,
        aadlen: usize,
        authlen: usize,
        encrypt: bool,
    ) -> Result<()> {
        if authlen != CHACHAPOLY_TAG_LEN {
            return Err(CipherError::InvalidArgument);
        }
        let body = aadlen.checked_add(len).ok_or(CipherError::InvalidArgument)?;
        let total = body
            .checked_add(authlen)
            .ok_or(CipherError::InvalidArgument)?;
        let (need_src, need_dest) = if encrypt { (body, total) } else { (total, body) };
        if src.len() < need_src || dest.len() < need_dest {
            return Err(CipherError::InvalidArgument);
        }

        // Poly1305 tag key: first keystream block of the main cipher.
        let mut main = self.main_cipher(seqnr);
        let mut poly_key = [0u8; 32];
        main.apply_keystream(&mut poly_key);

        let result = if encrypt {
            self.seal(seqnr, &mut main, &poly_key, dest, src, len, aadlen)
        } else {
            self.open(seqnr, &mut main, &poly_key, dest, src, len, aadlen)
        };

        poly_key.zeroize();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn seal(
        &self,
        seqnr: u32,
        main: &mut ChaCha20Legacy,
        poly_key: &[u8; 32],
        dest: &mut [u8],
        src: &[u8],
        len: usize,
        aadlen: usize,
    ) -> Result<()> {
        let mut header = self.header_cipher(seqnr);
        header
            .apply_keystream_b2b(&src[..aadlen], &mut dest[..aadlen])
            .map_err(|_| CipherError::Internal)?;

        main.seek(CHACHA_BLOCK_LEN);
        main.apply_keystream_b2b(&src[aadlen..aadlen + len], &mut dest[aadlen..aadlen + len])
            .map_err(|_| CipherError::Internal)?;

        let tag = Poly1305::new(poly_key.into()).compute_unpadded(&dest[..aadlen + len]);
        dest[aadlen + len..aadlen + len + CHACHAPOLY_TAG_LEN].copy_from_slice(&tag);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn open(
        &self,
        _seqnr: u32,
        main: &mut ChaCha20Legacy,
        poly_key: &[u8; 32],
        dest: &mut [u8],
        src: &[u8],
        len: usize,
        aadlen: usize,
    ) -> Result<()> {
        let expected = Poly1305::new(poly_key.into()).compute_unpadded(&src[..aadlen + len]);
        let provided = &src[aadlen + len..aadlen + len + CHACHAPOLY_TAG_LEN];
        if !bool::from(expected.as_slice().ct_eq(provided)) {
            return Err(CipherError::MacInvalid);
        }

        // The length field stays encrypted; pass it through unchanged.
        dest[..aadlen].copy_from_slice(&src[..aadlen]);

        main.seek(CHACHA_BLOCK_LEN);
        main.apply_keystream_b2b(&src[aadlen..aadlen + len], &mut dest[aadlen..aadlen + len])
            .map_err(|_| CipherError::Internal)?;
        Ok(())
    }

    /// Decrypt the 4-byte packet-length field under the header key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MessageIncomplete`] when fewer than 4 bytes
    /// are available.
    pub fn packet_len(&self, seqnr: u32, src: &[u8]) -> Result<u32> {
        if src.len() < 4 {
            return Err(CipherError::MessageIncomplete);
        }
        let mut buf = [0u8; 4];
        self.header_cipher(seqnr)
            .apply_keystream_b2b(&src[..4], &mut buf)
            .map_err(|_| CipherError::Internal)?;
        Ok(u32::from_be_bytes(buf))
    }
}
