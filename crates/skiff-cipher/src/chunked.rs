//! Chunked encrypt-then-authenticate framing.
//!
//! A length-hiding mode: each packet becomes a run of fixed-size ciphertext
//! chunks, each carrying its own 16-byte tag, with the real payload length
//! folded into the plaintext of the first chunk. An observer sees only
//! multiples of the chunk size, never the packet length.
//!
//! A decrypt session walks idle -> accumulating -> chunk-complete per chunk:
//! length extraction opens and holds the first chunk, the remaining chunks
//! are opened one at a time when the packet is complete. Any tag failure
//! poisons the session permanently; chunk nonces are bound to the sequence
//! number and a desynchronized stream cannot be recovered.

use alloc::vec::Vec;

use aes_gcm::Aes128Gcm;
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{AeadInPlace, KeyInit},
};
use zeroize::Zeroize;

use crate::context::Direction;
use crate::error::{CipherError, Result};
use crate::registry::{CHUNK_TAG_LEN, ChunkFamily};

/// Bytes of the length field folded into the first chunk.
const LEN_FIELD_LEN: usize = 4;

enum ChunkEngine {
    Gcm(Aes128Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl ChunkEngine {
    fn seal(&self, nonce: &[u8; 12], buf: &mut [u8], tag_out: &mut [u8]) -> Result<()> {
        let nonce = Nonce::from_slice(nonce);
        let tag = match self {
            ChunkEngine::Gcm(c) => c.encrypt_in_place_detached(nonce, &[], buf),
            ChunkEngine::ChaCha(c) => c.encrypt_in_place_detached(nonce, &[], buf),
        }
        .map_err(|_| CipherError::Primitive)?;
        tag_out.copy_from_slice(&tag);
        Ok(())
    }

    fn open(&self, nonce: &[u8; 12], buf: &mut [u8], tag: &[u8]) -> Result<()> {
        let nonce = Nonce::from_slice(nonce);
        let tag = chacha20poly1305::Tag::from_slice(tag);
        match self {
            ChunkEngine::Gcm(c) => c.decrypt_in_place_detached(nonce, &[], buf, tag),
            ChunkEngine::ChaCha(c) => c.decrypt_in_place_detached(nonce, &[], buf, tag),
        }
        .map_err(|_| CipherError::MacInvalid)
    }
}

/// One chunked encrypt-then-authenticate session, bound to a direction.
pub struct ChunkSession {
    engine: ChunkEngine,
    chunk_len: usize,
    dir: Direction,
    /// First chunk opened by length extraction, held until the packet body
    /// arrives: (sequence number, chunk plaintext).
    first_chunk: Option<(u32, Vec<u8>)>,
    poisoned: bool,
}

impl ChunkSession {
    /// Create a session for one direction.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidArgument`] if the key does not match
    /// the family's key length or `chunk_len` is too small to hold the
    /// length field.
    pub fn new(family: ChunkFamily, chunk_len: usize, key: &[u8], dir: Direction) -> Result<Self> {
        if key.len() != family.key_len() || chunk_len <= LEN_FIELD_LEN {
            return Err(CipherError::InvalidArgument);
        }
        let engine = match family {
            ChunkFamily::Aes128Gcm => ChunkEngine::Gcm(
                Aes128Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
            ChunkFamily::ChaChaPoly => ChunkEngine::ChaCha(
                ChaCha20Poly1305::new_from_slice(key).map_err(|_| CipherError::InvalidArgument)?,
            ),
        };
        Ok(Self {
            engine,
            chunk_len,
            dir,
            first_chunk: None,
            poisoned: false,
        })
    }

    /// Chunk length of this session in bytes.
    #[must_use]
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Wire size of a packet carrying `payload_len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AllocFail`] if the size overflows.
    pub fn wire_len(&self, payload_len: usize) -> Result<usize> {
        let chunks = self.chunk_count(payload_len)?;
        chunks
            .checked_mul(self.chunk_len + CHUNK_TAG_LEN)
            .ok_or(CipherError::AllocFail)
    }

    fn chunk_count(&self, payload_len: usize) -> Result<usize> {
        let msg_len = payload_len
            .checked_add(LEN_FIELD_LEN)
            .ok_or(CipherError::AllocFail)?;
        Ok(msg_len.div_ceil(self.chunk_len))
    }

    fn nonce(seqnr: u32, chunk_index: u32) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        nonce[..8].copy_from_slice(&u64::from(seqnr).to_be_bytes());
        nonce[8..].copy_from_slice(&chunk_index.to_be_bytes());
        nonce
    }

    fn check_usable(&self, dir: Direction) -> Result<()> {
        if self.poisoned {
            return Err(CipherError::MacInvalid);
        }
        if self.dir != dir {
            return Err(CipherError::Internal);
        }
        Ok(())
    }

    /// Encrypt one packet into its chunked wire form.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] if the payload cannot be described
    /// by a 32-bit length field; [`CipherError::Internal`] if the session
    /// was created for decryption.
    pub fn seal_packet(&mut self, seqnr: u32, payload: &[u8]) -> Result<Vec<u8>> {
        self.check_usable(Direction::Encrypt)?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| CipherError::InvalidArgument)?;

        let chunks = self.chunk_count(payload.len())?;
        let wire_len = self.wire_len(payload.len())?;

        let mut plain = alloc::vec![0u8; chunks * self.chunk_len];
        plain[..LEN_FIELD_LEN].copy_from_slice(&payload_len.to_be_bytes());
        plain[LEN_FIELD_LEN..LEN_FIELD_LEN + payload.len()].copy_from_slice(payload);

        let mut wire = Vec::with_capacity(wire_len);
        let mut tag = [0u8; CHUNK_TAG_LEN];
        for (idx, chunk) in plain.chunks_mut(self.chunk_len).enumerate() {
            let nonce = Self::nonce(seqnr, idx as u32);
            self.engine.seal(&nonce, chunk, &mut tag)?;
            wire.extend_from_slice(chunk);
            wire.extend_from_slice(&tag);
        }

        plain.zeroize();
        Ok(wire)
    }

    /// Open the first chunk and extract the packet length hidden in it.
    ///
    /// The opened chunk is retained so [`Self::open_packet`] does not verify
    /// it twice.
    ///
    /// # Errors
    ///
    /// [`CipherError::MessageIncomplete`] until one full chunk and its tag
    /// are available; [`CipherError::MacInvalid`] on tag failure, which
    /// poisons the session.
    pub fn packet_len(&mut self, seqnr: u32, src: &[u8]) -> Result<u32> {
        self.check_usable(Direction::Decrypt)?;

        if let Some((cached_seqnr, chunk)) = &self.first_chunk {
            if *cached_seqnr == seqnr {
                let mut len = [0u8; LEN_FIELD_LEN];
                len.copy_from_slice(&chunk[..LEN_FIELD_LEN]);
                return Ok(u32::from_be_bytes(len));
            }
        }
        self.drop_first_chunk();

        if src.len() < self.chunk_len + CHUNK_TAG_LEN {
            return Err(CipherError::MessageIncomplete);
        }

        let mut chunk = src[..self.chunk_len].to_vec();
        let tag = &src[self.chunk_len..self.chunk_len + CHUNK_TAG_LEN];
        let nonce = Self::nonce(seqnr, 0);
        if let Err(err) = self.engine.open(&nonce, &mut chunk, tag) {
            chunk.zeroize();
            self.poisoned = true;
            return Err(err);
        }

        let mut len = [0u8; LEN_FIELD_LEN];
        len.copy_from_slice(&chunk[..LEN_FIELD_LEN]);
        self.first_chunk = Some((seqnr, chunk));
        Ok(u32::from_be_bytes(len))
    }

    /// Decrypt one packet from its chunked wire form.
    ///
    /// `payload_len` is the length previously recovered by
    /// [`Self::packet_len`]; `dest` receives exactly that many bytes.
    ///
    /// # Errors
    ///
    /// [`CipherError::MessageIncomplete`] if `src` is truncated;
    /// [`CipherError::InvalidArgument`] on oversized input, a too-small
    /// `dest`, or a length field disagreeing with `payload_len`;
    /// [`CipherError::MacInvalid`] on any chunk tag failure, which poisons
    /// the session.
    pub fn open_packet(
        &mut self,
        seqnr: u32,
        src: &[u8],
        payload_len: usize,
        dest: &mut [u8],
    ) -> Result<()> {
        self.check_usable(Direction::Decrypt)?;

        let chunks = self.chunk_count(payload_len)?;
        let wire_len = self.wire_len(payload_len)?;
        if src.len() < wire_len {
            return Err(CipherError::MessageIncomplete);
        }
        if src.len() > wire_len || dest.len() < payload_len {
            return Err(CipherError::InvalidArgument);
        }

        let mut plain = Vec::with_capacity(chunks * self.chunk_len);
        let stride = self.chunk_len + CHUNK_TAG_LEN;
        for idx in 0..chunks {
            let body = &src[idx * stride..idx * stride + self.chunk_len];
            let tag = &src[idx * stride + self.chunk_len..(idx + 1) * stride];

            if idx == 0 {
                if let Some((cached_seqnr, mut chunk)) = self.first_chunk.take() {
                    let hit = cached_seqnr == seqnr;
                    if hit {
                        plain.extend_from_slice(&chunk);
                    }
                    chunk.zeroize();
                    if hit {
                        continue;
                    }
                }
            }

            let mut chunk = body.to_vec();
            let nonce = Self::nonce(seqnr, idx as u32);
            if let Err(err) = self.engine.open(&nonce, &mut chunk, tag) {
                chunk.zeroize();
                plain.zeroize();
                self.poisoned = true;
                return Err(err);
            }
            plain.extend_from_slice(&chunk);
            chunk.zeroize();
        }

        let mut len = [0u8; LEN_FIELD_LEN];
        len.copy_from_slice(&plain[..LEN_FIELD_LEN]);
        if u32::from_be_bytes(len) as usize != payload_len {
            plain.zeroize();
            return Err(CipherError::InvalidArgument);
        }

        dest[..payload_len].copy_from_slice(&plain[LEN_FIELD_LEN..LEN_FIELD_LEN + payload_len]);
        plain.zeroize();
        Ok(())
    }

    fn drop_first_chunk(&mut self) {
        if let Some((_, mut chunk)) = self.first_chunk.take() {
            chunk.zeroize();
        }
    }
}

impl Drop for ChunkSession {
    fn drop(&mut self) {
        self.drop_first_chunk();
    }
}
