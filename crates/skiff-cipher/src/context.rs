//! Per-session cipher contexts and the unified transform.
//!
//! A [`CipherCtx`] binds one registry descriptor to one direction and owns
//! exactly one mode-specific runtime state. The transport drives it with
//! three calls per packet at most: [`CipherCtx::packet_length`] when the
//! length field is not in cleartext, [`CipherCtx::crypt`] for the packet
//! body, and nothing else. Contexts are never re-keyed; a re-key builds a
//! fresh context and drops the old one, which zeroizes its key material.

use alloc::vec::Vec;

use zeroize::Zeroizing;

use crate::block::CbcCipher;
use crate::chachapoly::ChaChaPolyCipher;
use crate::chunked::ChunkSession;
use crate::ctr::{CTR_BLOCK_LEN, SoftCtrCipher};
use crate::error::{CipherError, Result};
use crate::gcm::{GCM_IV_LEN, GcmCipher};
use crate::kdf;
use crate::registry::{CipherDescriptor, LEGACY_DES, ModeSpec, ProtocolClass};
use crate::stream::{ENGINE_STATE_LEN, LegacyStreamCipher};

/// Transform direction, fixed when the context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The context seals outgoing packets.
    Encrypt,
    /// The context opens incoming packets.
    Decrypt,
}

/// Mode-specific runtime state. Exactly one variant exists per context,
/// selected by the descriptor's [`ModeSpec`].
enum ModeState {
    Cbc(CbcCipher),
    Ctr(SoftCtrCipher),
    Gcm(GcmCipher),
    ChaChaPoly(ChaChaPolyCipher),
    Stream(LegacyStreamCipher),
    Chunked(ChunkSession),
    NoOp,
}

/// One live cipher session.
pub struct CipherCtx {
    cipher: &'static CipherDescriptor,
    dir: Direction,
    plaintext: bool,
    state: ModeState,
}

impl CipherCtx {
    /// Create a context for `cipher` keyed with `key` and, where the mode
    /// takes one, `iv`. A missing IV defaults to all zero bytes.
    ///
    /// The legacy single-key-size cipher silently truncates an over-long
    /// key. No other cipher truncates: fixed-key-size engines reject a key
    /// that is not exactly their declared length, the variable-key ciphers
    /// use all of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidArgument`] if `key` does not satisfy
    /// the descriptor's key-length contract, or `iv` is given but shorter
    /// than the effective IV length.
    pub fn new(
        cipher: &'static CipherDescriptor,
        key: &[u8],
        iv: Option<&[u8]>,
        dir: Direction,
    ) -> Result<Self> {
        let mut key = key;
        if cipher.class() == ProtocolClass::Legacy(LEGACY_DES) && key.len() > cipher.key_len() {
            key = &key[..cipher.key_len()];
        }

        if key.len() < cipher.key_len() {
            return Err(CipherError::InvalidArgument);
        }
        let iv_len = cipher.iv_len();
        if let Some(iv) = iv {
            if iv.len() < iv_len {
                return Err(CipherError::InvalidArgument);
            }
        }
        let mut iv_buf = Zeroizing::new(alloc::vec![0u8; iv_len]);
        if let Some(iv) = iv {
            iv_buf.copy_from_slice(&iv[..iv_len]);
        }

        // Fixed-key-size engines reject anything but their exact length;
        // the variable-key ciphers (blowfish, arcfour) consume the whole
        // key the caller supplied.
        let state = match cipher.mode() {
            ModeSpec::NoOp => ModeState::NoOp,
            ModeSpec::Cbc(alg) => ModeState::Cbc(CbcCipher::new(alg, key, &iv_buf)?),
            ModeSpec::SoftCtr(alg) => ModeState::Ctr(SoftCtrCipher::new(alg, key, &iv_buf)?),
            ModeSpec::IvCounterAead(alg) => ModeState::Gcm(GcmCipher::new(alg, key, &iv_buf)?),
            ModeSpec::ChaChaPoly => ModeState::ChaChaPoly(ChaChaPolyCipher::new(key)?),
            ModeSpec::LegacyStream => {
                let mut engine = LegacyStreamCipher::new(key);
                engine.discard(cipher.discard_len());
                ModeState::Stream(engine)
            }
            ModeSpec::Chunked { family, chunk_len } => ModeState::Chunked(ChunkSession::new(
                family,
                chunk_len as usize,
                key,
                dir,
            )?),
        };

        Ok(Self {
            cipher,
            dir,
            plaintext: matches!(cipher.mode(), ModeSpec::NoOp),
            state,
        })
    }

    /// Create a context keyed from a passphrase (legacy stored-key path).
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidArgument`] if the cipher needs a key
    /// longer than the passphrase digest provides.
    pub fn from_passphrase(
        cipher: &'static CipherDescriptor,
        passphrase: &str,
        dir: Direction,
    ) -> Result<Self> {
        let key = kdf::passphrase_key(passphrase);
        Self::new(cipher, &key[..], None, dir)
    }

    /// The bound descriptor.
    #[must_use]
    pub fn cipher(&self) -> &'static CipherDescriptor {
        self.cipher
    }

    /// The fixed transform direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Whether this context passes data through unencrypted.
    #[must_use]
    pub fn is_plaintext(&self) -> bool {
        self.plaintext
    }

    /// Transform one packet.
    ///
    /// `src` and `dest` are laid out as `[AAD | payload | tag]`: `aadlen`
    /// bytes copied verbatim but authenticated when the mode carries a tag,
    /// `len` payload bytes transformed, `authlen` tag bytes written on
    /// encrypt and verified on decrypt. Counter/IV-evolving modes mutate
    /// their state in place; on any error the caller must discard `dest`,
    /// partial writes are not rolled back. GCM ignores `seqnr` (its IV
    /// evolves by invocation), every other authenticated mode binds the
    /// packet to it.
    ///
    /// For chunked ciphers the call delegates to the session: on encrypt
    /// `dest` must hold [`Self::chunked_wire_len`] bytes and `authlen` is
    /// advisory; on decrypt `src` is the whole chunked wire and `dest`
    /// receives `len` payload bytes.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] for length/tag-contract violations,
    /// [`CipherError::MacInvalid`] for authentication failures on decrypt,
    /// [`CipherError::MessageIncomplete`] for truncated chunked input.
    pub fn crypt(
        &mut self,
        seqnr: u32,
        dest: &mut [u8],
        src: &[u8],
        len: usize,
        aadlen: usize,
        authlen: usize,
    ) -> Result<()> {
        if let ModeState::Chunked(session) = &mut self.state {
            return match self.dir {
                Direction::Encrypt => {
                    if src.len() < len {
                        return Err(CipherError::InvalidArgument);
                    }
                    let wire = session.seal_packet(seqnr, &src[..len])?;
                    if dest.len() < wire.len() {
                        return Err(CipherError::InvalidArgument);
                    }
                    dest[..wire.len()].copy_from_slice(&wire);
                    Ok(())
                }
                Direction::Decrypt => session.open_packet(seqnr, src, len, dest),
            };
        }

        let body = aadlen
            .checked_add(len)
            .ok_or(CipherError::InvalidArgument)?;
        let total = body
            .checked_add(authlen)
            .ok_or(CipherError::InvalidArgument)?;
        let (need_src, need_dest) = match self.dir {
            Direction::Encrypt => (body, total),
            Direction::Decrypt => (total, body),
        };
        if src.len() < need_src || dest.len() < need_dest {
            return Err(CipherError::InvalidArgument);
        }

        match &mut self.state {
            ModeState::ChaChaPoly(cipher) => cipher.crypt(
                seqnr,
                dest,
                src,
                len,
                aadlen,
                authlen,
                self.dir == Direction::Encrypt,
            ),
            ModeState::Ctr(cipher) => {
                if authlen != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                dest[..aadlen].copy_from_slice(&src[..aadlen]);
                cipher.xor_stream(&mut dest[aadlen..aadlen + len], &src[aadlen..aadlen + len]);
                Ok(())
            }
            ModeState::Stream(cipher) => {
                if authlen != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                dest[..aadlen].copy_from_slice(&src[..aadlen]);
                cipher.xor_stream(&mut dest[aadlen..aadlen + len], &src[aadlen..aadlen + len]);
                Ok(())
            }
            ModeState::NoOp => {
                if authlen != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                dest[..aadlen + len].copy_from_slice(&src[..aadlen + len]);
                Ok(())
            }
            ModeState::Cbc(cipher) => {
                if authlen != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                if len % self.cipher.block_len() != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                dest[..aadlen].copy_from_slice(&src[..aadlen]);
                let payload = &mut dest[aadlen..aadlen + len];
                payload.copy_from_slice(&src[aadlen..aadlen + len]);
                match self.dir {
                    Direction::Encrypt => cipher.encrypt(payload),
                    Direction::Decrypt => cipher.decrypt(payload),
                }
            }
            ModeState::Gcm(cipher) => {
                if authlen != self.cipher.auth_len() {
                    return Err(CipherError::InvalidArgument);
                }
                if len % self.cipher.block_len() != 0 {
                    return Err(CipherError::InvalidArgument);
                }
                dest[..aadlen].copy_from_slice(&src[..aadlen]);
                let aad = &src[..aadlen];
                match self.dir {
                    Direction::Encrypt => {
                        let (payload, tag) = dest[aadlen..aadlen + len + authlen]
                            .split_at_mut(len);
                        payload.copy_from_slice(&src[aadlen..aadlen + len]);
                        cipher.seal(aad, payload, tag)
                    }
                    Direction::Decrypt => {
                        let payload = &mut dest[aadlen..aadlen + len];
                        payload.copy_from_slice(&src[aadlen..aadlen + len]);
                        let tag = &src[aadlen + len..aadlen + len + authlen];
                        cipher.open(aad, payload, tag)
                    }
                }
            }
            ModeState::Chunked(_) => Err(CipherError::Internal),
        }
    }

    /// Extract the next packet's payload length from `src`, decrypting the
    /// length field first where the mode hides it.
    ///
    /// # Errors
    ///
    /// [`CipherError::MessageIncomplete`] when `src` does not yet hold
    /// enough bytes; [`CipherError::MacInvalid`] when a chunked session
    /// fails authentication on the first chunk.
    pub fn packet_length(&mut self, seqnr: u32, src: &[u8]) -> Result<u32> {
        match &mut self.state {
            ModeState::ChaChaPoly(cipher) => cipher.packet_len(seqnr, src),
            ModeState::Chunked(session) => session.packet_len(seqnr, src),
            _ => {
                if src.len() < 4 {
                    return Err(CipherError::MessageIncomplete);
                }
                let mut len = [0u8; 4];
                len.copy_from_slice(&src[..4]);
                Ok(u32::from_be_bytes(len))
            }
        }
    }

    /// Wire size of a chunked packet carrying `payload_len` bytes.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] if this context is not a chunked
    /// cipher; [`CipherError::AllocFail`] on size overflow.
    pub fn chunked_wire_len(&self, payload_len: usize) -> Result<usize> {
        match &self.state {
            ModeState::Chunked(session) => session.wire_len(payload_len),
            _ => Err(CipherError::InvalidArgument),
        }
    }

    /// Length of the IV blob [`Self::export_iv`] produces for this mode.
    #[must_use]
    pub fn iv_export_len(&self) -> usize {
        match &self.state {
            ModeState::Cbc(_) => self.cipher.block_len(),
            ModeState::Ctr(_) => CTR_BLOCK_LEN,
            ModeState::Gcm(_) => GCM_IV_LEN,
            ModeState::ChaChaPoly(_)
            | ModeState::Stream(_)
            | ModeState::Chunked(_)
            | ModeState::NoOp => 0,
        }
    }

    /// Export the evolving IV/counter state into `out` for the
    /// privilege-separation handoff. Modes that derive everything from the
    /// sequence number export nothing.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] when `out` does not match
    /// [`Self::iv_export_len`].
    pub fn export_iv(&self, out: &mut [u8]) -> Result<()> {
        match &self.state {
            ModeState::ChaChaPoly(_) => {
                if out.is_empty() {
                    Ok(())
                } else {
                    Err(CipherError::InvalidArgument)
                }
            }
            ModeState::Cbc(cipher) => {
                if out.len() != cipher.iv().len() {
                    return Err(CipherError::InvalidArgument);
                }
                out.copy_from_slice(cipher.iv());
                Ok(())
            }
            ModeState::Ctr(cipher) => {
                if out.len() != CTR_BLOCK_LEN {
                    return Err(CipherError::InvalidArgument);
                }
                out.copy_from_slice(cipher.counter());
                Ok(())
            }
            ModeState::Gcm(cipher) => {
                if out.len() != GCM_IV_LEN {
                    return Err(CipherError::InvalidArgument);
                }
                out.copy_from_slice(cipher.iv());
                Ok(())
            }
            ModeState::Stream(_) | ModeState::Chunked(_) | ModeState::NoOp => Ok(()),
        }
    }

    /// Import an IV/counter blob previously produced by [`Self::export_iv`]
    /// on a context of the same cipher. Modes without exportable IV state
    /// accept and ignore the call.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] on a size mismatch.
    pub fn import_iv(&mut self, iv: &[u8]) -> Result<()> {
        match &mut self.state {
            ModeState::Cbc(cipher) => cipher.set_iv(iv),
            ModeState::Ctr(cipher) => cipher.set_counter(iv),
            ModeState::Gcm(cipher) => cipher.set_iv(iv),
            ModeState::ChaChaPoly(_)
            | ModeState::Stream(_)
            | ModeState::Chunked(_)
            | ModeState::NoOp => Ok(()),
        }
    }

    /// Length of the opaque engine-state blob for this mode; nonzero only
    /// for the legacy stream cipher, whose permutation cannot be rebuilt
    /// from an IV.
    #[must_use]
    pub fn engine_state_len(&self) -> usize {
        match &self.state {
            ModeState::Stream(_) => ENGINE_STATE_LEN,
            _ => 0,
        }
    }

    /// Export the opaque engine state (empty for all but the legacy stream
    /// cipher).
    #[must_use]
    pub fn export_engine_state(&self) -> Vec<u8> {
        match &self.state {
            ModeState::Stream(cipher) => cipher.export_state().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Import an engine-state blob previously produced by
    /// [`Self::export_engine_state`].
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidArgument`] on a size mismatch.
    pub fn import_engine_state(&mut self, blob: &[u8]) -> Result<()> {
        match &mut self.state {
            ModeState::Stream(cipher) => cipher.import_state(blob),
            _ => {
                if blob.is_empty() {
                    Ok(())
                } else {
                    Err(CipherError::InvalidArgument)
                }
            }
        }
    }
}
