//! Immutable cipher descriptor registry.
//!
//! One ordered, process-wide table describes every symmetric cipher the
//! transport can negotiate. Entries are plain data; all logic lives in the
//! lookup functions and in [`crate::context`]. The table is `&'static` and
//! read-only, so unsynchronized concurrent lookups are safe.

use alloc::vec::Vec;

/// How a cipher is identified on the wire.
///
/// Legacy ciphers from protocol version 1 are selected by a small numeric
/// identifier; everything negotiated by name is [`ProtocolClass::Modern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolClass {
    /// Protocol-1 cipher with its numeric identifier.
    Legacy(u8),
    /// Protocol-2 cipher, negotiated by name.
    Modern,
}

/// Block-cipher algorithm backing a CBC-mode descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAlg {
    /// Single DES (legacy, 8-byte key).
    Des,
    /// Triple DES EDE3 (24-byte key).
    TdesEde3,
    /// Blowfish (16-byte key).
    Blowfish,
    /// AES with a 128-bit key.
    Aes128,
    /// AES with a 192-bit key.
    Aes192,
    /// AES with a 256-bit key.
    Aes256,
}

/// AES variant backing a software-CTR descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrAlg {
    /// AES-128 counter mode.
    Aes128,
    /// AES-192 counter mode.
    Aes192,
    /// AES-256 counter mode.
    Aes256,
}

/// AES variant backing a GCM descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcmAlg {
    /// AES-128-GCM.
    Aes128,
    /// AES-256-GCM.
    Aes256,
}

/// Cipher family backing a chunked encrypt-then-authenticate descriptor.
///
/// Carried explicitly on the descriptor so dispatch never re-derives the
/// family from the cipher name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFamily {
    /// AES-128-GCM per chunk.
    Aes128Gcm,
    /// ChaCha20-Poly1305 per chunk.
    ChaChaPoly,
}

impl ChunkFamily {
    /// Key length the family requires.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            ChunkFamily::Aes128Gcm => 16,
            ChunkFamily::ChaChaPoly => 32,
        }
    }

    /// Block granularity of the underlying cipher.
    #[must_use]
    pub const fn block_len(self) -> usize {
        match self {
            ChunkFamily::Aes128Gcm => 16,
            ChunkFamily::ChaChaPoly => 64,
        }
    }
}

/// Encryption mode of a descriptor. Exactly one variant per cipher; the
/// variant also selects which runtime state a context will own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSpec {
    /// Cipher-block-chaining over a block cipher. Unauthenticated.
    Cbc(BlockAlg),
    /// Software counter mode with an exportable counter block.
    SoftCtr(CtrAlg),
    /// AEAD over a block cipher with a fixed/invocation-counter IV that
    /// evolves once per packet.
    IvCounterAead(GcmAlg),
    /// ChaCha20-Poly1305 with the nonce derived from the packet sequence
    /// number and the length field encrypted under a second key.
    ChaChaPoly,
    /// Legacy RC4 stream cipher (keystream warm-up discard applies).
    LegacyStream,
    /// Chunked encrypt-then-authenticate: fixed-size chunks, each with its
    /// own tag, the packet length hidden inside the first chunk.
    Chunked {
        /// Per-chunk AEAD family.
        family: ChunkFamily,
        /// Chunk length in bytes (ciphertext, excluding the tag).
        chunk_len: u32,
    },
    /// Plaintext passthrough.
    NoOp,
}

/// Immutable description of one supported cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherDescriptor {
    name: &'static str,
    class: ProtocolClass,
    block_len: usize,
    key_len: usize,
    iv_len: usize,
    auth_len: usize,
    discard_len: usize,
    mode: ModeSpec,
}

/// Per-chunk authentication tag length for the chunked family.
pub const CHUNK_TAG_LEN: usize = 16;

const fn chunked(name: &'static str, family: ChunkFamily, chunk_len: u32) -> CipherDescriptor {
    CipherDescriptor {
        name,
        class: ProtocolClass::Modern,
        block_len: family.block_len(),
        key_len: family.key_len(),
        iv_len: 0,
        auth_len: CHUNK_TAG_LEN,
        discard_len: 0,
        mode: ModeSpec::Chunked { family, chunk_len },
    }
}

#[allow(clippy::too_many_arguments)]
const fn cipher(
    name: &'static str,
    class: ProtocolClass,
    block_len: usize,
    key_len: usize,
    iv_len: usize,
    auth_len: usize,
    discard_len: usize,
    mode: ModeSpec,
) -> CipherDescriptor {
    CipherDescriptor {
        name,
        class,
        block_len,
        key_len,
        iv_len,
        auth_len,
        discard_len,
        mode,
    }
}

/// Numeric identifier of the "none" cipher in the legacy numbering.
pub const LEGACY_NONE: u8 = 0;
/// Numeric identifier of single DES in the legacy numbering.
pub const LEGACY_DES: u8 = 2;

#[rustfmt::skip]
static CIPHERS: &[CipherDescriptor] = &[
    cipher("none",        ProtocolClass::Legacy(LEGACY_NONE), 8,  0, 0, 0, 0, ModeSpec::NoOp),
    cipher("des",         ProtocolClass::Legacy(LEGACY_DES),  8,  8, 0, 0, 0, ModeSpec::Cbc(BlockAlg::Des)),
    cipher("3des-cbc",    ProtocolClass::Modern, 8,  24, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::TdesEde3)),
    cipher("blowfish-cbc", ProtocolClass::Modern, 8, 16, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::Blowfish)),
    cipher("arcfour",     ProtocolClass::Modern, 8,  16, 0, 0, 0,    ModeSpec::LegacyStream),
    cipher("arcfour128",  ProtocolClass::Modern, 8,  16, 0, 0, 1536, ModeSpec::LegacyStream),
    cipher("arcfour256",  ProtocolClass::Modern, 8,  32, 0, 0, 1536, ModeSpec::LegacyStream),
    cipher("aes128-cbc",  ProtocolClass::Modern, 16, 16, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::Aes128)),
    cipher("aes192-cbc",  ProtocolClass::Modern, 16, 24, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::Aes192)),
    cipher("aes256-cbc",  ProtocolClass::Modern, 16, 32, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::Aes256)),
    cipher("rijndael-cbc@lysator.liu.se",
                          ProtocolClass::Modern, 16, 32, 0, 0, 0,    ModeSpec::Cbc(BlockAlg::Aes256)),
    cipher("aes128-ctr",  ProtocolClass::Modern, 16, 16, 0, 0, 0,    ModeSpec::SoftCtr(CtrAlg::Aes128)),
    cipher("aes192-ctr",  ProtocolClass::Modern, 16, 24, 0, 0, 0,    ModeSpec::SoftCtr(CtrAlg::Aes192)),
    cipher("aes256-ctr",  ProtocolClass::Modern, 16, 32, 0, 0, 0,    ModeSpec::SoftCtr(CtrAlg::Aes256)),
    cipher("aes128-gcm@skiff.dev",
                          ProtocolClass::Modern, 16, 16, 12, 16, 0,  ModeSpec::IvCounterAead(GcmAlg::Aes128)),
    cipher("aes256-gcm@skiff.dev",
                          ProtocolClass::Modern, 16, 32, 12, 16, 0,  ModeSpec::IvCounterAead(GcmAlg::Aes256)),
    cipher("chacha20-poly1305@skiff.dev",
                          ProtocolClass::Modern, 8,  64, 0, 16, 0,   ModeSpec::ChaChaPoly),
    chunked("im-aes128-gcm-127",   ChunkFamily::Aes128Gcm,  127),
    chunked("im-chacha-poly-127",  ChunkFamily::ChaChaPoly, 127),
    chunked("im-aes128-gcm-128",   ChunkFamily::Aes128Gcm,  128),
    chunked("im-chacha-poly-128",  ChunkFamily::ChaChaPoly, 128),
    chunked("im-aes128-gcm-255",   ChunkFamily::Aes128Gcm,  255),
    chunked("im-chacha-poly-255",  ChunkFamily::ChaChaPoly, 255),
    chunked("im-aes128-gcm-256",   ChunkFamily::Aes128Gcm,  256),
    chunked("im-chacha-poly-256",  ChunkFamily::ChaChaPoly, 256),
    chunked("im-aes128-gcm-511",   ChunkFamily::Aes128Gcm,  511),
    chunked("im-chacha-poly-511",  ChunkFamily::ChaChaPoly, 511),
    chunked("im-aes128-gcm-512",   ChunkFamily::Aes128Gcm,  512),
    chunked("im-chacha-poly-512",  ChunkFamily::ChaChaPoly, 512),
    chunked("im-aes128-gcm-1023",  ChunkFamily::Aes128Gcm,  1023),
    chunked("im-chacha-poly-1023", ChunkFamily::ChaChaPoly, 1023),
    chunked("im-aes128-gcm-1024",  ChunkFamily::Aes128Gcm,  1024),
    chunked("im-chacha-poly-1024", ChunkFamily::ChaChaPoly, 1024),
    chunked("im-aes128-gcm-2047",  ChunkFamily::Aes128Gcm,  2047),
    chunked("im-chacha-poly-2047", ChunkFamily::ChaChaPoly, 2047),
    chunked("im-aes128-gcm-2048",  ChunkFamily::Aes128Gcm,  2048),
    chunked("im-chacha-poly-2048", ChunkFamily::ChaChaPoly, 2048),
    chunked("im-aes128-gcm-4095",  ChunkFamily::Aes128Gcm,  4095),
    chunked("im-chacha-poly-4095", ChunkFamily::ChaChaPoly, 4095),
    chunked("im-aes128-gcm-4096",  ChunkFamily::Aes128Gcm,  4096),
    chunked("im-chacha-poly-4096", ChunkFamily::ChaChaPoly, 4096),
    chunked("im-aes128-gcm-8191",  ChunkFamily::Aes128Gcm,  8191),
    chunked("im-chacha-poly-8191", ChunkFamily::ChaChaPoly, 8191),
    chunked("im-aes128-gcm-8192",  ChunkFamily::Aes128Gcm,  8192),
    chunked("im-chacha-poly-8192", ChunkFamily::ChaChaPoly, 8192),
];

impl CipherDescriptor {
    /// Cipher name, the negotiation key.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wire identification class.
    #[must_use]
    pub fn class(&self) -> ProtocolClass {
        self.class
    }

    /// Block granularity in bytes. Packet payload lengths must be a multiple
    /// of this for block-oriented modes.
    #[must_use]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Required key length in bytes.
    #[must_use]
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Effective IV length in bytes.
    ///
    /// A zero entry in the table defaults to the block length, except for
    /// modes that take no IV at all (sequence-number-derived nonces, the
    /// chunked family, the legacy stream cipher, and "none").
    #[must_use]
    pub fn iv_len(&self) -> usize {
        match self.mode {
            ModeSpec::ChaChaPoly
            | ModeSpec::Chunked { .. }
            | ModeSpec::LegacyStream
            | ModeSpec::NoOp => 0,
            _ => {
                if self.iv_len != 0 {
                    self.iv_len
                } else {
                    self.block_len
                }
            }
        }
    }

    /// Authentication tag length in bytes; zero for unauthenticated modes.
    /// For the chunked family this is the per-chunk tag length.
    #[must_use]
    pub fn auth_len(&self) -> usize {
        self.auth_len
    }

    /// Keystream warm-up bytes to run through the cipher and throw away at
    /// initialization. Nonzero only for the weak-early-keystream stream
    /// ciphers.
    #[must_use]
    pub fn discard_len(&self) -> usize {
        self.discard_len
    }

    /// Encryption mode.
    #[must_use]
    pub fn mode(&self) -> ModeSpec {
        self.mode
    }

    /// Whether this cipher runs in CBC mode.
    #[must_use]
    pub fn is_cbc(&self) -> bool {
        matches!(self.mode, ModeSpec::Cbc(_))
    }

    /// Whether this cipher is a chunked encrypt-then-authenticate suite.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        matches!(self.mode, ModeSpec::Chunked { .. })
    }

    /// Whether this cipher authenticates what it encrypts.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_len > 0
    }

    /// Chunk length for chunked suites, `None` otherwise.
    #[must_use]
    pub fn chunk_len(&self) -> Option<usize> {
        match self.mode {
            ModeSpec::Chunked { chunk_len, .. } => Some(chunk_len as usize),
            _ => None,
        }
    }

    /// Advisory warning to surface when this cipher is selected.
    #[must_use]
    pub fn warning(&self) -> Option<&'static str> {
        match self.class {
            ProtocolClass::Legacy(LEGACY_DES) => Some(
                "use of DES is strongly discouraged due to cryptographic weaknesses",
            ),
            _ => None,
        }
    }
}

/// All descriptors, in registration order.
#[must_use]
pub fn all() -> &'static [CipherDescriptor] {
    CIPHERS
}

/// Look up a descriptor by its exact name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static CipherDescriptor> {
    CIPHERS.iter().find(|c| c.name == name)
}

/// Look up a legacy-numbered descriptor by its protocol number.
#[must_use]
pub fn by_number(number: u8) -> Option<&'static CipherDescriptor> {
    CIPHERS
        .iter()
        .find(|c| c.class == ProtocolClass::Legacy(number))
}

/// Resolve a cipher name to its legacy protocol number, matching the name
/// case-insensitively. Modern ciphers have no number and yield `None`.
#[must_use]
pub fn number_for_name(name: &str) -> Option<u8> {
    CIPHERS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .and_then(|c| match c.class {
            ProtocolClass::Legacy(n) => Some(n),
            ProtocolClass::Modern => None,
        })
}

/// Resolve a legacy protocol number back to its cipher name.
#[must_use]
pub fn name_for_number(number: u8) -> Option<&'static str> {
    by_number(number).map(|c| c.name)
}

/// Names of all modern-class ciphers in registration order.
///
/// With `auth_only`, only ciphers carrying an authentication tag are listed.
#[must_use]
pub fn alg_list(auth_only: bool) -> Vec<&'static str> {
    CIPHERS
        .iter()
        .filter(|c| c.class == ProtocolClass::Modern)
        .filter(|c| !auth_only || c.auth_len > 0)
        .map(|c| c.name)
        .collect()
}

/// Validate a comma-separated cipher name list for negotiation.
///
/// Returns `false` on an empty list or if any name is unknown or not a
/// modern-class cipher.
#[must_use]
pub fn ciphers_valid(names: &str) -> bool {
    if names.is_empty() {
        return false;
    }
    names.split(',').all(|name| {
        by_name(name).is_some_and(|c| c.class == ProtocolClass::Modern)
    })
}
