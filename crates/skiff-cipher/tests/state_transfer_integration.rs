//! Integration tests: IV/counter and legacy engine state transfer.
//!
//! Models the privilege-separation handoff: a context decrypts part of a
//! stream, its mutable state is serialized, and a context built fresh from
//! the original key resumes the stream after importing that state.

use skiff_cipher::context::{CipherCtx, Direction};
use skiff_cipher::error::CipherError;
use skiff_cipher::registry;

fn pair(name: &str) -> (CipherCtx, CipherCtx) {
    let cipher = registry::by_name(name).unwrap();
    let key = vec![0x42u8; cipher.key_len()];
    let iv = vec![0x24u8; cipher.iv_len()];
    let iv = if iv.is_empty() { None } else { Some(&iv[..]) };
    let enc = CipherCtx::new(cipher, &key, iv, Direction::Encrypt).unwrap();
    let dec = CipherCtx::new(cipher, &key, iv, Direction::Decrypt).unwrap();
    (enc, dec)
}

fn fresh_decrypt(name: &str) -> CipherCtx {
    let cipher = registry::by_name(name).unwrap();
    let key = vec![0x42u8; cipher.key_len()];
    let iv = vec![0x24u8; cipher.iv_len()];
    let iv = if iv.is_empty() { None } else { Some(&iv[..]) };
    CipherCtx::new(cipher, &key, iv, Direction::Decrypt).unwrap()
}

/// Encrypt two packets, decrypt the first in one context, then hand the
/// stream over to a freshly keyed context via the exported IV state.
fn handoff_resumes_stream(name: &str, authlen: usize) {
    let cipher = registry::by_name(name).unwrap();
    let payload = vec![0x5au8; cipher.block_len() * 4];
    let (mut enc, mut dec) = pair(name);

    let mut w1 = vec![0u8; payload.len() + authlen];
    let mut w2 = vec![0u8; payload.len() + authlen];
    enc.crypt(0, &mut w1, &payload, payload.len(), 0, authlen)
        .unwrap();
    enc.crypt(1, &mut w2, &payload, payload.len(), 0, authlen)
        .unwrap();

    let mut out = vec![0u8; payload.len() + authlen];
    dec.crypt(0, &mut out, &w1, payload.len(), 0, authlen)
        .unwrap();
    assert_eq!(&out[..payload.len()], &payload[..]);

    let mut blob = vec![0u8; dec.iv_export_len()];
    dec.export_iv(&mut blob).unwrap();

    let mut resumed = fresh_decrypt(name);
    resumed.import_iv(&blob).unwrap();
    let mut out2 = vec![0u8; payload.len() + authlen];
    resumed
        .crypt(1, &mut out2, &w2, payload.len(), 0, authlen)
        .unwrap();
    assert_eq!(&out2[..payload.len()], &payload[..], "{name}: resumed packet");
}

#[test]
fn cbc_handoff() {
    handoff_resumes_stream("aes256-cbc", 0);
    handoff_resumes_stream("3des-cbc", 0);
}

#[test]
fn ctr_handoff() {
    handoff_resumes_stream("aes128-ctr", 0);
    handoff_resumes_stream("aes256-ctr", 0);
}

#[test]
fn gcm_handoff() {
    handoff_resumes_stream("aes128-gcm@skiff.dev", 16);
}

#[test]
fn arcfour_handoff_needs_engine_state() {
    let payload = vec![0x5au8; 64];
    let (mut enc, mut dec) = pair("arcfour256");

    let mut w1 = vec![0u8; 64];
    let mut w2 = vec![0u8; 64];
    enc.crypt(0, &mut w1, &payload, 64, 0, 0).unwrap();
    enc.crypt(1, &mut w2, &payload, 64, 0, 0).unwrap();

    let mut out = vec![0u8; 64];
    dec.crypt(0, &mut out, &w1, 64, 0, 0).unwrap();
    assert_eq!(out, payload);

    // The IV path exports nothing for a stream cipher.
    assert_eq!(dec.iv_export_len(), 0);
    let blob = dec.export_engine_state();
    assert_eq!(blob.len(), dec.engine_state_len());

    let mut resumed = fresh_decrypt("arcfour256");
    resumed.import_engine_state(&blob).unwrap();
    let mut out2 = vec![0u8; 64];
    resumed.crypt(1, &mut out2, &w2, 64, 0, 0).unwrap();
    assert_eq!(out2, payload);
}

#[test]
fn arcfour_without_state_import_cannot_resume() {
    let payload = vec![0x5au8; 64];
    let (mut enc, _) = pair("arcfour256");

    let mut w1 = vec![0u8; 64];
    let mut w2 = vec![0u8; 64];
    enc.crypt(0, &mut w1, &payload, 64, 0, 0).unwrap();
    enc.crypt(1, &mut w2, &payload, 64, 0, 0).unwrap();

    let mut fresh = fresh_decrypt("arcfour256");
    let mut out = vec![0u8; 64];
    fresh.crypt(1, &mut out, &w2, 64, 0, 0).unwrap();
    assert_ne!(out, payload);
}

#[test]
fn chachapoly_exports_nothing_and_needs_nothing() {
    let cipher = registry::by_name("chacha20-poly1305@skiff.dev").unwrap();
    let key = [0x42u8; 64];
    let mut enc = CipherCtx::new(cipher, &key, None, Direction::Encrypt).unwrap();

    let mut src = [0u8; 4 + 16];
    src[..4].copy_from_slice(&16u32.to_be_bytes());
    let mut w1 = [0u8; 36];
    let mut w2 = [0u8; 36];
    enc.crypt(0, &mut w1, &src, 16, 4, 16).unwrap();
    enc.crypt(1, &mut w2, &src, 16, 4, 16).unwrap();

    // A brand-new context can open packet 1 directly: everything derives
    // from the sequence number.
    let mut dec = CipherCtx::new(cipher, &key, None, Direction::Decrypt).unwrap();
    assert_eq!(dec.iv_export_len(), 0);
    dec.export_iv(&mut []).unwrap();
    let mut out = [0u8; 36];
    dec.crypt(1, &mut out, &w2, 16, 4, 16).unwrap();
    assert_eq!(&out[4..20], &src[4..20]);
}

#[test]
fn iv_import_size_mismatch_is_invalid_argument() {
    let (_, mut dec) = pair("aes128-ctr");
    assert_eq!(
        dec.import_iv(&[0u8; 8]),
        Err(CipherError::InvalidArgument)
    );

    let (_, mut dec) = pair("aes128-gcm@skiff.dev");
    assert_eq!(
        dec.import_iv(&[0u8; 16]),
        Err(CipherError::InvalidArgument)
    );
}

#[test]
fn engine_state_size_mismatch_is_invalid_argument() {
    let (_, mut dec) = pair("arcfour");
    assert_eq!(
        dec.import_engine_state(&[0u8; 100]),
        Err(CipherError::InvalidArgument)
    );
}
