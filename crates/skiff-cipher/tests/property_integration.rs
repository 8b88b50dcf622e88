//! Property tests: round-trips hold for arbitrary keys, payloads, and
//! sequence numbers.

use proptest::prelude::*;
use skiff_cipher::context::{CipherCtx, Direction};
use skiff_cipher::registry;

fn contexts(name: &str, key: &[u8], iv: &[u8]) -> (CipherCtx, CipherCtx) {
    let cipher = registry::by_name(name).unwrap();
    let iv = if iv.is_empty() { None } else { Some(iv) };
    let enc = CipherCtx::new(cipher, key, iv, Direction::Encrypt).unwrap();
    let dec = CipherCtx::new(cipher, key, iv, Direction::Decrypt).unwrap();
    (enc, dec)
}

proptest! {
    #[test]
    fn ctr_roundtrips(
        key in proptest::collection::vec(any::<u8>(), 32),
        iv in proptest::collection::vec(any::<u8>(), 16),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let (mut enc, mut dec) = contexts("aes256-ctr", &key, &iv);
        let mut wire = vec![0u8; payload.len()];
        enc.crypt(0, &mut wire, &payload, payload.len(), 0, 0).unwrap();
        let mut plain = vec![0u8; payload.len()];
        dec.crypt(0, &mut plain, &wire, payload.len(), 0, 0).unwrap();
        prop_assert_eq!(plain, payload);
    }

    #[test]
    fn cbc_roundtrips_block_multiples(
        key in proptest::collection::vec(any::<u8>(), 16),
        iv in proptest::collection::vec(any::<u8>(), 16),
        blocks in 0usize..24,
        fill in any::<u8>(),
    ) {
        let payload = vec![fill; blocks * 16];
        let (mut enc, mut dec) = contexts("aes128-cbc", &key, &iv);
        let mut wire = vec![0u8; payload.len()];
        enc.crypt(0, &mut wire, &payload, payload.len(), 0, 0).unwrap();
        let mut plain = vec![0u8; payload.len()];
        dec.crypt(0, &mut plain, &wire, payload.len(), 0, 0).unwrap();
        prop_assert_eq!(plain, payload);
    }

    #[test]
    fn chachapoly_roundtrips(
        key in proptest::collection::vec(any::<u8>(), 64),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
        seqnr in any::<u32>(),
    ) {
        let (mut enc, mut dec) = contexts("chacha20-poly1305@skiff.dev", &key, &[]);
        let mut src = vec![0u8; 4 + payload.len()];
        src[..4].copy_from_slice(&(payload.len() as u32).to_be_bytes());
        src[4..].copy_from_slice(&payload);

        let mut wire = vec![0u8; 4 + payload.len() + 16];
        enc.crypt(seqnr, &mut wire, &src, payload.len(), 4, 16).unwrap();

        prop_assert_eq!(
            dec.packet_length(seqnr, &wire).unwrap() as usize,
            payload.len()
        );
        let mut plain = vec![0u8; wire.len()];
        dec.crypt(seqnr, &mut plain, &wire, payload.len(), 4, 16).unwrap();
        prop_assert_eq!(&plain[4..4 + payload.len()], &payload[..]);
    }

    #[test]
    fn chunked_roundtrips(
        payload in proptest::collection::vec(any::<u8>(), 0..2000),
        seqnr in any::<u32>(),
    ) {
        let cipher = registry::by_name("im-chacha-poly-512").unwrap();
        let key = vec![0x42u8; cipher.key_len()];
        let (mut enc, mut dec) = contexts("im-chacha-poly-512", &key, &[]);

        let wire_len = enc.chunked_wire_len(payload.len()).unwrap();
        let mut wire = vec![0u8; wire_len];
        enc.crypt(seqnr, &mut wire, &payload, payload.len(), 0, 0).unwrap();

        let len = dec.packet_length(seqnr, &wire).unwrap() as usize;
        prop_assert_eq!(len, payload.len());
        let mut plain = vec![0u8; len];
        dec.crypt(seqnr, &mut plain, &wire, len, 0, 0).unwrap();
        prop_assert_eq!(plain, payload);
    }
}
