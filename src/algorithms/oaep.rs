//! OAEP block formatting, [RFC8017 § 7.1].
//!
//! [RFC8017 § 7.1]: https://datatracker.ietf.org/doc/html/rfc8017#section-7.1

use alloc::{boxed::Box, vec::Vec};

use digest::DynDigest;
use rand_core::CryptoRngCore;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroizing;

use super::mgf::mgf1_xor;
use crate::errors::{Error, Result};

// 2^61 - 1 bytes, the SHA-1 input limit
const MAX_LABEL_LEN: u64 = (1 << 61) - 1;

/// Largest message that fits a `k`-byte block with an `h_size`-byte hash.
pub(crate) fn oaep_max_input(k: usize, h_size: usize) -> usize {
    k.saturating_sub(2 * h_size + 2)
}

fn label_hash(digest: &mut dyn DynDigest, label: &[u8]) -> Box<[u8]> {
    digest.update(label);
    digest.finalize_reset()
}

/// `00 ‖ maskedSeed ‖ maskedDB` where `DB = lHash ‖ 00 … 00 ‖ 01 ‖ msg`.
pub(crate) fn oaep_encrypt<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    msg: &[u8],
    digest: &mut dyn DynDigest,
    mgf_digest: &mut dyn DynDigest,
    label: &[u8],
    k: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let h_size = digest.output_size();

    if label.len() as u64 > MAX_LABEL_LEN {
        return Err(Error::LabelTooLong);
    }
    if msg.len() > oaep_max_input(k, h_size) || k < 2 * h_size + 2 {
        return Err(Error::MessageTooLong);
    }

    let db_len = k - h_size - 1;
    let mut db = Zeroizing::new(Vec::with_capacity(db_len));
    db.extend_from_slice(&label_hash(digest, label));
    db.resize(db_len - msg.len() - 1, 0);
    db.push(0x01);
    db.extend_from_slice(msg);

    let mut seed = Zeroizing::new(vec![0u8; h_size]);
    rng.fill_bytes(&mut seed);

    mgf1_xor(&mut db, mgf_digest, &seed)?;
    mgf1_xor(&mut seed, mgf_digest, &db)?;

    let mut em = Zeroizing::new(Vec::with_capacity(k));
    em.push(0x00);
    em.extend_from_slice(&seed);
    em.extend_from_slice(&db);
    Ok(em)
}

/// Strips OAEP padding from a `k`-byte block, unmasking `em` in place.
///
/// Every malformed block yields the same [`Error::Decryption`] and the
/// padding scan covers the whole of `DB`.
pub(crate) fn oaep_decrypt(
    em: &mut [u8],
    digest: &mut dyn DynDigest,
    mgf_digest: &mut dyn DynDigest,
    label: &[u8],
    k: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let h_size = digest.output_size();

    if label.len() as u64 > MAX_LABEL_LEN || em.len() != k || k < 2 * h_size + 2 {
        return Err(Error::Decryption);
    }
    let expected = label_hash(digest, label);

    let (leading, rest) = em.split_at_mut(1);
    let (seed, db) = rest.split_at_mut(h_size);
    mgf1_xor(seed, mgf_digest, db)?;
    mgf1_xor(db, mgf_digest, seed)?;

    let (l_hash, tail) = db.split_at(h_size);

    let mut msg_start = 0u32;
    let mut found = Choice::from(0u8);
    let mut stray_byte = Choice::from(0u8);
    for (i, byte) in tail.iter().enumerate() {
        let is_one = byte.ct_eq(&0x01);
        msg_start.conditional_assign(&(i as u32 + 1), is_one & !found);
        stray_byte |= !found & !is_one & !byte.ct_eq(&0x00);
        found |= is_one;
    }

    let valid = leading[0].ct_eq(&0x00) & l_hash.ct_eq(&expected) & found & !stray_byte;
    if !bool::from(valid) {
        return Err(Error::Decryption);
    }
    Ok(Zeroizing::new(tail[msg_start as usize..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
    use sha1::Sha1;
    use sha2::{Digest, Sha256};

    fn encrypt(
        rng: &mut ChaCha8Rng,
        msg: &[u8],
        label: &[u8],
        k: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        oaep_encrypt(rng, msg, &mut Sha256::new(), &mut Sha1::new(), label, k)
    }

    fn decrypt(em: &[u8], label: &[u8], k: usize) -> Result<Zeroizing<Vec<u8>>> {
        oaep_decrypt(&mut em.to_vec(), &mut Sha256::new(), &mut Sha1::new(), label, k)
    }

    #[test]
    fn test_pad_unpad() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let k = 128;
        let max = oaep_max_input(k, 32);
        assert_eq!(max, 62);

        for len in [0, 1, 16, max] {
            let msg = vec![0xa5; len];
            let em = encrypt(&mut rng, &msg, b"label", k).unwrap();
            assert_eq!(em.len(), k);
            assert_eq!(em[0], 0);
            assert_eq!(&decrypt(&em, b"label", k).unwrap()[..], &msg[..]);
        }

        assert_eq!(
            encrypt(&mut rng, &[0; 63], b"", k).unwrap_err(),
            Error::MessageTooLong
        );
        assert_eq!(encrypt(&mut rng, b"", b"", 65).unwrap_err(), Error::MessageTooLong);
        assert_eq!(oaep_max_input(60, 32), 0);
    }

    #[test]
    fn test_message_of_zeroes() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let msg = [0u8; 10];
        let em = encrypt(&mut rng, &msg, b"", 128).unwrap();
        assert_eq!(&decrypt(&em, b"", 128).unwrap()[..], &msg[..]);
    }

    #[test]
    fn test_wrong_label_or_corruption() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let k = 128;
        let em = encrypt(&mut rng, b"secret", b"", k).unwrap();

        assert_eq!(decrypt(&em, b"x", k).unwrap_err(), Error::Decryption);
        assert_eq!(decrypt(&em[1..], b"", k).unwrap_err(), Error::Decryption);

        let mut bad = em.to_vec();
        bad[0] = 1;
        assert_eq!(decrypt(&bad, b"", k).unwrap_err(), Error::Decryption);

        for pos in [1, 40, k - 1] {
            let mut bad = em.to_vec();
            bad[pos] ^= 1;
            assert!(
                decrypt(&bad, b"", k).map(|m| m.as_slice() != b"secret").unwrap_or(true),
                "{pos}"
            );
        }
    }
}
