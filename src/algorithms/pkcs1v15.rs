//! PKCS#1 v1.5 block formatting, [RFC8017 § 7.2 and § 9.2].
//!
//! Every block is `k` bytes, the byte length of the modulus, and starts
//! with a zero byte followed by the block type.
//!
//! [RFC8017 § 7.2 and § 9.2]: https://datatracker.ietf.org/doc/html/rfc8017#section-7.2

use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Smallest padding string the format allows.
const MIN_PS_LEN: usize = 8;

/// Appends `len` random bytes, none of them zero.
fn push_nonzero_random<R: CryptoRngCore + ?Sized>(rng: &mut R, out: &mut Vec<u8>, len: usize) {
    let start = out.len();
    out.resize(start + len, 0);
    rng.fill_bytes(&mut out[start..]);

    for byte in &mut out[start..] {
        while *byte == 0 {
            let mut fresh = [0u8; 1];
            rng.fill_bytes(&mut fresh);
            *byte = fresh[0];
        }
    }
}

/// `00 ‖ 02 ‖ PS ‖ 00 ‖ msg` with a random non-zero `PS`.
pub(crate) fn encrypt_pad<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    msg: &[u8],
    k: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if msg.len() + MIN_PS_LEN + 3 > k {
        return Err(Error::MessageTooLong);
    }

    let mut em = Zeroizing::new(Vec::with_capacity(k));
    em.extend_from_slice(&[0x00, 0x02]);
    push_nonzero_random(rng, &mut em, k - msg.len() - 3);
    em.push(0x00);
    em.extend_from_slice(msg);
    Ok(em)
}

/// Strips encryption padding.
///
/// The whole block is scanned whatever its content and every malformed
/// block yields the same [`Error::Decryption`].
pub(crate) fn encrypt_unpad(em: &[u8], k: usize) -> Result<Zeroizing<Vec<u8>>> {
    if k < MIN_PS_LEN + 3 || em.len() != k {
        return Err(Error::Decryption);
    }

    let mut separator = 0u32;
    let mut found = Choice::from(0u8);
    for (i, byte) in em.iter().enumerate().skip(2) {
        let is_zero = byte.ct_eq(&0);
        separator.conditional_assign(&(i as u32), is_zero & !found);
        found |= is_zero;
    }

    let valid = em[0].ct_eq(&0x00)
        & em[1].ct_eq(&0x02)
        & found
        & separator.ct_gt(&(MIN_PS_LEN as u32 + 1));

    if !bool::from(valid) {
        return Err(Error::Decryption);
    }
    Ok(Zeroizing::new(em[separator as usize + 1..].to_vec()))
}

/// `00 ‖ 01 ‖ FF … FF ‖ 00 ‖ prefix ‖ hashed`.
pub(crate) fn sign_pad(prefix: &[u8], hashed: &[u8], k: usize) -> Result<Vec<u8>> {
    let t_len = prefix.len() + hashed.len();
    if t_len + MIN_PS_LEN + 3 > k {
        return Err(Error::MessageTooLong);
    }

    let mut em = Vec::with_capacity(k);
    em.extend_from_slice(&[0x00, 0x01]);
    em.resize(k - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(prefix);
    em.extend_from_slice(hashed);
    Ok(em)
}

/// Checks `em` against the signature block for `prefix ‖ hashed` by
/// re-encoding it.
pub(crate) fn sign_unpad(prefix: &[u8], hashed: &[u8], em: &[u8], k: usize) -> Result<()> {
    if em.len() != k {
        return Err(Error::Verification);
    }
    let expected = sign_pad(prefix, hashed, k).map_err(|_| Error::Verification)?;

    if bool::from(expected.ct_eq(em)) {
        Ok(())
    } else {
        Err(Error::Verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_padding_is_nonzero() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let mut out = vec![0xaa];
        push_nonzero_random(&mut rng, &mut out, 4096);
        assert_eq!(out.len(), 4097);
        assert!(out.iter().all(|b| *b != 0));
    }

    #[test]
    fn test_encrypt_pad_unpad() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let k = 64;
        for len in [0, 1, 20, k - 11] {
            let msg = vec![0x5a; len];
            let em = encrypt_pad(&mut rng, &msg, k).unwrap();
            assert_eq!(em.len(), k);
            assert_eq!(&em[..2], &[0, 2]);
            assert_eq!(&encrypt_unpad(&em, k).unwrap()[..], &msg[..]);
        }
        assert_eq!(encrypt_pad(&mut rng, &[0; 54], k).unwrap_err(), Error::MessageTooLong);
        assert_eq!(encrypt_pad(&mut rng, &[1; 4], 8).unwrap_err(), Error::MessageTooLong);
    }

    #[test]
    fn test_encrypt_unpad_rejects() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let k = 64;
        let em = encrypt_pad(&mut rng, b"hello", k).unwrap();

        let mut cases = Vec::new();
        for (pos, value) in [(0, 1), (1, 1), (1, 0)] {
            let mut bad = em.to_vec();
            bad[pos] = value;
            cases.push(bad);
        }
        // separator inside the minimum padding
        let mut bad = em.to_vec();
        bad[5] = 0;
        cases.push(bad);
        // no separator
        let mut bad = em.to_vec();
        bad[2..].fill(0x11);
        cases.push(bad);

        for bad in cases {
            assert_eq!(encrypt_unpad(&bad, k).unwrap_err(), Error::Decryption);
        }
        assert_eq!(encrypt_unpad(&em[1..], k).unwrap_err(), Error::Decryption);
    }

    #[test]
    fn test_separator_at_minimum_offset() {
        // 00 02, eight bytes of PS, 00, one byte of message
        let em = hex!("0002 0101010101010101 00 42");
        assert_eq!(&encrypt_unpad(&em, 12).unwrap()[..], &[0x42]);

        let em = hex!("0002 01010101010101 00 4242");
        assert_eq!(encrypt_unpad(&em, 12).unwrap_err(), Error::Decryption);
    }

    #[test]
    fn test_sign_pad_unpad() {
        let prefix = [0x30, 0x01];
        let hashed = [7u8; 20];
        let em = sign_pad(&prefix, &hashed, 40).unwrap();
        assert_eq!(&em[..3], &[0x00, 0x01, 0xff]);
        assert_eq!(em[40 - 23], 0x00);
        assert!(sign_unpad(&prefix, &hashed, &em, 40).is_ok());

        let mut bad = em.clone();
        bad[3] = 0xfe;
        assert_eq!(sign_unpad(&prefix, &hashed, &bad, 40), Err(Error::Verification));
        assert_eq!(sign_unpad(&prefix, &[8u8; 20], &em, 40), Err(Error::Verification));
        assert_eq!(sign_unpad(&prefix, &hashed, &em[1..], 39), Err(Error::Verification));
        assert_eq!(sign_pad(&prefix, &hashed, 32), Err(Error::MessageTooLong));
    }
}
