//! EMSA-PSS over a caller-supplied message hash, [RFC8017 § 9.1].
//!
//! [RFC8017 § 9.1]: https://datatracker.ietf.org/doc/html/rfc8017#section-9.1

use alloc::vec::Vec;
use digest::DynDigest;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use super::mgf::mgf1_xor;
use crate::errors::{Error, Result};

/// `H' = Hash(00 00 00 00 00 00 00 00 ‖ mHash ‖ salt)`
fn salted_digest(hash: &mut dyn DynDigest, m_hash: &[u8], salt: &[u8]) -> Vec<u8> {
    hash.update(&[0u8; 8]);
    hash.update(m_hash);
    hash.update(salt);
    hash.finalize_reset().into_vec()
}

/// Keeps the low `em_bits - 8·(em_len - 1)` bits of the leading byte.
fn leading_byte_mask(em_len: usize, em_bits: usize) -> u8 {
    0xFF >> (8 * em_len - em_bits)
}

/// Encodes `m_hash` into an `em_bits`-bit block
/// `maskedDB ‖ H ‖ 0xBC`.
pub(crate) fn emsa_pss_encode(
    m_hash: &[u8],
    em_bits: usize,
    salt: &[u8],
    hash: &mut dyn DynDigest,
) -> Result<Vec<u8>> {
    let h_len = hash.output_size();
    let em_len = em_bits.div_ceil(8);

    if m_hash.len() != h_len {
        return Err(Error::InputNotHashed);
    }
    if em_len < h_len + salt.len() + 2 {
        return Err(Error::invalid_argument("EMSA4: output length too small"));
    }

    let h = salted_digest(hash, m_hash, salt);

    // DB = PS ‖ 0x01 ‖ salt
    let db_len = em_len - h_len - 1;
    let mut em = Vec::with_capacity(em_len);
    em.resize(db_len - salt.len() - 1, 0);
    em.push(0x01);
    em.extend_from_slice(salt);

    mgf1_xor(&mut em, hash, &h)?;
    em[0] &= leading_byte_mask(em_len, em_bits);

    em.extend_from_slice(&h);
    em.push(0xBC);
    Ok(em)
}

/// Finds where the salt starts in an unmasked `DB = 00 … 00 ‖ 01 ‖ salt`.
///
/// Every byte is visited whatever its value. On failure the returned
/// offset is `db.len()`, an empty salt.
fn locate_salt(db: &[u8], s_len: Option<usize>) -> (usize, Choice) {
    let mut salt_start = 0u32;
    let mut seen_separator = Choice::from(0u8);
    let mut valid = Choice::from(1u8);

    for (i, byte) in db.iter().enumerate() {
        let is_separator = byte.ct_eq(&0x01);
        salt_start.conditional_assign(&(i as u32 + 1), is_separator & !seen_separator);
        valid &= seen_separator | is_separator | byte.ct_eq(&0x00);
        seen_separator |= is_separator;
    }
    valid &= seen_separator;

    if let Some(s_len) = s_len {
        valid &= (salt_start as usize).ct_eq(&(db.len() - s_len));
    }

    let salt_start = u32::conditional_select(&(db.len() as u32), &salt_start, valid);
    (salt_start as usize, valid)
}

/// Checks an `em_bits`-bit encoding of `m_hash`. `em` must be exactly
/// `ceil(em_bits / 8)` bytes and is unmasked in place. With
/// `s_len == None` any salt length is accepted.
pub(crate) fn emsa_pss_verify(
    m_hash: &[u8],
    em: &mut [u8],
    em_bits: usize,
    s_len: Option<usize>,
    hash: &mut dyn DynDigest,
) -> Result<()> {
    let h_len = hash.output_size();
    let em_len = em_bits.div_ceil(8);

    if em.len() != em_len
        || m_hash.len() != h_len
        || em_len < h_len + s_len.unwrap_or(0) + 2
    {
        return Err(Error::Verification);
    }

    let top = leading_byte_mask(em_len, em_bits);
    if em[em_len - 1] != 0xBC || em[0] & !top != 0 {
        return Err(Error::Verification);
    }

    let (db, trailer) = em.split_at_mut(em_len - h_len - 1);
    let h = &trailer[..h_len];

    mgf1_xor(db, hash, h)?;
    db[0] &= top;

    let (salt_start, valid) = locate_salt(db, s_len);
    let h_prime = salted_digest(hash, m_hash, &db[salt_start..]);

    if (valid & h_prime.as_slice().ct_eq(h)).into() {
        Ok(())
    } else {
        Err(Error::Verification)
    }
}
