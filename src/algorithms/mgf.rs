//! MGF1, the mask generation function shared by PSS and OAEP.

use digest::DynDigest;

use crate::errors::{Error, Result};

/// XORs `out` with `MGF1(seed, out.len())` using `digest`.
///
/// Fails if more than 2³² digest blocks would be needed, see
/// RFC 8017 B.2.1.
pub(crate) fn mgf1_xor(out: &mut [u8], digest: &mut dyn DynDigest, seed: &[u8]) -> Result<()> {
    let h_len = digest.output_size();
    if out.len().div_ceil(h_len) as u64 > u64::from(u32::MAX) + 1 {
        return Err(Error::invalid_argument("MGF1: mask too long"));
    }

    for (counter, chunk) in out.chunks_mut(h_len).enumerate() {
        digest.update(seed);
        digest.update(&(counter as u32).to_be_bytes());
        let block = digest.finalize_reset();
        chunk
            .iter_mut()
            .zip(block.iter())
            .for_each(|(o, m)| *o ^= m);
    }
    Ok(())
}
