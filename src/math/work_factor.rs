//! Security level estimates for the key families.

use num_traits::Float;

const LOG2_E: f64 = 1.442_695_04;

/// Estimated bits of security of factoring-based keys of `bits` bits,
/// following the number field sieve estimate of RFC 3766.
pub fn if_work_factor(bits: usize) -> usize {
    if bits < 512 {
        return 0;
    }

    // log2(0.02)
    let log2_k = -5.6438;
    let log_p = bits as f64 / LOG2_E;
    let log_log_p = Float::ln(log_p);
    let est = 1.92 * Float::powf(log_p * log_log_p * log_log_p, 1.0 / 3.0);
    (log2_k + LOG2_E * est) as usize
}

/// Estimated bits of security of discrete logarithm groups.
pub fn dl_work_factor(bits: usize) -> usize {
    if_work_factor(bits)
}

/// Estimated bits of security of elliptic curve keys over a `bits`-bit
/// field.
pub fn ecp_work_factor(bits: usize) -> usize {
    bits / 2
}

/// Size of random exponents for a discrete logarithm group without a
/// known subgroup order.
pub fn dl_exponent_size(bits: usize) -> usize {
    match bits {
        0 => 0,
        1..=256 => bits - 1,
        257..=1024 => 192,
        1025..=1536 => 224,
        1537..=2048 => 256,
        2049..=4096 => 384,
        _ => 512,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_factors() {
        assert_eq!(if_work_factor(256), 0);
        assert_eq!(if_work_factor(1024), 80);
        assert_eq!(if_work_factor(2048), 111);
        assert_eq!(if_work_factor(3072), 132);
        assert_eq!(ecp_work_factor(256), 128);
        assert_eq!(dl_exponent_size(2048), 256);
        assert_eq!(dl_exponent_size(160), 159);
    }
}
