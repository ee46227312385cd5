//! Property-based tests.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use pkcore::{
    ec::EcGroup,
    ecdsa::EcdsaPrivateKey,
    math::{
        bigint::to_signed, ct_inverse_mod_odd_modulus, gcd, inverse_euclid, inverse_mod,
        power_mod,
    },
    PkSigner, PkVerifier, PrivateKey,
};
use proptest::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

prop_compose! {
    fn biguint(max_bytes: usize)(bytes in prop::collection::vec(any::<u8>(), 1..max_bytes)) -> BigUint {
        BigUint::from_bytes_be(&bytes)
    }
}

prop_compose! {
    fn odd_modulus()(m in biguint(48)) -> BigUint {
        (m << 1usize) + 3u32
    }
}

proptest! {
    #[test]
    fn gcd_divides_both(a in biguint(40), b in biguint(40)) {
        let (a, b) = (to_signed(a), to_signed(b));
        let g = gcd(&a, &b);
        if a.is_zero() || b.is_zero() {
            prop_assert!(g.is_zero());
        } else {
            prop_assert!((&a % &g).is_zero());
            prop_assert!((&b % &g).is_zero());
            prop_assert_eq!(g, a.gcd(&b));
        }
    }

    #[test]
    fn inverse_algorithms_agree(n in biguint(48), m in odd_modulus()) {
        let n = n % &m;
        let ct = ct_inverse_mod_odd_modulus(&n, &m).unwrap();
        let euclid = inverse_euclid(&n, &m).unwrap();
        let generic = inverse_mod(&to_signed(n.clone()), &to_signed(m.clone())).unwrap();
        prop_assert_eq!(&ct, &euclid);
        prop_assert_eq!(to_signed(ct.clone()), generic);

        if n.gcd(&m).is_one() {
            prop_assert!(((&n * &ct) % &m).is_one());
        } else {
            prop_assert!(ct.is_zero());
        }
    }

    #[test]
    fn inverse_with_even_modulus(n in biguint(32), m in biguint(32)) {
        let m = (m << 1usize) + 2u32;
        let inv = inverse_euclid(&n, &m).unwrap();
        if n.gcd(&m).is_one() {
            prop_assert!(((&n * &inv) % &m).is_one());
        } else {
            prop_assert!(inv.is_zero());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn power_mod_matches_modpow(b in biguint(32), e in biguint(8), m in odd_modulus()) {
        let e = e + 1u32;
        prop_assert_eq!(power_mod(&to_signed(b.clone()), &e, &m), b.modpow(&e, &m));
    }

    #[test]
    fn ecdsa_sign_roundtrip(seed in any::<[u8; 32]>(), msg in any::<Vec<u8>>()) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let sig = PkSigner::new(&key, "EMSA1(SHA-256)").unwrap().sign_message(&msg, &mut rng).unwrap();

        let public = key.public_key();
        let mut verifier = PkVerifier::new(&*public, "EMSA1(SHA-256)").unwrap();
        prop_assert!(verifier.verify_message(&msg, &sig).unwrap());
    }

    #[test]
    fn ecdsa_der_bit_flip_is_rejected(
        seed in any::<[u8; 32]>(),
        pos in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
        let mut sig = PkSigner::new(&key, "EMSA1(SHA-256)").unwrap().sign_message(b"msg", &mut rng).unwrap();

        let idx = pos.index(sig.len());
        sig[idx] ^= 1 << bit;

        let public = key.public_key();
        let mut verifier = PkVerifier::new(&*public, "EMSA1(SHA-256)").unwrap();
        prop_assert!(matches!(verifier.verify_message(b"msg", &sig), Ok(false)));
    }
}
