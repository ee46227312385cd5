//! Multi-precision number theory.
//!
//! Integers are [`num_bigint::BigInt`] and [`num_bigint::BigUint`]. The
//! routines that must not leak their operands through timing work on
//! fixed-length word vectors, see [`bigint`] and [`ct`].

pub mod bigint;
pub mod ct;
pub mod monty;
pub mod numthry;
pub mod pow_mod;
pub mod primality;
pub mod primes;
pub mod reducer;
pub mod work_factor;

pub use self::{
    bigint::{low_zero_bits, random_bits, random_integer},
    monty::{monty_inverse, MontgomeryParams},
    numthry::{
        ct_inverse_mod_odd_modulus, gcd, inverse_euclid, inverse_mod, is_perfect_square, jacobi,
        lcm, power_mod, ressol,
    },
    pow_mod::PowerMod,
    primality::{
        is_bailie_psw_probable_prime, is_lucas_probable_prime, is_miller_rabin_probable_prime,
        is_prime, miller_rabin_test_iterations, random_prime, random_safe_prime,
    },
    reducer::ModularReducer,
    work_factor::{dl_exponent_size, dl_work_factor, ecp_work_factor, if_work_factor},
};
