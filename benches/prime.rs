#![feature(test)]

extern crate test;

use num_bigint::BigUint;
use pkcore::math::{
    is_bailie_psw_probable_prime, is_lucas_probable_prime, is_miller_rabin_probable_prime,
    is_prime,
};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use test::Bencher;

const NUM: &str = "203956878356401977405765866929034577280193993314348263094772646453283062722701277632936616063144088173312372882677123879538709400158306567338328279154499698366071906766440037074217117805690872792848149112022286332144876183376326512083574821647933992961249917319836219304274280243803104015000563790123";

fn num() -> BigUint {
    test::black_box(BigUint::parse_bytes(NUM.as_bytes(), 10).unwrap())
}

macro_rules! bench_is_prime {
    ($name:ident, $prob:expr) => {
        #[bench]
        fn $name(b: &mut Bencher) {
            let x = num();
            let mut rng = ChaCha8Rng::from_seed([42; 32]);

            b.iter(|| {
                let res = is_prime(&x, Some(&mut rng), $prob, false);
                test::black_box(res);
            });
        }
    };
}

bench_is_prime!(is_prime_64, 64);
bench_is_prime!(is_prime_128, 128);

#[bench]
fn bench_prime_lucas(b: &mut Bencher) {
    let x = num();

    b.iter(|| {
        let res = is_lucas_probable_prime(&x);
        test::black_box(res);
    });
}

#[bench]
fn bench_prime_bailie_psw(b: &mut Bencher) {
    let x = num();

    b.iter(|| {
        let res = is_bailie_psw_probable_prime(&x);
        test::black_box(res);
    });
}

#[bench]
fn bench_prime_miller_rabin(b: &mut Bencher) {
    let x = num();
    let mut rng = ChaCha8Rng::from_seed([42; 32]);

    b.iter(|| {
        let res = is_miller_rabin_probable_prime(&x, &mut rng, 1);
        test::black_box(res);
    });
}
