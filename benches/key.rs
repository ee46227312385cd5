#![feature(test)]

extern crate test;

use pkcore::{
    ec::EcGroup, ecdh::EcdhPrivateKey, ecdsa::EcdsaPrivateKey, PkDecryptor, PkEncryptor,
    PkKeyAgreement, PkSigner, PkVerifier, PrivateKey, RsaPrivateKey,
};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use test::Bencher;

fn rsa_key() -> RsaPrivateKey {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    RsaPrivateKey::new(&mut rng, 2048).unwrap()
}

#[bench]
fn bench_rsa_2048_oaep_decrypt(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let key = rsa_key();
    let public = key.to_public_key();
    let ct = PkEncryptor::new(&public, "OAEP(SHA-256)")
        .unwrap()
        .encrypt(b"benchmark", &mut rng)
        .unwrap();
    let decryptor = PkDecryptor::new(&key, "OAEP(SHA-256)").unwrap();

    b.iter(|| {
        let res = decryptor.decrypt(&ct, Some(&mut rng)).unwrap();
        test::black_box(res);
    });
}

#[bench]
fn bench_rsa_2048_pkcs1v15_sign(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let key = rsa_key();
    let mut signer = PkSigner::new(&key, "EMSA3(SHA-256)").unwrap();

    b.iter(|| {
        let res = signer.sign_message(b"benchmark", &mut rng).unwrap();
        test::black_box(res);
    });
}

#[bench]
fn bench_ecdsa_p256_sign(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
    let mut signer = PkSigner::new(&key, "EMSA1(SHA-256)").unwrap();

    b.iter(|| {
        let res = signer.sign_message(b"benchmark", &mut rng).unwrap();
        test::black_box(res);
    });
}

#[bench]
fn bench_ecdsa_p256_verify(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let key = EcdsaPrivateKey::new(&mut rng, EcGroup::from_name("secp256r1").unwrap()).unwrap();
    let sig = PkSigner::new(&key, "EMSA1(SHA-256)")
        .unwrap()
        .sign_message(b"benchmark", &mut rng)
        .unwrap();
    let public = key.public();
    let mut verifier = PkVerifier::new(&public, "EMSA1(SHA-256)").unwrap();

    b.iter(|| {
        let res = verifier.verify_message(b"benchmark", &sig).unwrap();
        test::black_box(res);
    });
}

#[bench]
fn bench_ecdh_p256_agree(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let group = EcGroup::from_name("secp256r1").unwrap();
    let alice = EcdhPrivateKey::new(&mut rng, group.clone()).unwrap();
    let bob = EcdhPrivateKey::new(&mut rng, group).unwrap();
    let peer = bob.public_value().unwrap();
    let ka = PkKeyAgreement::new(&alice, "Raw").unwrap();

    b.iter(|| {
        let res = ka.derive_key(0, &peer, b"", Some(&mut rng)).unwrap();
        test::black_box(res);
    });
}
