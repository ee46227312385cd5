//! Diffie-Hellman keys over a DL group.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use num_bigint::BigUint;
use num_traits::One;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::dl_group::{
    check_dl_private, check_dl_public, encode_integer, load_dl_key, DlGroup, DlGroupFormat,
};
use crate::errors::{Error, Result};
use crate::math::bigint::{encode_1363, random_integer};
use crate::math::numthry::inverse_mod_uint;
use crate::oids;
use crate::traits::{KeyAgreementOp, PrivateKey, PublicKey};

/// A Diffie-Hellman public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhPublicKey {
    group: DlGroup,
    y: BigUint,
}

/// A Diffie-Hellman private key.
#[derive(Clone)]
pub struct DhPrivateKey {
    public: DhPublicKey,
    x: BigUint,
}

impl DhPublicKey {
    /// Creates a public key from its group and public value.
    pub fn new(group: DlGroup, y: BigUint) -> Self {
        DhPublicKey { group, y }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, y) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX942)?;
        Ok(DhPublicKey { group, y })
    }

    /// The group.
    pub fn group(&self) -> &DlGroup {
        &self.group
    }

    /// The public value.
    pub fn y(&self) -> &BigUint {
        &self.y
    }

    /// `y` as a fixed-width big-endian string, the value sent to the peer.
    pub fn public_value(&self) -> Result<Vec<u8>> {
        encode_1363(&self.y, self.group.p_bytes())
    }
}

impl DhPrivateKey {
    /// Generates a key in `group`.
    pub fn new<R: CryptoRngCore + ?Sized>(rng: &mut R, group: DlGroup) -> Result<Self> {
        let x = group.random_exponent(rng)?;
        Ok(Self::from_x(group, x))
    }

    /// Creates a key from a known private value.
    pub fn from_x(group: DlGroup, x: BigUint) -> Self {
        let y = group.power_g_p(&x);
        DhPrivateKey {
            public: DhPublicKey { group, y },
            x,
        }
    }

    /// Decodes a key from its `AlgorithmIdentifier` and key bits.
    pub fn from_key_bits(alg_id: &AlgorithmIdentifierOwned, key_bits: &[u8]) -> Result<Self> {
        let (group, x) = load_dl_key(alg_id, key_bits, DlGroupFormat::AnsiX942)?;
        Ok(Self::from_x(group, x))
    }

    /// The public half.
    pub fn public(&self) -> &DhPublicKey {
        &self.public
    }

    /// The private value.
    pub fn x(&self) -> &BigUint {
        &self.x
    }
}

impl fmt::Debug for DhPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DhPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.x == other.x
    }
}

impl Eq for DhPrivateKey {}

impl Drop for DhPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl ZeroizeOnDrop for DhPrivateKey {}

impl PublicKey for DhPublicKey {
    fn algo_name(&self) -> &'static str {
        "DH"
    }

    fn key_length(&self) -> usize {
        self.group.p_bits()
    }

    fn estimated_strength(&self) -> usize {
        self.group.estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.group
            .algorithm_identifier(oids::DH, DlGroupFormat::AnsiX942)
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        encode_integer(&self.y)
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        check_dl_public(&self.group, &self.y, rng, strong)
    }
}

impl PublicKey for DhPrivateKey {
    fn algo_name(&self) -> &'static str {
        self.public.algo_name()
    }

    fn key_length(&self) -> usize {
        self.public.key_length()
    }

    fn estimated_strength(&self) -> usize {
        self.public.estimated_strength()
    }

    fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        self.public.algorithm_identifier()
    }

    fn public_key_bits(&self) -> Result<Vec<u8>> {
        self.public.public_key_bits()
    }

    fn check_key(&self, rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        check_dl_private(&self.public.group, &self.public.y, &self.x, rng, strong)
    }
}

impl PrivateKey for DhPrivateKey {
    fn private_key_bits(&self) -> Result<Zeroizing<Vec<u8>>> {
        encode_integer(&self.x).map(Zeroizing::new)
    }

    fn public_key(&self) -> Box<dyn PublicKey> {
        Box::new(self.public.clone())
    }

    fn public_value(&self) -> Result<Vec<u8>> {
        self.public.public_value()
    }

    fn create_key_agreement_op(&self) -> Result<Box<dyn KeyAgreementOp + '_>> {
        Ok(Box::new(DhKeyAgreementOp { key: self }))
    }
}

struct DhKeyAgreementOp<'a> {
    key: &'a DhPrivateKey,
}

impl KeyAgreementOp for DhKeyAgreementOp<'_> {
    fn agree(
        &self,
        other: &[u8],
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let group = &self.key.public.group;
        let p = group.p();
        let y = BigUint::from_bytes_be(other);

        if y <= BigUint::one() || y >= p - BigUint::one() {
            return Err(Error::invalid_argument("DH agreement: invalid key provided"));
        }

        let secret = match rng {
            Some(rng) => {
                // blind the base with r^x, unblinded by r^-x
                let r = random_integer(rng, &BigUint::from(2u32), &(p - BigUint::one()))?;
                let r_x = Zeroizing::new(group.power_b_p(&r, &self.key.x));
                let r_x_inv = Zeroizing::new(inverse_mod_uint(&r_x, p)?);
                if r_x_inv.bits() == 0 {
                    return Err(Error::internal("DH agreement: blinding factor not invertible"));
                }
                let blinded = (&y * &r) % p;
                let z = Zeroizing::new(group.power_b_p(&blinded, &self.key.x));
                Zeroizing::new((&*z * &*r_x_inv) % p)
            }
            None => {
                log::warn!("DH agreement without an RNG, skipping blinding");
                Zeroizing::new(group.power_b_p(&y, &self.key.x))
            }
        };

        Ok(Zeroizing::new(encode_1363(&secret, group.p_bytes())?))
    }
}
