//! Discrete logarithm groups: a prime `p`, a prime `q` dividing `p - 1` and
//! a generator `g` of the order-`q` subgroup.

use alloc::{format, vec::Vec};

use der::{asn1::Uint, Any, Decode, Encode, Sequence};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{Num, One, Zero};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, ObjectIdentifier};

use crate::errors::{Error, Result};
use crate::math::bigint::{random_bits, random_integer, to_signed};
use crate::math::numthry::{jacobi, power_mod_uint};
use crate::math::primality::{is_prime, is_prime_with, random_prime, random_safe_prime};
use crate::math::primes::PRIMES;
use crate::math::work_factor::{dl_exponent_size, dl_work_factor};
use crate::rng::reborrow;

/// Smallest `p` [`DlGroup::generate`] agrees to build.
pub const MIN_GENERATED_P_BITS: usize = 512;

/// RFC 3526 section 3.
const MODP_IETF_2048_P: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
    3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

const NAMED_GROUPS: &[&str] = &["modp/ietf/2048"];

/// Parameter encodings of a [`DlGroup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DlGroupFormat {
    /// ANSI X9.57 `Dss-Parms ::= SEQUENCE { p, q, g }`, used by DSA.
    AnsiX957,
    /// ANSI X9.42 `DomainParameters ::= SEQUENCE { p, g, q, j OPTIONAL }`,
    /// used by DH and ElGamal.
    AnsiX942,
}

#[derive(Sequence)]
struct DssParms {
    p: Uint,
    q: Uint,
    g: Uint,
}

#[derive(Sequence)]
struct DomainParameters {
    p: Uint,
    g: Uint,
    q: Uint,
    #[asn1(optional = "true")]
    j: Option<Uint>,
}

/// A discrete logarithm group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DlGroup {
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

impl DlGroup {
    /// Creates a group from its parameters.
    ///
    /// `p` must be an odd number above 3, `q` must lie in `[2, p)` and `g`
    /// in `(1, p)`. Primality is only checked by
    /// [`DlGroup::verify_group`].
    pub fn new(p: BigUint, q: BigUint, g: BigUint) -> Result<Self> {
        if p <= BigUint::from(3u32) || p.is_even() {
            return Err(Error::invalid_argument("DL_Group: invalid prime p"));
        }
        if q < BigUint::from(2u32) || q >= p {
            return Err(Error::invalid_argument("DL_Group: invalid subgroup order q"));
        }
        if g <= BigUint::one() || g >= p {
            return Err(Error::invalid_argument("DL_Group: invalid generator g"));
        }
        Ok(DlGroup { p, q, g })
    }

    /// A standard group by name, e.g. `modp/ietf/2048`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "modp/ietf/2048" => {
                let p = BigUint::from_str_radix(MODP_IETF_2048_P, 16)
                    .map_err(|_| Error::internal("DL_Group: bad named group constant"))?;
                let q = (&p - BigUint::one()) >> 1;
                DlGroup::new(p, q, BigUint::from(2u32))
            }
            _ => Err(Error::invalid_argument(format!(
                "DL_Group: unknown group '{}'",
                name
            ))),
        }
    }

    /// Names accepted by [`DlGroup::from_name`].
    pub fn known_names() -> impl Iterator<Item = &'static str> {
        NAMED_GROUPS.iter().copied()
    }

    /// Generates a group with a `pbits`-bit `p` and a `qbits`-bit prime
    /// order subgroup, suitable for DSA. A `qbits` of zero picks the
    /// exponent size recommended for `pbits`.
    pub fn generate<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        pbits: usize,
        qbits: usize,
    ) -> Result<Self> {
        if pbits < MIN_GENERATED_P_BITS {
            return Err(Error::invalid_argument(format!(
                "DL_Group: prime size {} is too small",
                pbits
            )));
        }
        let qbits = if qbits == 0 { dl_exponent_size(pbits) } else { qbits };
        if qbits >= pbits {
            return Err(Error::invalid_argument("DL_Group: subgroup larger than the group"));
        }

        let q = random_prime(rng, qbits, &BigUint::zero(), 1, 2, 128)?;
        let two_q = &q << 1;

        let mut attempts = 0usize;
        let p = loop {
            // p ≡ 1 (mod 2q)
            let x = random_bits(rng, pbits, true);
            let p = &x - (&x % &two_q) + BigUint::one();
            if p.bits() == pbits && is_prime_with(&p, Some(&mut *rng), 128, true) {
                break p;
            }
            attempts += 1;
            log::trace!("DL_Group: prime p candidate {} rejected", attempts);
        };

        let g = make_dsa_generator(&p, &q)?;
        DlGroup::new(p, q, g)
    }

    /// Generates a group over a `pbits`-bit safe prime `p = 2q + 1` with a
    /// generator of the order-`q` subgroup.
    pub fn generate_strong<R: CryptoRngCore + ?Sized>(rng: &mut R, pbits: usize) -> Result<Self> {
        let p = random_safe_prime(rng, pbits)?;
        let q = (&p - BigUint::one()) >> 1;

        // a quadratic residue generates the subgroup of order q
        let g = PRIMES
            .iter()
            .map(|&g| BigUint::from(g))
            .find(|g| matches!(jacobi(&to_signed(g.clone()), &p), Ok(1)))
            .ok_or_else(|| Error::internal("DL_Group: no quadratic residue in prime table"))?;

        DlGroup::new(p, q, g)
    }

    /// The prime modulus.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// The order of the subgroup generated by `g`.
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// The generator.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Bit length of `p`.
    pub fn p_bits(&self) -> usize {
        self.p.bits()
    }

    /// Byte length of `p`.
    pub fn p_bytes(&self) -> usize {
        (self.p_bits() + 7) / 8
    }

    /// Bit length of `q`.
    pub fn q_bits(&self) -> usize {
        self.q.bits()
    }

    /// Byte length of `q`.
    pub fn q_bytes(&self) -> usize {
        (self.q_bits() + 7) / 8
    }

    /// Size of random exponents for this group.
    pub fn exponent_bits(&self) -> usize {
        dl_exponent_size(self.p_bits()).min(self.q_bits())
    }

    /// A random exponent of [`DlGroup::exponent_bits`] bits. When the
    /// subgroup is no larger than that, uniform in `[2, q)`.
    pub fn random_exponent<R: CryptoRngCore + ?Sized>(&self, rng: &mut R) -> Result<BigUint> {
        let bits = self.exponent_bits();
        if bits < self.q_bits() {
            Ok(random_bits(rng, bits, true))
        } else {
            random_integer(rng, &BigUint::from(2u32), &self.q)
        }
    }

    /// Estimated security level in bits.
    pub fn estimated_strength(&self) -> usize {
        dl_work_factor(self.p_bits())
    }

    /// `g^x mod p`.
    pub fn power_g_p(&self, x: &BigUint) -> BigUint {
        power_mod_uint(&self.g, x, &self.p)
    }

    /// `b^x mod p`.
    pub fn power_b_p(&self, b: &BigUint, x: &BigUint) -> BigUint {
        power_mod_uint(b, x, &self.p)
    }

    /// Checks that `p` and `q` are prime, `q` divides `p - 1` and `g`
    /// has order `q`. `strong` raises the primality test confidence.
    pub fn verify_group(&self, mut rng: Option<&mut dyn CryptoRngCore>, strong: bool) -> bool {
        if self.g < BigUint::from(2u32) || self.p < BigUint::from(3u32) {
            return false;
        }
        if !((&self.p - BigUint::one()) % &self.q).is_zero() {
            return false;
        }
        if !self.power_g_p(&self.q).is_one() {
            return false;
        }

        let prob = if strong { 128 } else { 10 };
        is_prime(&self.q, reborrow(&mut rng), prob, false)
            && is_prime(&self.p, reborrow(&mut rng), prob, false)
    }

    /// Checks that `1 < y < p` and `y^q ≡ 1 (mod p)`.
    pub fn verify_public_element(&self, y: &BigUint) -> bool {
        if y <= &BigUint::one() || y >= &self.p {
            return false;
        }
        self.power_b_p(y, &self.q).is_one()
    }

    /// Checks that `1 < x < p` and `x <= q`.
    pub fn verify_private_element(&self, x: &BigUint) -> bool {
        x > &BigUint::one() && x < &self.p && x <= &self.q
    }

    /// DER encoding of the parameters.
    pub fn to_der(&self, format: DlGroupFormat) -> Result<Vec<u8>> {
        match format {
            DlGroupFormat::AnsiX957 => Ok(DssParms {
                p: uint(&self.p)?,
                q: uint(&self.q)?,
                g: uint(&self.g)?,
            }
            .to_der()?),
            DlGroupFormat::AnsiX942 => Ok(DomainParameters {
                p: uint(&self.p)?,
                g: uint(&self.g)?,
                q: uint(&self.q)?,
                j: None,
            }
            .to_der()?),
        }
    }

    /// Decodes DER parameters.
    pub fn from_der(bytes: &[u8], format: DlGroupFormat) -> Result<Self> {
        let (p, q, g) = match format {
            DlGroupFormat::AnsiX957 => {
                let params = DssParms::from_der(bytes)?;
                (params.p, params.q, params.g)
            }
            DlGroupFormat::AnsiX942 => {
                let params = DomainParameters::from_der(bytes)?;
                (params.p, params.q, params.g)
            }
        };
        DlGroup::new(from_uint(&p), from_uint(&q), from_uint(&g))
            .map_err(|err| Error::decoding(alloc::string::ToString::to_string(&err)))
    }

    /// An `AlgorithmIdentifier` carrying these parameters.
    pub fn algorithm_identifier(
        &self,
        oid: ObjectIdentifier,
        format: DlGroupFormat,
    ) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid,
            parameters: Some(Any::from_der(&self.to_der(format)?)?),
        })
    }

    /// Decodes the parameters of an `AlgorithmIdentifier`.
    pub fn from_algorithm_identifier(
        alg_id: &AlgorithmIdentifierOwned,
        format: DlGroupFormat,
    ) -> Result<Self> {
        match &alg_id.parameters {
            Some(params) => DlGroup::from_der(&params.to_der()?, format),
            None => Err(Error::decoding("DL_Group: missing group parameters")),
        }
    }
}

/// `PRIMES[i]^((p - 1) / q) mod p` for the first `i` giving a value
/// above one.
fn make_dsa_generator(p: &BigUint, q: &BigUint) -> Result<BigUint> {
    let (e, r) = (p - BigUint::one()).div_rem(q);
    if e.is_zero() || !r.is_zero() {
        return Err(Error::invalid_argument(
            "make_dsa_generator: q does not divide p - 1",
        ));
    }

    PRIMES
        .iter()
        .map(|&base| power_mod_uint(&BigUint::from(base), &e, p))
        .find(|g| g > &BigUint::one())
        .ok_or_else(|| Error::internal("DL_Group: couldn't create a suitable generator"))
}

fn uint(x: &BigUint) -> Result<Uint> {
    Ok(Uint::new(&x.to_bytes_be())?)
}

fn from_uint(x: &Uint) -> BigUint {
    BigUint::from_bytes_be(x.as_bytes())
}

/// DER `INTEGER` encoding, used for DL public and private values.
pub(crate) fn encode_integer(x: &BigUint) -> Result<Vec<u8>> {
    Ok(uint(x)?.to_der()?)
}

/// Decodes a non-negative DER `INTEGER`.
pub(crate) fn decode_integer(bytes: &[u8]) -> Result<BigUint> {
    Ok(from_uint(&Uint::from_der(bytes)?))
}

/// Decodes the group of a DL key's `AlgorithmIdentifier` and the integer
/// in its key bits.
pub(crate) fn load_dl_key(
    alg_id: &AlgorithmIdentifierOwned,
    key_bits: &[u8],
    format: DlGroupFormat,
) -> Result<(DlGroup, BigUint)> {
    let group = DlGroup::from_algorithm_identifier(alg_id, format)?;
    let value = decode_integer(key_bits)?;
    Ok((group, value))
}

/// The group is sound and `y` is an element of the subgroup.
pub(crate) fn check_dl_public(
    group: &DlGroup,
    y: &BigUint,
    rng: Option<&mut dyn CryptoRngCore>,
    strong: bool,
) -> bool {
    group.verify_group(rng, strong) && group.verify_public_element(y)
}

/// [`check_dl_public`] plus `y == g^x` for an acceptable `x`.
pub(crate) fn check_dl_private(
    group: &DlGroup,
    y: &BigUint,
    x: &BigUint,
    rng: Option<&mut dyn CryptoRngCore>,
    strong: bool,
) -> bool {
    check_dl_public(group, y, rng, strong)
        && group.verify_private_element(x)
        && &group.power_g_p(x) == y
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_named_group() {
        let group = DlGroup::from_name("modp/ietf/2048").unwrap();
        assert_eq!(group.p_bits(), 2048);
        assert_eq!(group.q_bits(), 2047);
        assert_eq!(group.g(), &BigUint::from(2u32));
        assert_eq!(group.exponent_bits(), 256);
        assert_eq!(group.estimated_strength(), 111);
        assert!(group.verify_group(None, false));

        assert!(DlGroup::known_names().all(|n| DlGroup::from_name(n).is_ok()));
        assert!(matches!(
            DlGroup::from_name("modp/ietf/1"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_new_validation() {
        let p = BigUint::from(23u32);
        assert!(DlGroup::new(p.clone(), BigUint::from(11u32), BigUint::from(4u32)).is_ok());
        assert!(DlGroup::new(BigUint::from(22u32), BigUint::from(11u32), BigUint::from(4u32)).is_err());
        assert!(DlGroup::new(p.clone(), BigUint::from(11u32), BigUint::one()).is_err());
        assert!(DlGroup::new(p.clone(), BigUint::from(23u32), BigUint::from(4u32)).is_err());
        assert!(DlGroup::new(p, BigUint::from(11u32), BigUint::from(23u32)).is_err());
    }

    #[test]
    fn test_elements() {
        // 4 = 2² generates the order-11 subgroup of Z_23*
        let group =
            DlGroup::new(BigUint::from(23u32), BigUint::from(11u32), BigUint::from(4u32)).unwrap();
        assert!(group.verify_group(None, true));
        assert!(group.verify_public_element(&BigUint::from(3u32)));
        // 5 is a non-residue mod 23
        assert!(!group.verify_public_element(&BigUint::from(5u32)));
        assert!(!group.verify_public_element(&BigUint::one()));
        assert!(!group.verify_public_element(&BigUint::from(23u32)));

        assert!(group.verify_private_element(&BigUint::from(11u32)));
        assert!(!group.verify_private_element(&BigUint::from(12u32)));
        assert!(!group.verify_private_element(&BigUint::one()));

        // 5 has order 22
        let bad =
            DlGroup::new(BigUint::from(23u32), BigUint::from(11u32), BigUint::from(5u32)).unwrap();
        assert!(!bad.verify_group(None, false));
    }

    #[test]
    fn test_encodings() {
        let group =
            DlGroup::new(BigUint::from(23u32), BigUint::from(11u32), BigUint::from(4u32)).unwrap();

        let dsa = group.to_der(DlGroupFormat::AnsiX957).unwrap();
        assert_eq!(dsa, hex!("300902011702010b020104"));
        let dh = group.to_der(DlGroupFormat::AnsiX942).unwrap();
        assert_eq!(dh, hex!("300902011702010402010b"));

        assert_eq!(DlGroup::from_der(&dsa, DlGroupFormat::AnsiX957).unwrap(), group);
        assert_eq!(DlGroup::from_der(&dh, DlGroupFormat::AnsiX942).unwrap(), group);

        // the element order differs between the two formats
        assert_ne!(DlGroup::from_der(&dsa, DlGroupFormat::AnsiX942).unwrap(), group);

        let oid = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
        let alg_id = group.algorithm_identifier(oid, DlGroupFormat::AnsiX957).unwrap();
        assert_eq!(
            DlGroup::from_algorithm_identifier(&alg_id, DlGroupFormat::AnsiX957).unwrap(),
            group
        );

        let x = BigUint::from(0x80u32);
        let der = encode_integer(&x).unwrap();
        assert_eq!(der, hex!("02020080"));
        assert_eq!(decode_integer(&der).unwrap(), x);
        assert!(decode_integer(&hex!("0201ff")).is_err());
    }

    #[test]
    fn test_generate() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let group = DlGroup::generate(&mut rng, 512, 160).unwrap();
        assert_eq!(group.p_bits(), 512);
        assert_eq!(group.q_bits(), 160);
        assert!(group.verify_group(Some(&mut rng), true));

        assert!(DlGroup::generate(&mut rng, 256, 160).is_err());
        assert!(DlGroup::generate(&mut rng, 512, 512).is_err());
    }

    #[test]
    fn test_generate_strong() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let group = DlGroup::generate_strong(&mut rng, 128).unwrap();
        assert_eq!(group.p_bits(), 128);
        assert_eq!(group.q_bits(), 127);
        assert!(group.verify_group(Some(&mut rng), true));
    }
}
