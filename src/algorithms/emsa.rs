//! Signature encoding methods.
//!
//! An [`Emsa`] accumulates the message, turns it into the representative the
//! raw signature primitive consumes and, for schemes with message recovery,
//! checks a recovered representative against the message.

use alloc::{boxed::Box, format, string::String, vec::Vec};

use digest::DynDigest;
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;

use super::hash::HashFunction;
use super::name::SchemeName;
use super::{pkcs1v15, pss};
use crate::errors::{Error, Result};

/// A signature encoding method.
pub trait Emsa: Send + Sync {
    /// Canonical name, e.g. `EMSA1(SHA-256)`.
    fn name(&self) -> String;

    /// The message hash, if the scheme has one.
    fn hash_function(&self) -> Option<HashFunction>;

    /// Appends message bytes.
    fn update(&mut self, input: &[u8]);

    /// Returns the hash of everything passed to [`Emsa::update`] (or the
    /// message itself for unhashed schemes) and resets.
    fn raw_data(&mut self) -> Vec<u8>;

    /// Encodes `msg`, as returned by [`Emsa::raw_data`], into an
    /// `output_bits`-bit representative.
    fn encoding_of(
        &mut self,
        msg: &[u8],
        output_bits: usize,
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Vec<u8>>;

    /// Checks a recovered representative against `raw`.
    fn verify(&mut self, coded: &[u8], raw: &[u8], key_bits: usize) -> Result<bool>;
}

/// Instantiates a signature encoding method by name.
pub fn get_emsa(scheme: &str) -> Result<Box<dyn Emsa>> {
    let req = SchemeName::parse(scheme)?;

    match req.name() {
        "Raw" => {
            let hash = req.arg(0).map(HashFunction::from_name).transpose()?;
            Ok(Box::new(EmsaRaw::new(hash)))
        }
        "EMSA1" => Ok(Box::new(Emsa1::new(required_hash(&req)?))),
        "EMSA3" | "EMSA_PKCS1" | "PKCS1v15" | "EMSA-PKCS1-v1_5" => {
            if req.arg(0) == Some("Raw") {
                Ok(Box::new(Emsa3::raw()))
            } else {
                Ok(Box::new(Emsa3::new(required_hash(&req)?)))
            }
        }
        "EMSA4" | "PSSR" | "PSS" | "EMSA-PSS" => {
            let hash = required_hash(&req)?;
            if let Some(mgf) = req.arg(1) {
                let mgf = SchemeName::parse(mgf)?;
                if mgf.name() != "MGF1" {
                    return Err(Error::not_found(format!("{} mask generation", mgf)));
                }
                if let Some(mgf_hash) = mgf.arg(0) {
                    if HashFunction::from_name(mgf_hash)? != hash {
                        return Err(Error::not_found(format!(
                            "EMSA4 with MGF1({}) and {}",
                            mgf_hash, hash
                        )));
                    }
                }
            }
            let salt = match req.arg(2) {
                Some(_) => Some(req.arg_as_usize(2, 0)?),
                None => None,
            };
            Ok(Box::new(Emsa4::new(hash, salt)))
        }
        _ => Err(Error::not_found(scheme)),
    }
}

fn required_hash(req: &SchemeName) -> Result<HashFunction> {
    match req.arg(0) {
        Some(h) => HashFunction::from_name(h),
        None => Err(Error::decoding(format!("{} requires a hash argument", req))),
    }
}

/// Strips leading zeros from `coded` and left-pads it to `len` bytes.
fn fit_to(coded: &[u8], len: usize) -> Option<Vec<u8>> {
    let start = coded.iter().position(|b| *b != 0).unwrap_or(coded.len());
    let coded = &coded[start..];
    if coded.len() > len {
        return None;
    }
    let mut out = vec![0u8; len];
    out[len - coded.len()..].copy_from_slice(coded);
    Some(out)
}

/// The unpadded message itself, optionally checked to be a hash of a given
/// length.
pub struct EmsaRaw {
    hash: Option<HashFunction>,
    message: Vec<u8>,
}

impl EmsaRaw {
    /// `Raw` or `Raw(<hash>)`.
    pub fn new(hash: Option<HashFunction>) -> Self {
        EmsaRaw {
            hash,
            message: Vec::new(),
        }
    }
}

impl Emsa for EmsaRaw {
    fn name(&self) -> String {
        match self.hash {
            Some(h) => format!("Raw({})", h),
            None => "Raw".into(),
        }
    }

    fn hash_function(&self) -> Option<HashFunction> {
        self.hash
    }

    fn update(&mut self, input: &[u8]) {
        self.message.extend_from_slice(input);
    }

    fn raw_data(&mut self) -> Vec<u8> {
        let out = core::mem::take(&mut self.message);
        if let Some(h) = self.hash {
            if out.len() != h.output_size() {
                log::debug!("Raw({}): input length {} is not a digest", h, out.len());
            }
        }
        out
    }

    fn encoding_of(
        &mut self,
        msg: &[u8],
        _output_bits: usize,
        _rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Vec<u8>> {
        if let Some(h) = self.hash {
            if msg.len() != h.output_size() {
                return Err(Error::InputNotHashed);
            }
        }
        Ok(msg.to_vec())
    }

    fn verify(&mut self, coded: &[u8], raw: &[u8], _key_bits: usize) -> Result<bool> {
        if let Some(h) = self.hash {
            if raw.len() != h.output_size() {
                return Ok(false);
            }
        }
        let len = coded.len().max(raw.len());
        match (fit_to(coded, len), fit_to(raw, len)) {
            (Some(a), Some(b)) => Ok(a.ct_eq(&b).into()),
            _ => Ok(false),
        }
    }
}

/// EMSA1 from IEEE 1363: the hash truncated to the leftmost `output_bits`
/// bits. Used by DSA and the EC signature schemes.
pub struct Emsa1 {
    hash: HashFunction,
    ctx: Box<dyn DynDigest + Send + Sync>,
}

impl Emsa1 {
    /// `EMSA1(<hash>)`.
    pub fn new(hash: HashFunction) -> Self {
        Emsa1 {
            hash,
            ctx: hash.new_digest(),
        }
    }
}

/// `msg >> (8·len - output_bits)`, as a byte string.
pub(crate) fn emsa1_encoding(msg: &[u8], output_bits: usize) -> Vec<u8> {
    if 8 * msg.len() <= output_bits {
        return msg.to_vec();
    }

    let shift = 8 * msg.len() - output_bits;
    let byte_shift = shift / 8;
    let bit_shift = shift % 8;

    let mut digest = msg[..msg.len() - byte_shift].to_vec();
    if bit_shift > 0 {
        let mut carry = 0u8;
        for b in digest.iter_mut() {
            let w = *b;
            *b = (w >> bit_shift) | carry;
            carry = w << (8 - bit_shift);
        }
    }
    digest
}

impl Emsa for Emsa1 {
    fn name(&self) -> String {
        format!("EMSA1({})", self.hash)
    }

    fn hash_function(&self) -> Option<HashFunction> {
        Some(self.hash)
    }

    fn update(&mut self, input: &[u8]) {
        self.ctx.update(input);
    }

    fn raw_data(&mut self) -> Vec<u8> {
        self.ctx.finalize_reset().into_vec()
    }

    fn encoding_of(
        &mut self,
        msg: &[u8],
        output_bits: usize,
        _rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Vec<u8>> {
        if msg.len() != self.hash.output_size() {
            return Err(Error::InputNotHashed);
        }
        Ok(emsa1_encoding(msg, output_bits))
    }

    fn verify(&mut self, coded: &[u8], raw: &[u8], key_bits: usize) -> Result<bool> {
        if raw.len() != self.hash.output_size() {
            return Ok(false);
        }
        let ours = emsa1_encoding(raw, key_bits);
        match fit_to(coded, ours.len()) {
            Some(coded) => Ok(coded.ct_eq(&ours).into()),
            None => Ok(false),
        }
    }
}

/// EMSA3, the PKCS#1 v1.5 signature encoding. `EMSA3(Raw)` signs the
/// message bytes directly without a `DigestInfo` prefix.
pub struct Emsa3 {
    hash: Option<HashFunction>,
    ctx: Option<Box<dyn DynDigest + Send + Sync>>,
    message: Vec<u8>,
}

impl Emsa3 {
    /// `EMSA3(<hash>)`.
    pub fn new(hash: HashFunction) -> Self {
        Emsa3 {
            hash: Some(hash),
            ctx: Some(hash.new_digest()),
            message: Vec::new(),
        }
    }

    /// `EMSA3(Raw)`.
    pub fn raw() -> Self {
        Emsa3 {
            hash: None,
            ctx: None,
            message: Vec::new(),
        }
    }

    fn prefix(&self) -> Vec<u8> {
        self.hash.map(HashFunction::pkcs1_prefix).unwrap_or_default()
    }
}

impl Emsa for Emsa3 {
    fn name(&self) -> String {
        match self.hash {
            Some(h) => format!("EMSA3({})", h),
            None => "EMSA3(Raw)".into(),
        }
    }

    fn hash_function(&self) -> Option<HashFunction> {
        self.hash
    }

    fn update(&mut self, input: &[u8]) {
        match self.ctx.as_mut() {
            Some(ctx) => ctx.update(input),
            None => self.message.extend_from_slice(input),
        }
    }

    fn raw_data(&mut self) -> Vec<u8> {
        match self.ctx.as_mut() {
            Some(ctx) => ctx.finalize_reset().into_vec(),
            None => core::mem::take(&mut self.message),
        }
    }

    fn encoding_of(
        &mut self,
        msg: &[u8],
        output_bits: usize,
        _rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Vec<u8>> {
        if let Some(h) = self.hash {
            if msg.len() != h.output_size() {
                return Err(Error::InputNotHashed);
            }
        }
        // the block without its leading zero byte
        let em = pkcs1v15::sign_pad(&self.prefix(), msg, output_bits / 8 + 1)?;
        Ok(em[1..].to_vec())
    }

    fn verify(&mut self, coded: &[u8], raw: &[u8], key_bits: usize) -> Result<bool> {
        if let Some(h) = self.hash {
            if raw.len() != h.output_size() {
                return Ok(false);
            }
        }
        let k = key_bits / 8 + 1;
        match fit_to(coded, k) {
            Some(em) => Ok(pkcs1v15::sign_unpad(&self.prefix(), raw, &em, k).is_ok()),
            None => Ok(false),
        }
    }
}

/// EMSA4, the PKCS#1 PSS encoding with MGF1 over the message hash.
///
/// Without an explicit salt length the salt is as long as the hash and
/// verification accepts any salt length.
pub struct Emsa4 {
    hash: HashFunction,
    ctx: Box<dyn DynDigest + Send + Sync>,
    salt_len: usize,
    required_salt_len: bool,
}

impl Emsa4 {
    /// `EMSA4(<hash>,MGF1[,salt_len])`.
    pub fn new(hash: HashFunction, salt_len: Option<usize>) -> Self {
        Emsa4 {
            hash,
            ctx: hash.new_digest(),
            salt_len: salt_len.unwrap_or_else(|| hash.output_size()),
            required_salt_len: salt_len.is_some(),
        }
    }

    /// Salt length used when signing.
    pub fn salt_len(&self) -> usize {
        self.salt_len
    }
}

impl Emsa for Emsa4 {
    fn name(&self) -> String {
        format!("EMSA4({},MGF1,{})", self.hash, self.salt_len)
    }

    fn hash_function(&self) -> Option<HashFunction> {
        Some(self.hash)
    }

    fn update(&mut self, input: &[u8]) {
        self.ctx.update(input);
    }

    fn raw_data(&mut self) -> Vec<u8> {
        self.ctx.finalize_reset().into_vec()
    }

    fn encoding_of(
        &mut self,
        msg: &[u8],
        output_bits: usize,
        rng: Option<&mut dyn CryptoRngCore>,
    ) -> Result<Vec<u8>> {
        let rng = rng.ok_or_else(|| Error::invalid_argument("EMSA4 requires an RNG"))?;
        let mut salt = vec![0u8; self.salt_len];
        rng.fill_bytes(&mut salt);

        let mut h = self.hash.new_digest();
        pss::emsa_pss_encode(msg, output_bits, &salt, &mut *h)
    }

    fn verify(&mut self, coded: &[u8], raw: &[u8], key_bits: usize) -> Result<bool> {
        let em_len = key_bits.div_ceil(8);
        let mut em = match fit_to(coded, em_len) {
            Some(em) => em,
            None => return Ok(false),
        };
        let s_len = self.required_salt_len.then_some(self.salt_len);
        let mut h = self.hash.new_digest();
        Ok(pss::emsa_pss_verify(raw, &mut em, key_bits, s_len, &mut *h).is_ok())
    }
}
