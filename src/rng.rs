//! Optional random number generators.

use rand_core::{CryptoRng, CryptoRngCore, RngCore};

/// Reborrows an optional RNG for a single call, leaving `rng` usable
/// afterwards.
pub(crate) fn reborrow<'a>(
    rng: &'a mut Option<&mut dyn CryptoRngCore>,
) -> Option<&'a mut dyn CryptoRngCore> {
    match rng {
        Some(rng) => {
            let rng: &'a mut dyn CryptoRngCore = &mut **rng;
            Some(rng)
        }
        None => None,
    }
}

/// Lends a possibly unsized RNG to code that takes
/// `&mut dyn CryptoRngCore`.
pub(crate) struct RngRef<'a, R: CryptoRngCore + ?Sized>(pub(crate) &'a mut R);

impl<R: CryptoRngCore + ?Sized> RngCore for RngRef<'_, R> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl<R: CryptoRngCore + ?Sized> CryptoRng for RngRef<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn draw(rng: Option<&mut dyn CryptoRngCore>) -> Option<u32> {
        rng.map(|rng| rng.next_u32())
    }

    #[test]
    fn test_reborrow() {
        let mut inner = ChaCha8Rng::from_seed([42; 32]);
        let mut rng: Option<&mut dyn CryptoRngCore> = Some(&mut inner);
        let a = draw(reborrow(&mut rng));
        let b = draw(reborrow(&mut rng));
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);

        let mut none: Option<&mut dyn CryptoRngCore> = None;
        assert_eq!(draw(reborrow(&mut none)), None);
    }

    #[test]
    fn test_rng_ref_forwards() {
        let mut a = ChaCha8Rng::from_seed([7; 32]);
        let mut b = ChaCha8Rng::from_seed([7; 32]);
        let inner: &mut dyn CryptoRngCore = &mut a;
        let mut lent = RngRef(inner);
        assert_eq!(draw(Some(&mut lent)), Some(b.next_u32()));
    }
}
