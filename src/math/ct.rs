//! Branch-free word and word-array primitives.
//!
//! Every function in this module has a control flow and memory access
//! pattern that is independent of the values of its data arguments. Masks are
//! either all-zero or all-one words.

use subtle::{Choice, ConditionallySelectable};

use super::bigint::Word;

/// All-one mask if the low bit of `bit` is set, else zero.
#[inline(always)]
pub fn expand_mask(bit: Word) -> Word {
    0u64.wrapping_sub(bit & 1)
}

/// All-one mask if `x == 0`.
#[inline(always)]
pub fn is_zero(x: Word) -> Word {
    expand_mask((!x & x.wrapping_sub(1)) >> 63)
}

/// All-one mask if `x == y`.
#[inline(always)]
pub fn is_equal(x: Word, y: Word) -> Word {
    is_zero(x ^ y)
}

/// All-one mask if `x < y`.
#[inline(always)]
pub fn is_lt(x: Word, y: Word) -> Word {
    expand_mask((x ^ ((x ^ y) | (x.wrapping_sub(y) ^ x))) >> 63)
}

/// `a` where `mask` is set, else `b`.
#[inline(always)]
pub fn select(mask: Word, a: Word, b: Word) -> Word {
    (mask & a) | (!mask & b)
}

/// Three-way selection; at most one of the masks may be set.
#[inline(always)]
pub fn select3(m1: Word, v1: Word, m2: Word, v2: Word, m3: Word, v3: Word, default: Word) -> Word {
    let none = !(m1 | m2 | m3);
    (m1 & v1) | (m2 & v2) | (m3 & v3) | (none & default)
}

/// `x += y` if `mask` is set. Returns the carry out (0 or 1).
pub fn cnd_add(mask: Word, x: &mut [Word], y: &[Word]) -> Word {
    debug_assert_eq!(x.len(), y.len());

    let mut carry = 0;
    for (xi, &yi) in x.iter_mut().zip(y) {
        let (s1, c1) = xi.overflowing_add(yi & mask);
        let (s2, c2) = s1.overflowing_add(carry);
        *xi = s2;
        carry = (c1 | c2) as Word;
    }
    carry & mask
}

/// `x -= y` if `mask` is set. Returns the borrow out (0 or 1).
pub fn cnd_sub(mask: Word, x: &mut [Word], y: &[Word]) -> Word {
    debug_assert_eq!(x.len(), y.len());

    let mut borrow = 0;
    for (xi, &yi) in x.iter_mut().zip(y) {
        let (d1, b1) = xi.overflowing_sub(yi & mask);
        let (d2, b2) = d1.overflowing_sub(borrow);
        *xi = d2;
        borrow = (b1 | b2) as Word;
    }
    borrow & mask
}

/// Two's complement negation of `x` if `mask` is set.
pub fn cnd_abs(mask: Word, x: &mut [Word]) {
    let mut carry = mask & 1;
    for xi in x.iter_mut() {
        let flipped = *xi ^ mask;
        let (s, c) = flipped.overflowing_add(carry);
        *xi = s;
        carry = c as Word;
    }
}

/// Swaps `x` and `y` if `mask` is set.
pub fn cnd_swap(mask: Word, x: &mut [Word], y: &mut [Word]) {
    debug_assert_eq!(x.len(), y.len());

    let choice = Choice::from((mask & 1) as u8);
    for (xi, yi) in x.iter_mut().zip(y.iter_mut()) {
        Word::conditional_swap(xi, yi, choice);
    }
}

/// Copies `y` into `x` if `mask` is set.
pub fn cnd_assign(mask: Word, x: &mut [Word], y: &[Word]) {
    for (xi, &yi) in x.iter_mut().zip(y) {
        *xi = select(mask, yi, *xi);
    }
}

/// In-place right shift by one bit.
pub fn shr1(x: &mut [Word]) {
    let n = x.len();
    for i in 0..n {
        let hi = if i + 1 < n { x[i + 1] << 63 } else { 0 };
        x[i] = (x[i] >> 1) | hi;
    }
}

/// All-one mask if every word of `x` is zero.
pub fn is_all_zero(x: &[Word]) -> Word {
    is_zero(x.iter().fold(0, |acc, &w| acc | w))
}

/// All-one mask if `x` and `y` are equal word for word.
pub fn is_equal_words(x: &[Word], y: &[Word]) -> Word {
    debug_assert_eq!(x.len(), y.len());
    is_zero(x.iter().zip(y).fold(0, |acc, (&a, &b)| acc | (a ^ b)))
}

/// Copies table entry `index` into `out` by scanning every entry.
pub fn lookup(table: &[&[Word]], index: usize, out: &mut [Word]) {
    out.iter_mut().for_each(|w| *w = 0);
    for (i, entry) in table.iter().enumerate() {
        let mask = is_equal(i as Word, index as Word);
        for (o, &e) in out.iter_mut().zip(entry.iter()) {
            *o |= e & mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONES: Word = Word::MAX;

    #[test]
    fn test_masks() {
        assert_eq!(expand_mask(1), ONES);
        assert_eq!(expand_mask(0), 0);
        assert_eq!(expand_mask(2), 0);
        assert_eq!(is_zero(0), ONES);
        assert_eq!(is_zero(1), 0);
        assert_eq!(is_zero(ONES), 0);
        assert_eq!(is_equal(7, 7), ONES);
        assert_eq!(is_equal(7, 8), 0);
        assert_eq!(is_lt(1, 2), ONES);
        assert_eq!(is_lt(2, 1), 0);
        assert_eq!(is_lt(0, ONES), ONES);
        assert_eq!(is_lt(5, 5), 0);
    }

    #[test]
    fn test_select() {
        assert_eq!(select(ONES, 1, 2), 1);
        assert_eq!(select(0, 1, 2), 2);
        assert_eq!(select3(ONES, 1, 0, 2, 0, 3, 9), 1);
        assert_eq!(select3(0, 1, ONES, 2, 0, 3, 9), 2);
        assert_eq!(select3(0, 1, 0, 2, ONES, 3, 9), 3);
        assert_eq!(select3(0, 1, 0, 2, 0, 3, 9), 9);
    }

    #[test]
    fn test_cnd_add_sub() {
        let mut x = [ONES, 0];
        assert_eq!(cnd_add(ONES, &mut x, &[1, 0]), 0);
        assert_eq!(x, [0, 1]);

        assert_eq!(cnd_add(0, &mut x, &[5, 5]), 0);
        assert_eq!(x, [0, 1]);

        assert_eq!(cnd_sub(ONES, &mut x, &[1, 0]), 0);
        assert_eq!(x, [ONES, 0]);

        let mut y = [0, 0];
        assert_eq!(cnd_sub(ONES, &mut y, &[1, 0]), 1);
        assert_eq!(y, [ONES, ONES]);

        let mut z = [ONES, ONES];
        assert_eq!(cnd_add(ONES, &mut z, &[1, 0]), 1);
        assert_eq!(z, [0, 0]);
    }

    #[test]
    fn test_cnd_abs_swap() {
        let mut x = [ONES, ONES];
        cnd_abs(ONES, &mut x);
        assert_eq!(x, [1, 0]);
        cnd_abs(0, &mut x);
        assert_eq!(x, [1, 0]);

        let mut a = [1, 2];
        let mut b = [3, 4];
        cnd_swap(0, &mut a, &mut b);
        assert_eq!((a, b), ([1, 2], [3, 4]));
        cnd_swap(ONES, &mut a, &mut b);
        assert_eq!((a, b), ([3, 4], [1, 2]));
    }

    #[test]
    fn test_shr1_and_lookup() {
        let mut x = [0, 1];
        shr1(&mut x);
        assert_eq!(x, [1 << 63, 0]);

        let t0 = [1, 1];
        let t1 = [2, 2];
        let t2 = [3, 3];
        let table: [&[Word]; 3] = [&t0, &t1, &t2];
        let mut out = [0; 2];
        lookup(&table, 2, &mut out);
        assert_eq!(out, [3, 3]);
        lookup(&table, 7, &mut out);
        assert_eq!(out, [0, 0]);

        assert_eq!(is_all_zero(&[0, 0]), ONES);
        assert_eq!(is_all_zero(&[0, 1]), 0);
        assert_eq!(is_equal_words(&[1, 2], &[1, 2]), ONES);
    }
}
