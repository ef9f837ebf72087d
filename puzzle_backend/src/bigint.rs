//! Radix-10 digit streaming across a concatenation of 256-bit words.
//!
//! Both the descriptor codec (C1) and the solution codec (C2) decode their
//! wire format by pulling one decimal digit at a time out of a sequence of
//! opaque 256-bit integers. The two running radix markers (`modulus`,
//! `prev`) avoid repeated division: `digit = (word[i] mod 10*modulus) /
//! prev`, after which `prev = modulus = modulus * 10`. Once `modulus` would
//! exceed `MOD_LIMIT`, the stream advances to the next word and resets both
//! markers to 1 - this is the compact bit-exact trick the on-chain encoder
//! relies on, preserved here rather than replaced with a from-scratch
//! division per digit.

use num_bigint::BigUint;
use num_traits::One;

use crate::types::MOD_LIMIT_DIGITS;

/// `10^77 - 1`: the largest decimal multiplier that fits safely in a
/// 256-bit register.
pub fn mod_limit() -> BigUint {
    let ten = BigUint::from(10u32);
    let mut limit = BigUint::one();
    for _ in 0..MOD_LIMIT_DIGITS {
        limit *= &ten;
    }
    limit - BigUint::one()
}

/// A stream of decimal digits across `words[0], words[1], ...`, LSD-first
/// within each word, advancing to the next word once the running radix
/// marker would exceed `MOD_LIMIT`.
pub struct DigitStream<'a> {
    words: &'a [BigUint],
    index: usize,
    modulus: BigUint,
    prev: BigUint,
}

impl<'a> DigitStream<'a> {
    pub fn new(words: &'a [BigUint]) -> Self {
        DigitStream {
            words,
            index: 0,
            modulus: BigUint::one(),
            prev: BigUint::one(),
        }
    }

    /// Extract the next decimal digit. Returns 0 once the word list is
    /// exhausted (the decoder is total on any input, per the descriptor
    /// codec's invariant).
    pub fn next_digit(&mut self) -> u8 {
        if self.index >= self.words.len() {
            return 0;
        }

        let ten = BigUint::from(10u32);
        let next_modulus = &self.modulus * &ten;
        let word = &self.words[self.index];
        let digit_big = (word % &next_modulus) / &self.prev;
        let digit = digit_big.to_bytes_le().first().copied().unwrap_or(0);

        self.prev = next_modulus.clone();
        self.modulus = next_modulus;

        if self.modulus > mod_limit() {
            self.index += 1;
            self.modulus = BigUint::one();
            self.prev = BigUint::one();
        }

        digit
    }

    /// Extract `count` decimal digits in extraction (LSD-first) order, e.g.
    /// a 3-digit `(quadrant, y, x)` object is `read_digits(3)`.
    pub fn read_digits(&mut self, count: usize) -> Vec<u8> {
        (0..count).map(|_| self.next_digit()).collect()
    }
}

/// Inverse of [`DigitStream`]: accumulates digits into a growable word list
/// using the same modulus/prev progression, so `DigitWriter::finish()` fed
/// back into [`DigitStream`] reproduces the exact digit sequence written.
/// Used only by the test-facing encoders (C1's "encode for tests" and the
/// solution encoder helper) - production code only ever decodes.
pub struct DigitWriter {
    words: Vec<BigUint>,
    index: usize,
    modulus: BigUint,
    prev: BigUint,
}

impl DigitWriter {
    pub fn new() -> Self {
        DigitWriter {
            words: vec![BigUint::from(0u32)],
            index: 0,
            modulus: BigUint::one(),
            prev: BigUint::one(),
        }
    }

    pub fn write_digit(&mut self, digit: u8) {
        let contribution = BigUint::from(digit) * &self.prev;
        self.words[self.index] += contribution;

        let ten = BigUint::from(10u32);
        let next_modulus = &self.modulus * &ten;
        self.prev = next_modulus.clone();
        self.modulus = next_modulus;

        if self.modulus > mod_limit() {
            self.index += 1;
            self.modulus = BigUint::one();
            self.prev = BigUint::one();
            if self.index >= self.words.len() {
                self.words.push(BigUint::from(0u32));
            }
        }
    }

    pub fn write_digits(&mut self, digits: &[u8]) {
        for &d in digits {
            self.write_digit(d);
        }
    }

    /// Pad the word list up to `count` words (descriptors always occupy
    /// exactly four words on the wire, even if trailing ones are unused).
    pub fn finish_padded(mut self, count: usize) -> Vec<BigUint> {
        while self.words.len() < count {
            self.words.push(BigUint::from(0u32));
        }
        self.words
    }
}

impl Default for DigitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lsd_first_within_a_word() {
        let words = vec![BigUint::from(4321u32), BigUint::from(0u32), BigUint::from(0u32), BigUint::from(0u32)];
        let mut stream = DigitStream::new(&words);
        assert_eq!(stream.next_digit(), 1);
        assert_eq!(stream.next_digit(), 2);
        assert_eq!(stream.next_digit(), 3);
        assert_eq!(stream.next_digit(), 4);
    }

    #[test]
    fn advances_to_next_word_past_mod_limit() {
        let limit = mod_limit();
        // A word whose value is exactly `limit` has 77 nines; reading 77
        // digits must exhaust it and the 78th digit must come from word[1].
        let words = vec![limit, BigUint::from(7u32)];
        let mut stream = DigitStream::new(&words);
        for _ in 0..MOD_LIMIT_DIGITS {
            assert_eq!(stream.next_digit(), 9);
        }
        assert_eq!(stream.next_digit(), 7);
    }

    #[test]
    fn exhausted_stream_returns_zero() {
        let words: Vec<BigUint> = vec![];
        let mut stream = DigitStream::new(&words);
        assert_eq!(stream.next_digit(), 0);
    }

    #[test]
    fn writer_and_stream_round_trip_across_a_word_boundary() {
        let digits: Vec<u8> = (0..200).map(|i| (i % 10) as u8).collect();
        let mut writer = DigitWriter::new();
        writer.write_digits(&digits);
        let words = writer.finish_padded(4);

        let mut stream = DigitStream::new(&words);
        for &d in &digits {
            assert_eq!(stream.next_digit(), d);
        }
    }
}
