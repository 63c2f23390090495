//! Sparse bitmap index over initialized ticks
//!
//! Ticks are compressed by the pool's tick spacing (flooring towards negative
//! infinity) and packed into 256-bit words: word `compressed >> 8`, bit
//! `compressed & 0xff`. A swap asks for the next initialized tick within the
//! current word only, which bounds the work per step to a single word scan.

use crate::error::{MathError, MathResult};
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBitmap {
    words: HashMap<i16, U256>,
}

impl TickBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word index and bit position of a compressed tick
    pub fn position(compressed: i32) -> (i16, u8) {
        ((compressed >> 8) as i16, (compressed & 0xff) as u8)
    }

    /// Toggle the initialized bit of `tick`
    ///
    /// # Errors
    /// [`MathError::InvalidTick`] when `tick` is not a multiple of `tick_spacing`
    pub fn flip_tick(&mut self, tick: i32, tick_spacing: i32) -> MathResult<()> {
        if tick % tick_spacing != 0 {
            return Err(MathError::InvalidTick { tick });
        }

        let (word_pos, bit_pos) = Self::position(tick / tick_spacing);
        let mask = U256::one() << bit_pos;
        let word = self.word(word_pos) ^ mask;

        if word.is_zero() {
            self.words.remove(&word_pos);
        } else {
            self.words.insert(word_pos, word);
        }
        Ok(())
    }

    /// Whether the bit for `tick` is set; ticks off the spacing grid never are
    pub fn is_initialized(&self, tick: i32, tick_spacing: i32) -> bool {
        if tick % tick_spacing != 0 {
            return false;
        }
        let (word_pos, bit_pos) = Self::position(tick / tick_spacing);
        self.word(word_pos).bit(bit_pos as usize)
    }

    /// Next initialized tick in the same word as `tick`
    ///
    /// With `lte` the search covers `tick` itself and everything below it in
    /// the word, otherwise only ticks strictly above. When nothing is found
    /// the word boundary in the search direction is returned with `false`,
    /// so the caller can step to it and search again.
    ///
    /// # Arguments
    /// * `tick` - Starting tick (need not lie on the spacing grid)
    /// * `tick_spacing` - Pool tick spacing
    /// * `lte` - Search left (at or below) instead of right
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: i32,
        lte: bool,
    ) -> (i32, bool) {
        let compressed = compress(tick, tick_spacing);

        if lte {
            let (word_pos, bit_pos) = Self::position(compressed);
            // All bits at or right of the current one
            let bit = U256::one() << bit_pos;
            let mask = (bit - U256::one()) + bit;
            let masked = self.word(word_pos) & mask;

            if masked.is_zero() {
                ((compressed - bit_pos as i32) * tick_spacing, false)
            } else {
                let msb = (masked.bits() - 1) as i32;
                ((compressed - (bit_pos as i32 - msb)) * tick_spacing, true)
            }
        } else {
            // Start one past the current tick
            let (word_pos, bit_pos) = Self::position(compressed + 1);
            let mask = !((U256::one() << bit_pos) - U256::one());
            let masked = self.word(word_pos) & mask;

            if masked.is_zero() {
                ((compressed + 1 + (255 - bit_pos as i32)) * tick_spacing, false)
            } else {
                let lsb = masked.trailing_zeros() as i32;
                ((compressed + 1 + (lsb - bit_pos as i32)) * tick_spacing, true)
            }
        }
    }

    pub fn words(&self) -> impl Iterator<Item = (i16, U256)> + '_ {
        self.words.iter().map(|(&pos, &word)| (pos, word))
    }

    /// Number of set bits across every word
    pub fn count_initialized(&self) -> usize {
        self.words
            .values()
            .map(|word| {
                let U256(ref limbs) = *word;
                limbs.iter().map(|limb| limb.count_ones() as usize).sum::<usize>()
            })
            .sum()
    }

    fn word(&self, word_pos: i16) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or_default()
    }
}

impl FromIterator<(i16, U256)> for TickBitmap {
    fn from_iter<I: IntoIterator<Item = (i16, U256)>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().filter(|(_, word)| !word.is_zero()).collect(),
        }
    }
}

/// `tick / tick_spacing`, rounded towards negative infinity
fn compress(tick: i32, tick_spacing: i32) -> i32 {
    let compressed = tick / tick_spacing;
    if tick < 0 && tick % tick_spacing != 0 {
        compressed - 1
    } else {
        compressed
    }
}
