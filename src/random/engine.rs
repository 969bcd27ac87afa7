//! Seedable, copyable, branchable pseudo-random engine
//!
//! The stream is a 32-bit counter pushed through a multiply-xor-shift mix
//! on every draw. It is NOT cryptographically secure and must never be used
//! for secrets. An engine is a single sequence: share it across threads only
//! by handing each task its own [`Random::branch`].

use super::seed::string_hash;
use rand::{RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

const INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Seed input: any string, or a raw 32-bit state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    Text(String),
    State(u32),
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Seed::Text(s)
    }
}

impl From<u32> for Seed {
    fn from(state: u32) -> Self {
        Seed::State(state)
    }
}

/// Deterministic random engine
///
/// Same seed and same number of draws always give the same values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Random {
    state: u32,
    /// State the engine was created with; feeds [`Random::branch`]
    origin: u32,
}

impl Random {
    /// Create an engine from a string or a raw state
    pub fn new(seed: impl Into<Seed>) -> Self {
        match seed.into() {
            Seed::Text(text) => Random::from_state(string_hash(&text)),
            Seed::State(state) => Random::from_state(state),
        }
    }

    pub fn from_state(state: u32) -> Self {
        Random {
            state,
            origin: state,
        }
    }

    /// Seed from the wall clock in milliseconds
    pub fn from_entropy() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Random::new(millis.to_string())
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Advance and return the next raw 32-bit output
    pub fn next_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Draw a float in `[0, 1)`
    pub fn draw(&mut self) -> f64 {
        f64::from(self.next_raw()) / TWO_POW_32
    }

    /// Draw an index in `0..bound`; always 0 when `bound` is 0
    pub fn below(&mut self, bound: usize) -> usize {
        (self.draw() * bound as f64).floor() as usize
    }

    /// An engine that will produce exactly the values this one would
    ///
    /// Does not advance `self`. Branching the copy also matches branching
    /// the original.
    pub fn copy(&self) -> Random {
        self.clone()
    }

    /// Advance this engine and derive an independent-looking child
    ///
    /// The child is reseeded through the string hash from this engine's
    /// origin and one fresh draw, so it does not share state with the
    /// parent's remaining stream. Reproducible given the same history.
    pub fn branch(&mut self) -> Random {
        let draw = self.draw();
        let child = Random::new(format!("{}#{}", self.origin, draw));
        trace!(parent = self.origin, child = child.origin, "branched random engine");
        child
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_raw());
        let low = u64::from(self.next_raw());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Random {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Random::from_state(u32::from_le_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Random::new("abc");
        let mut b = Random::new("abc");
        for _ in 0..5 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn test_raw_state_seed() {
        let mut rng = Random::new(0u32);
        assert_eq!(rng.next_raw(), 1_144_304_738);
        assert_eq!(rng.next_raw(), 1_416_247);
        assert_eq!(rng.next_raw(), 958_946_056);
    }

    #[test]
    fn test_draw_range() {
        let mut rng = Random::new("range");
        for _ in 0..1000 {
            let x = rng.draw();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_copy_does_not_advance() {
        let mut rng = Random::new("copy");
        rng.draw();
        let mut copy = rng.copy();
        let state = rng.state();
        assert_eq!(copy.draw(), rng.draw());
        assert_ne!(rng.state(), state);
    }

    #[test]
    fn test_copy_branches_identically() {
        let mut rng = Random::new("branching copy");
        let mut copy = rng.copy();
        assert_eq!(rng.branch(), copy.branch());
    }

    #[test]
    fn test_branch_advances_parent() {
        let mut rng = Random::new("parent");
        let before = rng.state();
        let _child = rng.branch();
        assert_ne!(rng.state(), before);
    }

    #[test]
    fn test_below() {
        let mut rng = Random::new("below");
        assert_eq!(rng.below(0), 0);
        for _ in 0..100 {
            assert!(rng.below(7) < 7);
        }
    }

    #[test]
    fn test_rng_core_and_seedable() {
        let mut a = Random::from_seed(7u32.to_le_bytes());
        let mut b = Random::new(7u32);
        assert_eq!(a.next_u32(), b.next_raw());

        let mut bytes = [0u8; 6];
        a.fill_bytes(&mut bytes);
        let first = b.next_raw().to_le_bytes();
        assert_eq!(&bytes[..4], &first);
    }
}
