//! Seeded generator used by every procedural decision.
//!
//! Mulberry32 is a 32-bit state generator with a float output in `[0, 1)`.
//! All of the world is derived from fresh instances seeded by time buckets
//! and entity ids, so two instances with the same seed must agree bit for bit.

use rand::{RngCore, SeedableRng};

#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from a wide value, wrapping to 32 bits.
    pub fn from_wide(seed: u64) -> Self {
        Self::new(wrap_seed(seed))
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// `floor(next * len)`, i.e. a uniform index below `len`. `len` must be
    /// non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        let roll = self.next_f64() * len as f64;
        // Truncation toward zero is the intended floor for a non-negative roll.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = roll as usize;
        index.min(len.saturating_sub(1))
    }

    /// Integer in `[low, low + span)`.
    pub fn range(&mut self, low: u32, span: u32) -> u32 {
        let offset = self.index(span as usize);
        low + u32::try_from(offset).unwrap_or_default()
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.index(items.len());
        items.get(index)
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let seed = self.state;
        let mut t = (seed ^ (seed >> 15)).wrapping_mul(1 | seed);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Wrap a seed expression to 32 bits the way integer seeds overflow.
pub fn wrap_seed(value: u64) -> u32 {
    u32::try_from(value & 0xFFFF_FFFF).unwrap_or_default()
}
