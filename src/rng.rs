/*
 * Random Stream Module
 *
 * Deterministic noise source for initialization and per-step heading noise.
 * The generator is the 32-bit Mersenne Twister (MT19937) with the classic
 * `init_genrand` seeding, and uniforms are built from two 32-bit outputs
 * with 53 bits of precision. Together these reproduce the draw sequence the
 * reference trajectories were recorded with, so the same seed gives the same
 * flock on every platform and every thread count.
 *
 * The stream is owned and passed explicitly; nothing in the crate keeps a
 * global generator.
 */

use rand::distributions::Distribution;
use rand::{Rng, RngCore, SeedableRng};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// 32-bit Mersenne Twister.
#[derive(Clone)]
pub struct Mt19937 {
    state: Box<[u32; N]>,
    index: usize,
}

impl Mt19937 {
    pub fn new(seed: u32) -> Self {
        let mut state = Box::new([0u32; N]);
        state[0] = seed;
        for i in 1..N {
            let prev = state[i - 1];
            state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self { state, index: N }
    }

    // Regenerate the whole block of N words
    fn twist(&mut self) {
        for i in 0..N {
            let y = (self.state[i] & UPPER_MASK) | (self.state[(i + 1) % N] & LOWER_MASK);
            let mut next = self.state[(i + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.state[i] = next;
        }
        self.index = 0;
    }

    #[inline]
    fn next_word(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        // Tempering
        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }
}

impl std::fmt::Debug for Mt19937 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mt19937").field("index", &self.index).finish()
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_word());
        let hi = u64::from(self.next_word());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mt19937 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    // Keep the low 32 bits so that `seed_from_u64(17)` and `new(17)` agree
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}

/// Uniform in [0, 1) with 53 random bits, drawn from two 32-bit words:
/// the top 27 bits of the first and the top 26 bits of the second.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyUniform;

impl Distribution<f64> for LegacyUniform {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let a = rng.next_u32() >> 5;
        let b = rng.next_u32() >> 6;
        (f64::from(a) * 67_108_864.0 + f64::from(b)) / 9_007_199_254_740_992.0
    }
}

/// The single random stream of a run.
///
/// Initialization and every noise draw consume it in a fixed order, so the
/// stream position after `k` steps is the same regardless of how the neighbor
/// loop was scheduled.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: Mt19937,
    draws: u64,
}

impl RandomStream {
    pub fn seeded(seed: u32) -> Self {
        Self {
            rng: Mt19937::new(seed),
            draws: 0,
        }
    }

    /// Next uniform in [0, 1).
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.sample(LegacyUniform)
    }

    /// Draws `n` uniforms up front, in index order.
    pub fn draw(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.next_unit()).collect()
    }

    /// Discards `n` uniforms.
    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.next_unit();
        }
    }

    /// Number of uniforms taken since seeding.
    pub fn draws_taken(&self) -> u64 {
        self.draws
    }
}
