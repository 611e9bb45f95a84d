//! Deterministic random rolls for proc and critical-strike chances.
//!
//! Every roll draws from a seed derived from the state's base seed, a roll
//! counter and the aura involved, so replays with the same inputs produce the
//! same procs.

/// Source of deterministic random numbers.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Uniform value in `[0, 1)`.
    fn next_unit(&self, seed: u64) -> f32 {
        // 24 bits fit the f32 mantissa exactly, so the result stays below 1.0
        (self.next_u32(seed) >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Succeeds with `chance` percent probability (0..=100).
    fn roll_chance(&self, seed: u64, chance: f32) -> bool {
        if chance <= 0.0 {
            return false;
        }
        if chance >= 100.0 {
            return true;
        }
        self.next_unit(seed) * 100.0 < chance
    }
}

/// PCG-XSH-RR generator: one LCG step followed by an xorshift and a random
/// rotation of the high bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::output(Self::step(seed))
    }
}

/// Generator that always yields the same value. `FixedRng::ALWAYS` passes
/// every roll below 100%, `FixedRng::NEVER` fails every roll above 0%.
#[derive(Clone, Copy, Debug)]
pub struct FixedRng(pub u32);

impl FixedRng {
    pub const ALWAYS: Self = Self(0);
    pub const NEVER: Self = Self(u32::MAX);
}

impl RngOracle for FixedRng {
    fn next_u32(&self, _seed: u64) -> u32 {
        self.0
    }
}

/// What a roll decides; keeps independent rolls of one aura apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RollContext {
    ProcChance = 0,
    PeriodicCrit = 1,
}

/// Mixes the base seed, roll counter, aura and roll kind into one seed.
pub fn compute_seed(base_seed: u64, nonce: u64, source: u64, context: RollContext) -> u64 {
    let mut hash = base_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= source.wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}
