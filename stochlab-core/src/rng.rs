//! Seeding for the forecast noise.
//!
//! With a master seed, each `(symbol, last actual date)` pair gets its own
//! sub-seed derived via BLAKE3, so re-running the same ticker on the same data
//! reproduces the same noisy forecast regardless of what was run before it.
//! Without a master seed the noise comes from OS entropy.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseSeeder {
    master_seed: Option<u64>,
}

impl NoiseSeeder {
    pub fn new(master_seed: Option<u64>) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> Option<u64> {
        self.master_seed
    }

    /// Derive the sub-seed for a symbol and its last actual bar date.
    pub fn sub_seed(master_seed: u64, symbol: &str, last_date: NaiveDate) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(last_date.to_string().as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, symbol: &str, last_date: NaiveDate) -> StdRng {
        match self.master_seed {
            Some(seed) => StdRng::seed_from_u64(Self::sub_seed(seed, symbol, last_date)),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn sub_seeds_are_deterministic() {
        assert_eq!(
            NoiseSeeder::sub_seed(42, "AAPL", date()),
            NoiseSeeder::sub_seed(42, "AAPL", date())
        );
    }

    #[test]
    fn different_symbols_different_seeds() {
        assert_ne!(
            NoiseSeeder::sub_seed(42, "AAPL", date()),
            NoiseSeeder::sub_seed(42, "MSFT", date())
        );
    }

    #[test]
    fn different_dates_different_seeds() {
        let next = date().succ_opt().unwrap();
        assert_ne!(
            NoiseSeeder::sub_seed(42, "AAPL", date()),
            NoiseSeeder::sub_seed(42, "AAPL", next)
        );
    }

    #[test]
    fn seeded_rngs_repeat() {
        let seeder = NoiseSeeder::new(Some(7));
        let draw = || -> Vec<u32> {
            seeder
                .rng_for("SPY", date())
                .sample_iter(rand::distributions::Standard)
                .take(4)
                .collect()
        };
        let a = draw();
        let b = draw();
        assert_eq!(a, b);
    }
}
