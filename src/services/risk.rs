//! APY-banded risk policy.
//!
//! This is a fixed, auditable rule table, not a statistical model:
//!
//! | APY            | tier   | score band |
//! |----------------|--------|------------|
//! | `apy < 5`      | Low    | `[1, 3]`   |
//! | `5 <= apy < 15`| Medium | `[3, 7]`   |
//! | `apy >= 15`    | High   | `[7, 10]`  |
//!
//! Live pools get a deterministic point inside the band (`estimate`); synthetic pools draw
//! uniformly inside the band once (`sample`) and the draw is frozen into the record.

use rand::Rng;

use crate::models::IlRisk;

const MEDIUM_APY: f64 = 5.0;
const HIGH_APY: f64 = 15.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn tier(&self, apy: f64) -> IlRisk {
        if apy < MEDIUM_APY {
            IlRisk::Low
        } else if apy < HIGH_APY {
            IlRisk::Medium
        } else {
            IlRisk::High
        }
    }

    /// Deterministic score: linear inside Low and Medium, saturating towards 10 for High.
    pub fn estimate(&self, apy: f64) -> (f64, IlRisk) {
        let apy = if apy.is_finite() { apy.max(0.0) } else { 0.0 };
        let tier = self.tier(apy);
        let (lo, hi) = tier.score_band();
        let score = match tier {
            IlRisk::Low => lo + (hi - lo) * (apy / MEDIUM_APY),
            IlRisk::Medium => lo + (hi - lo) * ((apy - MEDIUM_APY) / (HIGH_APY - MEDIUM_APY)),
            IlRisk::High => lo + (hi - lo) * (1.0 - HIGH_APY / apy),
        };
        (score.clamp(lo, hi), tier)
    }

    pub fn score<R: Rng + ?Sized>(&self, apy: f64, rng: &mut R) -> (f64, IlRisk) {
        let tier = self.tier(apy);
        (self.sample(tier, rng), tier)
    }

    /// Uniform draw inside the tier's band.
    pub fn sample<R: Rng + ?Sized>(&self, tier: IlRisk, rng: &mut R) -> f64 {
        let (lo, hi) = tier.score_band();
        rng.gen_range(lo..=hi)
    }
}
