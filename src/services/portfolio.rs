use std::collections::HashSet;

use chrono::Utc;

use crate::models::{round_cents, PortfolioSummary, Position};

/// Aggregates positions into one summary. Monetary totals are rounded to cents.
///
/// Rewards are recomputed from the two balances rather than trusted. Positions with a
/// non-positive deposit or a compound time in the future are left out.
pub fn summarize(positions: &[Position]) -> PortfolioSummary {
    let now = Utc::now();
    let positions: Vec<&Position> = positions
        .iter()
        .filter(|p| {
            let valid = p.is_valid_at(now);
            if !valid {
                tracing::warn!(
                    "skipping position {} on {}: invalid deposit or compound time",
                    p.id,
                    p.chain_id
                );
            }
            valid
        })
        .collect();

    let mut total_value = 0.0;
    let mut total_deposited = 0.0;
    let mut total_rewards = 0.0;
    let mut apy_sum = 0.0;
    let mut chains = HashSet::new();

    for p in &positions {
        total_value += p.current_value_usd;
        total_deposited += p.deposited_amount_usd;
        total_rewards += p.current_value_usd - p.deposited_amount_usd;
        apy_sum += p.apy_earned;
        chains.insert(p.chain_id.as_str());
    }

    let average_apy = if positions.is_empty() {
        None
    } else {
        Some(round_cents(apy_sum / positions.len() as f64))
    };

    PortfolioSummary {
        total_value_locked: round_cents(total_value),
        total_deposited: round_cents(total_deposited),
        total_rewards_earned: round_cents(total_rewards),
        total_profit_loss: round_cents(total_value - total_deposited),
        average_apy,
        active_positions: positions.len(),
        chains_count: chains.len(),
        last_updated: now,
    }
}
