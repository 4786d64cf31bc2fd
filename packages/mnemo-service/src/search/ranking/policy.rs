use time::OffsetDateTime;

use mnemo_config::{Ranking, RankingWeights};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// `2^(-age_days / half_life_days)`; future timestamps count as age zero.
pub fn recency_boost(updated_at: OffsetDateTime, now: OffsetDateTime, half_life_days: f32) -> f32 {
	let age_days = ((now - updated_at).as_seconds_f64() / SECONDS_PER_DAY).max(0.0);

	(-age_days / f64::from(half_life_days)).exp2() as f32
}

/// Saturates at 1 once `ln(1 + n)` reaches 10.
pub fn frequency_boost(access_count: i64) -> f32 {
	let count = access_count.max(0) as f64;

	((1.0 + count).ln() / 10.0).min(1.0) as f32
}

pub fn resolve_weights(cfg: &Ranking, vector_signal: bool) -> RankingWeights {
	if vector_signal { cfg.hybrid } else { cfg.lexical_only }
}

pub fn final_score(weights: RankingWeights, relevance: f32, recency: f32, frequency: f32) -> f32 {
	weights.relevance * relevance + weights.recency * recency + weights.frequency * frequency
}

#[cfg(test)]
mod tests {
	use time::Duration;

	use super::*;

	#[test]
	fn recency_halves_every_half_life() {
		let now = OffsetDateTime::now_utc();

		assert!((recency_boost(now, now, 7.0) - 1.0).abs() < 1e-6);
		assert!((recency_boost(now - Duration::days(7), now, 7.0) - 0.5).abs() < 1e-6);
		assert!((recency_boost(now - Duration::days(14), now, 7.0) - 0.25).abs() < 1e-6);
		assert!((recency_boost(now + Duration::days(1), now, 7.0) - 1.0).abs() < 1e-6);
	}

	#[test]
	fn frequency_is_logarithmic_and_saturates() {
		assert_eq!(frequency_boost(0), 0.0);
		assert!((frequency_boost(1) - 2.0_f32.ln() / 10.0).abs() < 1e-6);
		assert_eq!(frequency_boost(1_000_000), 1.0);
		assert_eq!(frequency_boost(-3), 0.0);
	}

	#[test]
	fn vector_signal_selects_hybrid_weights() {
		let ranking = Ranking::default();

		assert_eq!(resolve_weights(&ranking, true).relevance, 0.7);
		assert_eq!(resolve_weights(&ranking, false).relevance, 0.6);
	}

	#[test]
	fn final_score_is_a_weighted_sum() {
		let weights = RankingWeights { relevance: 0.6, recency: 0.3, frequency: 0.1 };

		assert!((final_score(weights, 1.0, 0.5, 0.0) - 0.75).abs() < 1e-6);
	}
}
