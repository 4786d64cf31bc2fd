use std::{cmp::Ordering, collections::HashMap};

use mnemo_storage::{
	models::Memory,
	retrieval::{LexicalHit, VectorHit},
};

/// One record seen by at least one retrieval stage.
#[derive(Debug)]
pub struct Candidate {
	pub memory: Memory,
	/// Min-max normalized lexical relevance.
	pub lexical: Option<f32>,
	pub similarity: Option<f32>,
}

/// Unions both stages by id, lexical order first.
pub fn merge_candidates(lexical: Vec<LexicalHit>, vector: Vec<VectorHit>) -> Vec<Candidate> {
	let raw = lexical.iter().map(|hit| hit.score).collect::<Vec<_>>();
	let normalized = min_max_normalize(&raw);
	let mut out = Vec::with_capacity(lexical.len() + vector.len());
	let mut by_id = HashMap::new();

	for (hit, score) in lexical.into_iter().zip(normalized) {
		by_id.insert(hit.memory.id.clone(), out.len());
		out.push(Candidate { memory: hit.memory, lexical: Some(score), similarity: None });
	}
	for hit in vector {
		let score = similarity(hit.distance);

		match by_id.get(&hit.memory.id) {
			Some(&index) => out[index].similarity = Some(score),
			None => {
				by_id.insert(hit.memory.id.clone(), out.len());
				out.push(Candidate { memory: hit.memory, lexical: None, similarity: Some(score) });
			},
		}
	}

	out
}

/// Scales scores into `[0, 1]`. When every score is equal each one maps to 1.
pub fn min_max_normalize(scores: &[f64]) -> Vec<f32> {
	let finite = scores.iter().copied().filter(|score| score.is_finite());
	let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), score| {
		(min.min(score), max.max(score))
	});
	let span = max - min;

	scores
		.iter()
		.map(|score| {
			if !score.is_finite() {
				0.0
			} else if span <= f64::EPSILON {
				1.0
			} else {
				((score - min) / span).clamp(0.0, 1.0) as f32
			}
		})
		.collect()
}

pub fn similarity(distance: f32) -> f32 {
	if distance.is_nan() {
		return 0.0;
	}

	(1.0 - distance).clamp(0.0, 1.0)
}

/// Reciprocal-rank fusion of the lexical and vector rankings, scaled so a candidate ranked first
/// in both scores 1.
pub fn rrf_fusion(candidates: &[Candidate], k: f32) -> Vec<f32> {
	let lexical = competition_ranks(candidates, |candidate| candidate.lexical);
	let vector = competition_ranks(candidates, |candidate| candidate.similarity);
	let best = 2.0 / (k + 1.0);

	lexical
		.iter()
		.zip(&vector)
		.map(|(lexical_rank, vector_rank)| {
			let fused = 1.0 / (k + *lexical_rank as f32) + 1.0 / (k + *vector_rank as f32);

			(fused / best).clamp(0.0, 1.0)
		})
		.collect()
}

/// 1-based ranks, highest score first. Equal scores share a rank; candidates without a score
/// rank after every scored one.
fn competition_ranks<F>(candidates: &[Candidate], score: F) -> Vec<u32>
where
	F: Fn(&Candidate) -> Option<f32>,
{
	let mut scored = candidates
		.iter()
		.enumerate()
		.filter_map(|(index, candidate)| score(candidate).map(|value| (index, value)))
		.collect::<Vec<_>>();

	scored.sort_by(|(_, lhs), (_, rhs)| cmp_f32_desc(*lhs, *rhs));

	let absent_rank = scored.len() as u32 + 1;
	let mut ranks = vec![absent_rank; candidates.len()];
	let mut previous: Option<(f32, u32)> = None;

	for (position, (index, value)) in scored.into_iter().enumerate() {
		let rank = match previous {
			Some((last, rank)) if cmp_f32_desc(last, value) == Ordering::Equal => rank,
			_ => position as u32 + 1,
		};

		ranks[index] = rank;
		previous = Some((value, rank));
	}

	ranks
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
