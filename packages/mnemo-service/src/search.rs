mod ranking;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, MemoryItem, MnemoService, Result};
use mnemo_storage::{
	models::Memory,
	queries::{self, MAX_BATCH_IDS},
	retrieval::{self, Filters, LexicalHit, VectorHit},
	timestamp,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub query: String,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub category: Option<String>,
	/// Match-any.
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	#[serde(flatten)]
	pub memory: MemoryItem,
	pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

struct SearchOutcome {
	items: Vec<SearchItem>,
	/// SQL statements issued inside the search transaction.
	statements: usize,
}

struct ScoredMemory {
	memory: Memory,
	score: f32,
}

impl MnemoService {
	/// Hybrid lexical and vector search. Every returned record has its access counter bumped
	/// once, in the same transaction as the retrieval queries.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let limit = req.limit.unwrap_or(self.cfg.search.default_limit);

		if limit == 0 {
			return Ok(SearchResponse { items: Vec::new() });
		}

		let embedding = self.query_embedding(&req.query, req.embedding).await?;
		let category = req.category.as_deref().map(str::trim).filter(|value| !value.is_empty());
		let tags = crate::normalize_tags(req.tags.unwrap_or_default());
		let filters = Filters { category, tags: &tags };
		let outcome = self.execute_search(&req.query, embedding.as_deref(), filters, limit).await?;

		tracing::debug!(
			results = outcome.items.len(),
			statements = outcome.statements,
			vector = embedding.is_some(),
			"Search completed."
		);

		Ok(SearchResponse { items: outcome.items })
	}

	async fn execute_search(
		&self,
		query: &str,
		embedding: Option<&[f32]>,
		filters: Filters<'_>,
		limit: u32,
	) -> Result<SearchOutcome> {
		let pool_size = limit.saturating_mul(self.cfg.search.candidate_multiplier.max(1));
		let now = timestamp::now();
		let mut statements = 0;
		let mut tx = self.db.begin_write().await?;
		let mut lexical = Vec::new();

		for tier in ranking::build_tiers(query) {
			statements += 1;

			if let Some(hits) = lexical_tier(&mut *tx, &tier, filters, pool_size).await?
				&& !hits.is_empty()
			{
				lexical = hits;

				break;
			}
		}

		let vector = match embedding {
			Some(embedding) => {
				statements += 1;

				vector_stage(&mut *tx, embedding, filters, pool_size).await?
			},
			None => Vec::new(),
		};
		let mut ranked = self.rank(lexical, vector, now);

		ranked.truncate(limit as usize);

		if !ranked.is_empty() {
			let ids = ranked.iter().map(|scored| scored.memory.id.as_str()).collect::<Vec<_>>();

			statements += ids.len().div_ceil(MAX_BATCH_IDS);

			queries::record_access(&mut *tx, &ids, now).await?;
		}

		tx.commit().await?;

		let items = ranked
			.into_iter()
			.map(|mut scored| {
				scored.memory.access_count += 1;
				scored.memory.last_accessed = now;

				SearchItem { memory: MemoryItem::from(scored.memory), score: scored.score }
			})
			.collect();

		Ok(SearchOutcome { items, statements })
	}

	fn rank(
		&self,
		lexical: Vec<LexicalHit>,
		vector: Vec<VectorHit>,
		now: OffsetDateTime,
	) -> Vec<ScoredMemory> {
		let has_lexical = !lexical.is_empty();
		let has_vector = !vector.is_empty();
		let candidates = ranking::merge_candidates(lexical, vector);
		let relevance = if has_lexical && has_vector {
			ranking::rrf_fusion(&candidates, self.cfg.search.rrf_k)
		} else if has_vector {
			candidates.iter().map(|candidate| candidate.similarity.unwrap_or(0.0)).collect()
		} else {
			candidates.iter().map(|candidate| candidate.lexical.unwrap_or(0.0)).collect()
		};
		let weights = ranking::resolve_weights(&self.cfg.ranking, has_vector);
		let half_life = self.cfg.ranking.recency_half_life_days;
		let mut scored = candidates
			.into_iter()
			.zip(relevance)
			.map(|(candidate, relevance)| {
				let recency = ranking::recency_boost(candidate.memory.updated_at, now, half_life);
				let frequency = ranking::frequency_boost(candidate.memory.access_count);

				ScoredMemory {
					score: ranking::final_score(weights, relevance, recency, frequency),
					memory: candidate.memory,
				}
			})
			.collect::<Vec<_>>();

		scored.sort_by(|lhs, rhs| {
			ranking::cmp_f32_desc(lhs.score, rhs.score)
				.then_with(|| rhs.memory.updated_at.cmp(&lhs.memory.updated_at))
				.then_with(|| lhs.memory.id.cmp(&rhs.memory.id))
		});

		scored
	}
}

/// `Ok(None)` when the tier's expression is rejected by the index.
async fn lexical_tier(
	conn: &mut sqlx::SqliteConnection,
	tier: &ranking::LexicalTier,
	filters: Filters<'_>,
	limit: u32,
) -> Result<Option<Vec<LexicalHit>>> {
	match retrieval::lexical_candidates(conn, &tier.expr, filters, limit).await {
		Ok(hits) => Ok(Some(hits)),
		Err(mnemo_storage::Error::Sqlx(sqlx::Error::Database(err))) => {
			tracing::warn!(error = %err, tier = ?tier.kind, "Lexical tier query failed.");

			Ok(None)
		},
		Err(err) => Err(Error::from(err)),
	}
}

/// Falls back to no vector candidates when the index cannot be queried.
async fn vector_stage(
	conn: &mut sqlx::SqliteConnection,
	embedding: &[f32],
	filters: Filters<'_>,
	limit: u32,
) -> Result<Vec<VectorHit>> {
	match retrieval::vector_candidates(conn, embedding, filters, limit).await {
		Ok(hits) => Ok(hits),
		Err(mnemo_storage::Error::Sqlx(sqlx::Error::Database(err))) => {
			tracing::warn!(error = %err, "Vector index unavailable; searching lexically.");

			Ok(Vec::new())
		},
		Err(err) => Err(Error::from(err)),
	}
}
