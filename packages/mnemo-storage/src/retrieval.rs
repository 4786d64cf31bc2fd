//! Candidate queries for hybrid search. Category and tag filters are part of each query so the
//! candidate limit applies to the filtered set.

use std::cmp::Ordering;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
	Result,
	models::{Memory, MemoryRow},
	queries::MEMORY_COLUMNS,
	vector,
};

/// Column weights for `bm25(memories_fts, id, content, category, tags)`.
const BM25_WEIGHTS: &str = "0.0, 10.0, 0.0, 4.0";

#[derive(Clone, Copy, Debug, Default)]
pub struct Filters<'a> {
	pub category: Option<&'a str>,
	/// Match-any.
	pub tags: &'a [String],
}

#[derive(Debug)]
pub struct LexicalHit {
	pub memory: Memory,
	/// Negated BM25, so larger is better.
	pub score: f64,
}

#[derive(Debug)]
pub struct VectorHit {
	pub memory: Memory,
	pub distance: f32,
}

#[derive(sqlx::FromRow)]
struct LexicalRow {
	#[sqlx(flatten)]
	memory: MemoryRow,
	lexical_score: f64,
}

#[derive(sqlx::FromRow)]
struct VectorRow {
	#[sqlx(flatten)]
	memory: MemoryRow,
	embedding: Vec<u8>,
}

/// Runs one FTS5 `MATCH` expression. Syntax errors in `match_expr` surface as
/// `sqlx::Error::Database`.
pub async fn lexical_candidates(
	conn: &mut SqliteConnection,
	match_expr: &str,
	filters: Filters<'_>,
	limit: u32,
) -> Result<Vec<LexicalHit>> {
	let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
		"\
SELECT {MEMORY_COLUMNS}, -bm25(memories_fts, {BM25_WEIGHTS}) AS lexical_score
FROM memories_fts
JOIN memories m ON m.seq = memories_fts.rowid
WHERE memories_fts MATCH "
	));

	builder.push_bind(match_expr);
	push_filters(&mut builder, filters);
	builder.push(" ORDER BY lexical_score DESC, m.seq ASC LIMIT ");
	builder.push_bind(i64::from(limit));

	let rows: Vec<LexicalRow> = builder.build_query_as().fetch_all(conn).await?;

	rows.into_iter()
		.map(|row| {
			let score = row.lexical_score;

			Memory::try_from(row.memory).map(|memory| LexicalHit { memory, score })
		})
		.collect()
}

/// Nearest neighbours of `query` by cosine distance among records that carry an embedding and
/// pass `filters`. Stored vectors of a different length are skipped.
pub async fn vector_candidates(
	conn: &mut SqliteConnection,
	query: &[f32],
	filters: Filters<'_>,
	limit: u32,
) -> Result<Vec<VectorHit>> {
	let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
		"\
SELECT {MEMORY_COLUMNS}, v.embedding AS embedding
FROM memories_vec v
JOIN memories m ON m.id = v.id
WHERE 1 = 1"
	));

	push_filters(&mut builder, filters);

	let rows: Vec<VectorRow> = builder.build_query_as().fetch_all(conn).await?;
	let mut scored = Vec::with_capacity(rows.len());

	for row in rows {
		let stored = vector::decode(&row.embedding)?;

		if stored.len() != query.len() {
			tracing::warn!(
				id = %row.memory.id,
				stored = stored.len(),
				expected = query.len(),
				"Skipping embedding with unexpected dimension."
			);

			continue;
		}

		scored.push((vector::cosine_distance(query, &stored), row.memory));
	}

	scored.sort_by(|(lhs_distance, lhs), (rhs_distance, rhs)| {
		lhs_distance
			.partial_cmp(rhs_distance)
			.unwrap_or(Ordering::Equal)
			.then_with(|| lhs.seq.cmp(&rhs.seq))
	});
	scored.truncate(limit as usize);

	scored
		.into_iter()
		.map(|(distance, row)| Memory::try_from(row).map(|memory| VectorHit { memory, distance }))
		.collect()
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filters: Filters<'a>) {
	if let Some(category) = filters.category {
		builder.push(" AND m.category = ").push_bind(category);
	}
	if !filters.tags.is_empty() {
		builder.push(" AND EXISTS (SELECT 1 FROM json_each(m.tags) WHERE json_each.value IN (");

		let mut separated = builder.separated(", ");

		for tag in filters.tags {
			separated.push_bind(tag.as_str());
		}

		separated.push_unseparated("))");
	}
}
