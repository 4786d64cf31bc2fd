use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use time::OffsetDateTime;

use crate::{
	Result,
	models::{self, CategoryCount, Memory, MemoryPatch, MemoryRow},
	timestamp, vector,
};

pub(crate) const MEMORY_COLUMNS: &str = "\
m.seq AS seq, m.id AS id, m.content AS content, m.category AS category, m.tags AS tags, \
m.source AS source, m.created_at AS created_at, m.updated_at AS updated_at, \
m.access_count AS access_count, m.last_accessed AS last_accessed";

/// SQLite's default bound-parameter ceiling is 32766; stay well below it.
pub const MAX_BATCH_IDS: usize = 900;

pub async fn insert_memory(conn: &mut SqliteConnection, memory: &Memory) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO memories (
	id,
	content,
	category,
	tags,
	source,
	created_at,
	updated_at,
	access_count,
	last_accessed
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(memory.id.as_str())
	.bind(memory.content.as_str())
	.bind(memory.category.as_str())
	.bind(models::encode_tags(&memory.tags)?)
	.bind(memory.source.as_deref())
	.bind(timestamp::format(memory.created_at)?)
	.bind(timestamp::format(memory.updated_at)?)
	.bind(memory.access_count)
	.bind(timestamp::format(memory.last_accessed)?)
	.execute(conn)
	.await?;

	Ok(())
}

/// Inserts or overwrites by `id`. Uses `ON CONFLICT DO UPDATE` so the lexical index update
/// trigger fires instead of a silent replace.
pub async fn upsert_memory(conn: &mut SqliteConnection, memory: &Memory) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO memories (
	id,
	content,
	category,
	tags,
	source,
	created_at,
	updated_at,
	access_count,
	last_accessed
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
	content = excluded.content,
	category = excluded.category,
	tags = excluded.tags,
	source = excluded.source,
	created_at = excluded.created_at,
	updated_at = excluded.updated_at,
	access_count = excluded.access_count,
	last_accessed = excluded.last_accessed",
	)
	.bind(memory.id.as_str())
	.bind(memory.content.as_str())
	.bind(memory.category.as_str())
	.bind(models::encode_tags(&memory.tags)?)
	.bind(memory.source.as_deref())
	.bind(timestamp::format(memory.created_at)?)
	.bind(timestamp::format(memory.updated_at)?)
	.bind(memory.access_count)
	.bind(timestamp::format(memory.last_accessed)?)
	.execute(conn)
	.await?;

	Ok(())
}

pub async fn fetch_memory(conn: &mut SqliteConnection, id: &str) -> Result<Option<Memory>> {
	let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories m WHERE m.id = ?");
	let row: Option<MemoryRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;

	row.map(Memory::try_from).transpose()
}

pub async fn memory_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
	let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM memories WHERE id = ?")
		.bind(id)
		.fetch_optional(conn)
		.await?;

	Ok(found.is_some())
}

/// Applies the supplied fields and stamps `updated_at`. Returns `false` when `id` is unknown.
pub async fn update_memory(
	conn: &mut SqliteConnection,
	id: &str,
	patch: &MemoryPatch<'_>,
	now: OffsetDateTime,
) -> Result<bool> {
	let tags = patch.tags.map(models::encode_tags).transpose()?;
	let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE memories SET ");
	let mut fields = builder.separated(", ");

	if let Some(content) = patch.content {
		fields.push("content = ").push_bind_unseparated(content);
	}
	if let Some(category) = patch.category {
		fields.push("category = ").push_bind_unseparated(category);
	}
	if let Some(tags) = tags {
		fields.push("tags = ").push_bind_unseparated(tags);
	}

	fields.push("updated_at = ").push_bind_unseparated(timestamp::format(now)?);
	builder.push(" WHERE id = ").push_bind(id);

	let result = builder.build().execute(conn).await?;

	Ok(result.rows_affected() > 0)
}

/// Removes the record; triggers drop its lexical and vector entries in the same statement.
pub async fn delete_memory(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
	let result = sqlx::query("DELETE FROM memories WHERE id = ?").bind(id).execute(conn).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn list_memories(
	conn: &mut SqliteConnection,
	category: Option<&str>,
	limit: u32,
	offset: u32,
) -> Result<Vec<Memory>> {
	let mut builder: QueryBuilder<'_, Sqlite> =
		QueryBuilder::new(format!("SELECT {MEMORY_COLUMNS} FROM memories m"));

	if let Some(category) = category {
		builder.push(" WHERE m.category = ").push_bind(category);
	}

	builder.push(" ORDER BY m.updated_at DESC, m.seq DESC LIMIT ");
	builder.push_bind(i64::from(limit));
	builder.push(" OFFSET ");
	builder.push_bind(i64::from(offset));

	let rows: Vec<MemoryRow> = builder.build_query_as().fetch_all(conn).await?;

	rows.into_iter().map(Memory::try_from).collect()
}

/// Every record in creation order.
pub async fn export_memories(conn: &mut SqliteConnection) -> Result<Vec<Memory>> {
	let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories m ORDER BY m.created_at, m.seq");
	let rows: Vec<MemoryRow> = sqlx::query_as(&sql).fetch_all(conn).await?;

	rows.into_iter().map(Memory::try_from).collect()
}

pub async fn clear_memories(conn: &mut SqliteConnection, vector_enabled: bool) -> Result<u64> {
	let result = sqlx::query("DELETE FROM memories").execute(&mut *conn).await?;

	if vector_enabled {
		sqlx::query("DELETE FROM memories_vec").execute(&mut *conn).await?;
	}

	Ok(result.rows_affected())
}

pub async fn count_memories(conn: &mut SqliteConnection) -> Result<i64> {
	Ok(sqlx::query_scalar("SELECT COUNT(*) FROM memories").fetch_one(conn).await?)
}

/// Per-category counts, largest first.
pub async fn category_counts(conn: &mut SqliteConnection) -> Result<Vec<CategoryCount>> {
	let rows: Vec<(String, i64)> = sqlx::query_as(
		"\
SELECT category, COUNT(*) AS count
FROM memories
GROUP BY category
ORDER BY count DESC, category ASC",
	)
	.fetch_all(conn)
	.await?;

	Ok(rows.into_iter().map(|(category, count)| CategoryCount { category, count }).collect())
}

pub async fn last_updated(conn: &mut SqliteConnection) -> Result<Option<OffsetDateTime>> {
	let raw: Option<String> =
		sqlx::query_scalar("SELECT MAX(updated_at) FROM memories").fetch_one(conn).await?;

	raw.map(|value| timestamp::parse_stored(&value, "updated_at")).transpose()
}

/// Replaces the vector entry for `id` (delete then insert).
pub async fn replace_embedding(
	conn: &mut SqliteConnection,
	id: &str,
	embedding: &[f32],
) -> Result<()> {
	sqlx::query("DELETE FROM memories_vec WHERE id = ?").bind(id).execute(&mut *conn).await?;
	sqlx::query("INSERT INTO memories_vec (id, embedding) VALUES (?, ?)")
		.bind(id)
		.bind(vector::encode(embedding))
		.execute(&mut *conn)
		.await?;

	Ok(())
}

pub async fn fetch_embedding(conn: &mut SqliteConnection, id: &str) -> Result<Option<Vec<f32>>> {
	let blob: Option<Vec<u8>> =
		sqlx::query_scalar("SELECT embedding FROM memories_vec WHERE id = ?")
			.bind(id)
			.fetch_optional(conn)
			.await?;

	blob.map(|raw| vector::decode(&raw)).transpose()
}

/// Bumps `access_count` once per distinct id and stamps `last_accessed`.
pub async fn record_access(
	conn: &mut SqliteConnection,
	ids: &[&str],
	now: OffsetDateTime,
) -> Result<u64> {
	let stamp = timestamp::format(now)?;
	let mut touched = 0;

	for batch in ids.chunks(MAX_BATCH_IDS) {
		let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
			"UPDATE memories SET access_count = access_count + 1, last_accessed = ",
		);

		builder.push_bind(stamp.as_str());
		builder.push(" WHERE id IN (");

		let mut separated = builder.separated(", ");

		for id in batch {
			separated.push_bind(*id);
		}

		separated.push_unseparated(")");

		touched += builder.build().execute(&mut *conn).await?.rows_affected();
	}

	Ok(touched)
}
