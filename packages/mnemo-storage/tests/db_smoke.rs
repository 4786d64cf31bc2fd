use mnemo_storage::{
	Error,
	db::Db,
	models::{Memory, MemoryPatch},
	queries,
	retrieval::{self, Filters},
	timestamp,
};
use mnemo_testkit::TestStore;

fn memory(id: &str, content: &str, category: &str, tags: &[&str]) -> Memory {
	let now = timestamp::now();

	Memory {
		id: id.to_string(),
		content: content.to_string(),
		category: category.to_string(),
		tags: tags.iter().map(|tag| tag.to_string()).collect(),
		source: None,
		created_at: now,
		updated_at: now,
		access_count: 0,
		last_accessed: now,
	}
}

async fn open(store: &TestStore, vector_dim: u32) -> Db {
	let db = Db::connect(&store.storage(vector_dim)).await.expect("Failed to open store.");

	db.ensure_schema(vector_dim).await.expect("Failed to ensure schema.");

	db
}

async fn matching_ids(db: &Db, expr: &str) -> Vec<String> {
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let hits = retrieval::lexical_candidates(&mut conn, expr, Filters::default(), 50)
		.await
		.expect("Failed to run lexical query.");

	hits.into_iter().map(|hit| hit.memory.id).collect()
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 0).await;

	assert_eq!(db.ensure_schema(0).await.expect("Failed to re-run schema."), 0);

	let tables: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM sqlite_master WHERE name IN ('memories', 'memories_fts', 'mnemo_meta')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to inspect schema.");
	let vec_tables: i64 =
		sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'memories_vec'")
			.fetch_one(&db.pool)
			.await
			.expect("Failed to inspect schema.");

	assert_eq!(tables, 3);
	assert_eq!(vec_tables, 0);

	let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to read journal mode.");

	assert_eq!(journal_mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn lexical_index_tracks_every_write() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 0).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	queries::insert_memory(&mut conn, &memory("a1", "Walrus migration notes", "general", &[]))
		.await
		.expect("Failed to insert memory.");

	drop(conn);

	assert_eq!(matching_ids(&db, "\"walrus\"*").await, vec!["a1".to_string()]);

	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let patch = MemoryPatch { content: Some("Penguin colony notes"), ..Default::default() };
	let updated = queries::update_memory(&mut conn, "a1", &patch, timestamp::now())
		.await
		.expect("Failed to update memory.");

	drop(conn);

	assert!(updated);
	assert!(matching_ids(&db, "\"walrus\"*").await.is_empty());
	assert_eq!(matching_ids(&db, "\"penguin\"*").await, vec!["a1".to_string()]);

	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let deleted = queries::delete_memory(&mut conn, "a1").await.expect("Failed to delete memory.");

	drop(conn);

	assert!(deleted);
	assert!(matching_ids(&db, "\"penguin\"*").await.is_empty());
}

#[tokio::test]
async fn access_bookkeeping_does_not_disturb_the_index() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 0).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	queries::insert_memory(&mut conn, &memory("b1", "Quarterly report draft", "work", &[]))
		.await
		.expect("Failed to insert memory.");

	let touched = queries::record_access(&mut conn, &["b1", "missing"], timestamp::now())
		.await
		.expect("Failed to record access.");
	let fetched = queries::fetch_memory(&mut conn, "b1")
		.await
		.expect("Failed to fetch memory.")
		.expect("Memory must exist.");

	drop(conn);

	assert_eq!(touched, 1);
	assert_eq!(fetched.access_count, 1);
	assert_eq!(matching_ids(&db, "\"quarterly\"*").await, vec!["b1".to_string()]);
}

#[tokio::test]
async fn filters_are_applied_inside_candidate_queries() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 0).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	for i in 0..30 {
		let tags: &[&str] = if i >= 25 { &["target"] } else { &["other"] };

		queries::insert_memory(
			&mut conn,
			&memory(&format!("c{i:02}"), "common filler text", "general", tags),
		)
		.await
		.expect("Failed to insert memory.");
	}

	let tags = vec!["target".to_string(), "absent".to_string()];
	let hits = retrieval::lexical_candidates(
		&mut conn,
		"\"common\"*",
		Filters { category: None, tags: &tags },
		3,
	)
	.await
	.expect("Failed to run lexical query.");

	assert_eq!(hits.len(), 3);
	assert!(hits.iter().all(|hit| hit.memory.tags == vec!["target".to_string()]));

	let hits = retrieval::lexical_candidates(
		&mut conn,
		"\"common\"*",
		Filters { category: Some("work"), tags: &[] },
		10,
	)
	.await
	.expect("Failed to run lexical query.");

	assert!(hits.is_empty());
}

#[tokio::test]
async fn malformed_match_expression_is_a_database_error() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 0).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let err = retrieval::lexical_candidates(&mut conn, "\"unterminated", Filters::default(), 5)
		.await
		.expect_err("Expected an FTS5 syntax error.");

	assert!(matches!(err, Error::Sqlx(sqlx::Error::Database(_))), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn vector_rows_follow_their_record() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 3).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	queries::insert_memory(&mut conn, &memory("v1", "x axis", "general", &[]))
		.await
		.expect("Failed to insert memory.");
	queries::insert_memory(&mut conn, &memory("v2", "y axis", "general", &[]))
		.await
		.expect("Failed to insert memory.");
	queries::replace_embedding(&mut conn, "v1", &[1.0, 0.0, 0.0])
		.await
		.expect("Failed to store embedding.");
	queries::replace_embedding(&mut conn, "v2", &[0.0, 1.0, 0.0])
		.await
		.expect("Failed to store embedding.");

	let hits = retrieval::vector_candidates(&mut conn, &[0.1, 0.9, 0.0], Filters::default(), 10)
		.await
		.expect("Failed to run vector query.");
	let ids = hits.iter().map(|hit| hit.memory.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["v2", "v1"]);

	queries::delete_memory(&mut conn, "v1").await.expect("Failed to delete memory.");

	let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memories_vec")
		.fetch_one(&mut *conn)
		.await
		.expect("Failed to count vectors.");

	assert_eq!(remaining, 1);
	assert!(
		queries::fetch_embedding(&mut conn, "v1").await.expect("Failed to read vector.").is_none()
	);
}

#[tokio::test]
async fn vector_dimension_is_frozen_on_creation() {
	let store = TestStore::new().expect("Failed to create test store.");
	let db = open(&store, 3).await;
	let err = db.ensure_schema(4).await.expect_err("Expected a dimension conflict.");

	assert!(matches!(err, Error::Conflict(_)), "Unexpected error: {err:?}");
	assert_eq!(db.ensure_schema(3).await.expect("Failed to reopen with frozen dim."), 3);
	assert_eq!(db.ensure_schema(0).await.expect("Failed to open lexical-only."), 0);
}

#[tokio::test]
async fn snapshot_must_exist() {
	let store = TestStore::new().expect("Failed to create test store.");
	let missing = store.sibling("remote.db").expect("Failed to build sibling path.");
	let result = Db::connect_snapshot(&missing).await;

	assert!(matches!(result, Err(Error::NotFound(_))));
}
