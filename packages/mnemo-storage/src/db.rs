use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use sqlx::{
	Sqlite, SqliteConnection, SqlitePool, Transaction,
	sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::{Error, Result, schema};

pub struct Db {
	pub pool: SqlitePool,
	path: PathBuf,
}
impl Db {
	/// Opens (creating if needed) the store at `cfg.db_path` in WAL mode.
	pub async fn connect(cfg: &mnemo_config::Storage) -> Result<Self> {
		if let Some(parent) = cfg.db_path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent)?;
		}

		let options = SqliteConnectOptions::new()
			.filename(&cfg.db_path)
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal)
			.synchronous(SqliteSynchronous::Normal)
			.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));
		let pool = SqlitePoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.connect_with(options)
			.await?;

		Ok(Self { pool, path: cfg.db_path.clone() })
	}

	/// Opens an existing store file without creating it.
	pub async fn connect_snapshot(path: &Path) -> Result<Self> {
		if !path.is_file() {
			return Err(Error::NotFound(format!("Snapshot {} does not exist.", path.display())));
		}

		let options = SqliteConnectOptions::new().filename(path).create_if_missing(false);
		let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;

		Ok(Self { pool, path: path.to_path_buf() })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Starts a transaction holding the write lock (`BEGIN IMMEDIATE`). Any transaction that
	/// reads before it writes must start here: upgrading a deferred read transaction under WAL
	/// fails with `SQLITE_BUSY` without waiting on the busy timeout.
	pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
		Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
	}

	/// Creates missing tables, indexes, and triggers, and returns the active vector dimension.
	///
	/// `vector_dim = 0` keeps search lexical-only. The first non-zero dimension is frozen in
	/// `mnemo_meta`; reopening with a different one is a conflict.
	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<u32> {
		let mut tx = self.begin_write().await?;

		for statement in schema::core_statements() {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		let frozen = frozen_vector_dim(&mut *tx).await?;

		if vector_dim == 0 {
			tx.commit().await?;

			if let Some(frozen) = frozen {
				tracing::info!(frozen, "Vector index exists but vector search is disabled.");
			}

			return Ok(0);
		}

		match frozen {
			Some(frozen) if frozen != vector_dim => {
				return Err(Error::Conflict(format!(
					"Vector index dimension is frozen at {frozen}; configured {vector_dim}."
				)));
			},
			Some(_) => {},
			None => {
				sqlx::query("INSERT INTO mnemo_meta (key, value) VALUES (?, ?)")
					.bind(schema::META_VECTOR_DIM)
					.bind(vector_dim.to_string())
					.execute(&mut *tx)
					.await?;
			},
		}

		for statement in schema::vector_statements() {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(vector_dim)
	}
}

async fn frozen_vector_dim(conn: &mut SqliteConnection) -> Result<Option<u32>> {
	let raw: Option<String> = sqlx::query_scalar("SELECT value FROM mnemo_meta WHERE key = ?")
		.bind(schema::META_VECTOR_DIM)
		.fetch_optional(conn)
		.await?;

	raw.map(|value| {
		value
			.parse::<u32>()
			.map_err(|_| Error::Malformed(format!("mnemo_meta.vector_dim {value:?} is not a u32.")))
	})
	.transpose()
}
