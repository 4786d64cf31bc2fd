use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{MnemoService, Result};
use mnemo_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryStat {
	pub category: String,
	pub count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsResponse {
	pub total_memories: i64,
	/// Largest category first.
	pub categories: Vec<CategoryStat>,
	#[serde(with = "crate::time_serde::option")]
	pub last_updated: Option<OffsetDateTime>,
	pub vector_enabled: bool,
	pub vector_dim: u32,
	pub db_path: PathBuf,
}

impl MnemoService {
	pub async fn stats(&self) -> Result<StatsResponse> {
		let mut conn = self.db.pool.acquire().await?;
		let total_memories = queries::count_memories(&mut *conn).await?;
		let categories = queries::category_counts(&mut *conn)
			.await?
			.into_iter()
			.map(|row| CategoryStat { category: row.category, count: row.count })
			.collect();
		let last_updated = queries::last_updated(&mut *conn).await?;

		Ok(StatsResponse {
			total_memories,
			categories,
			last_updated,
			vector_enabled: self.vector_enabled(),
			vector_dim: self.vector_dim(),
			db_path: self.db.path().to_path_buf(),
		})
	}
}
