use serde::{Deserialize, Serialize};

use crate::{MemoryItem, MnemoService, Result};
use mnemo_storage::queries;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub offset: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
	pub items: Vec<MemoryItem>,
}

impl MnemoService {
	/// Most recently updated first.
	pub async fn list(&self, req: ListRequest) -> Result<ListResponse> {
		let category = req.category.as_deref().map(str::trim).filter(|value| !value.is_empty());
		let limit = req.limit.unwrap_or(self.cfg.search.default_list_limit);
		let offset = req.offset.unwrap_or(0);
		let mut conn = self.db.pool.acquire().await?;
		let memories = queries::list_memories(&mut *conn, category, limit, offset).await?;

		Ok(ListResponse { items: memories.into_iter().map(MemoryItem::from).collect() })
	}
}
