use serde::{Deserialize, Serialize};

use crate::{MemoryItem, MnemoService, Result};
use mnemo_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetRequest {
	pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetResponse {
	/// `None` when the id is unknown.
	pub memory: Option<MemoryItem>,
}

impl MnemoService {
	pub async fn get(&self, req: GetRequest) -> Result<GetResponse> {
		let mut conn = self.db.pool.acquire().await?;
		let memory = queries::fetch_memory(&mut *conn, req.id.trim()).await?;

		Ok(GetResponse { memory: memory.map(MemoryItem::from) })
	}
}
