use serde::{Deserialize, Serialize};

use crate::{MnemoService, Result};
use mnemo_storage::queries;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub id: String,
	pub deleted: bool,
}

impl MnemoService {
	/// Removes the record with its lexical and vector entries in one statement.
	pub async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
		let id = req.id.trim().to_string();
		let mut conn = self.db.pool.acquire().await?;
		let deleted = queries::delete_memory(&mut *conn, &id).await?;

		if deleted {
			tracing::debug!(id = %id, "Memory deleted.");
		}

		Ok(DeleteResponse { id, deleted })
	}
}
