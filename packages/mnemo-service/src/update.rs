use serde::{Deserialize, Serialize};

use crate::{MnemoService, Result};
use mnemo_storage::{models::MemoryPatch, queries, timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
	pub id: String,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	/// Replaces the stored vector. An empty list counts as absent.
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
	pub id: String,
	pub updated: bool,
}

impl MnemoService {
	/// Applies only the supplied fields. Unknown ids report `updated = false` and change nothing.
	pub async fn update(&self, req: UpdateRequest) -> Result<UpdateResponse> {
		let id = req.id.trim().to_string();

		if !self.memory_exists(&id).await? {
			return Ok(UpdateResponse { id, updated: false });
		}

		let embedding = match (req.content.as_deref(), req.embedding) {
			(_, Some(supplied)) if !supplied.is_empty() =>
				self.document_embedding("", Some(supplied)).await?,
			(Some(content), _) => self.document_embedding(content, None).await?,
			(None, _) => None,
		};
		let category = req.category.map(|category| crate::normalize_category(Some(category)));
		let tags = req.tags.map(crate::normalize_tags);
		let patch = MemoryPatch {
			content: req.content.as_deref(),
			category: category.as_deref(),
			tags: tags.as_deref(),
		};
		let mut tx = self.db.begin_write().await?;
		let updated = queries::update_memory(&mut *tx, &id, &patch, timestamp::now()).await?;

		if !updated {
			tx.rollback().await?;

			return Ok(UpdateResponse { id, updated: false });
		}
		if let Some(embedding) = embedding.as_deref() {
			queries::replace_embedding(&mut *tx, &id, embedding).await?;
		}

		tx.commit().await?;

		tracing::debug!(id = %id, embedded = embedding.is_some(), "Memory updated.");

		Ok(UpdateResponse { id, updated: true })
	}

	async fn memory_exists(&self, id: &str) -> Result<bool> {
		let mut conn = self.db.pool.acquire().await?;

		Ok(queries::memory_exists(&mut *conn, id).await?)
	}
}
