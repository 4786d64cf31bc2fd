use serde::{Deserialize, Serialize};

use crate::{MnemoService, Result};
use mnemo_storage::{models::Memory, queries, timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRequest {
	pub content: String,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddResponse {
	pub id: String,
}

impl MnemoService {
	pub async fn add(&self, req: AddRequest) -> Result<AddResponse> {
		let embedding = self.document_embedding(&req.content, req.embedding).await?;
		let now = timestamp::now();
		let memory = Memory {
			id: crate::new_memory_id(),
			content: req.content,
			category: crate::normalize_category(req.category),
			tags: crate::normalize_tags(req.tags.unwrap_or_default()),
			source: req.source,
			created_at: now,
			updated_at: now,
			access_count: 0,
			last_accessed: now,
		};
		let mut tx = self.db.begin_write().await?;

		queries::insert_memory(&mut *tx, &memory).await?;

		if let Some(embedding) = embedding.as_deref() {
			queries::replace_embedding(&mut *tx, &memory.id, embedding).await?;
		}

		tx.commit().await?;

		tracing::debug!(
			id = %memory.id,
			category = %memory.category,
			embedded = embedding.is_some(),
			"Memory added."
		);

		Ok(AddResponse { id: memory.id })
	}
}
