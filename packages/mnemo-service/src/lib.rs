pub mod add;
pub mod delete;
pub mod get;
pub mod list;
pub mod search;
pub mod stats;
pub mod time_serde;
pub mod transfer;
pub mod update;

mod error;

pub use add::{AddRequest, AddResponse};
pub use delete::{DeleteRequest, DeleteResponse};
pub use error::{Error, Result};
pub use get::{GetRequest, GetResponse};
pub use list::{ListRequest, ListResponse};
pub use search::{SearchItem, SearchRequest, SearchResponse};
pub use stats::{CategoryStat, StatsResponse};
pub use transfer::{
	ExportResponse, ImportData, ImportLineError, ImportMode, ImportRequest, ImportResponse,
};
pub use update::{UpdateRequest, UpdateResponse};

use std::{collections::HashSet, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mnemo_config::{Config, EmbeddingProviderConfig};
use mnemo_providers::embedding;
use mnemo_storage::{
	db::Db,
	models::{DEFAULT_CATEGORY, Memory},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which side of an asymmetric embedding model the text belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingKind {
	Document,
	Query,
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
		kind: EmbeddingKind,
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// A stored record as callers see it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
	pub id: String,
	pub content: String,
	pub category: String,
	pub tags: Vec<String>,
	pub source: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub access_count: i64,
	#[serde(with = "crate::time_serde")]
	pub last_accessed: OffsetDateTime,
}
impl From<Memory> for MemoryItem {
	fn from(memory: Memory) -> Self {
		Self {
			id: memory.id,
			content: memory.content,
			category: memory.category,
			tags: memory.tags,
			source: memory.source,
			created_at: memory.created_at,
			updated_at: memory.updated_at,
			access_count: memory.access_count,
			last_accessed: memory.last_accessed,
		}
	}
}

pub struct MnemoService {
	pub cfg: Config,
	pub db: Db,
	vector_dim: u32,
	embedder: Option<Arc<dyn EmbeddingProvider>>,
}
impl MnemoService {
	/// Prepares the schema on `db`. The vector dimension comes from `cfg.storage.vector_dim` and
	/// is frozen by the first store that enables it.
	pub async fn new(cfg: Config, db: Db) -> Result<Self> {
		let vector_dim = db.ensure_schema(cfg.storage.vector_dim).await?;
		let embedder = cfg.providers.embedding.clone().map(|provider| {
			Arc::new(HttpEmbedding { cfg: provider }) as Arc<dyn EmbeddingProvider>
		});

		Ok(Self { cfg, db, vector_dim, embedder })
	}

	pub async fn connect(cfg: Config) -> Result<Self> {
		let db = Db::connect(&cfg.storage).await?;

		Self::new(cfg, db).await
	}

	pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
		self.embedder = Some(embedder);

		self
	}

	pub fn vector_enabled(&self) -> bool {
		self.vector_dim > 0
	}

	pub fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	/// Embedding to store alongside `content`. A supplied vector wins over the provider.
	pub(crate) async fn document_embedding(
		&self,
		content: &str,
		supplied: Option<Vec<f32>>,
	) -> Result<Option<Vec<f32>>> {
		let supplied = supplied.filter(|vector| !vector.is_empty());

		if !self.vector_enabled() {
			if supplied.is_some() {
				tracing::debug!("Vector search is disabled; ignoring supplied embedding.");
			}

			return Ok(None);
		}
		if let Some(vector) = supplied {
			return self.check_dimension(vector).map(Some);
		}
		if content.trim().is_empty() {
			return Ok(None);
		}

		Ok(self.embed_text(content, EmbeddingKind::Document).await)
	}

	/// Embedding for a search query, or `None` when the search runs lexical-only.
	pub(crate) async fn query_embedding(
		&self,
		query: &str,
		supplied: Option<Vec<f32>>,
	) -> Result<Option<Vec<f32>>> {
		let supplied = supplied.filter(|vector| !vector.is_empty());

		if !self.vector_enabled() {
			if supplied.is_some() {
				tracing::debug!("Vector search is disabled; searching lexically.");
			}

			return Ok(None);
		}
		if let Some(vector) = supplied {
			return self.check_dimension(vector).map(Some);
		}
		if query.trim().is_empty() {
			return Ok(None);
		}

		Ok(self.embed_text(query, EmbeddingKind::Query).await)
	}

	fn check_dimension(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::validation(
				"embedding",
				format!("Expected {} dimensions, got {}.", self.vector_dim, vector.len()),
			));
		}

		Ok(vector)
	}

	async fn embed_text(&self, text: &str, kind: EmbeddingKind) -> Option<Vec<f32>> {
		let embedder = self.embedder.as_ref()?;
		let texts = vec![text.to_string()];

		match embedder.embed(&texts, kind).await {
			Ok(mut vectors) => vectors
				.pop()
				.map(|vector| embedding::fit_dimensions(vector, self.vector_dim as usize)),
			Err(err) => {
				tracing::warn!(
					error = %err,
					?kind,
					"Embedding failed; continuing without a vector."
				);

				None
			},
		}
	}
}

struct HttpEmbedding {
	cfg: EmbeddingProviderConfig,
}
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
		kind: EmbeddingKind,
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			let inputs = match kind {
				EmbeddingKind::Document => texts.to_vec(),
				EmbeddingKind::Query =>
					texts.iter().map(|text| embedding::query_text(&self.cfg, text)).collect(),
			};

			Ok(embedding::embed(&self.cfg, &inputs).await?)
		})
	}
}

/// 128 random bits as 32 lowercase hex characters.
pub(crate) fn new_memory_id() -> String {
	Uuid::new_v4().simple().to_string()
}

pub(crate) fn normalize_category(category: Option<String>) -> String {
	match category.as_deref().map(str::trim) {
		Some(value) if !value.is_empty() => value.to_string(),
		_ => DEFAULT_CATEGORY.to_string(),
	}
}

/// Trims tags and drops blanks and repeats, keeping first-seen order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
	let mut seen = HashSet::new();

	tags.into_iter()
		.map(|tag| tag.trim().to_string())
		.filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
		.collect()
}
