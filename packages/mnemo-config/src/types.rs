use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub providers: Providers,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	/// `~/` is expanded against `$HOME` during normalization.
	#[serde(default = "default_db_path")]
	pub db_path: PathBuf,
	#[serde(default = "default_pool_max_conns")]
	pub pool_max_conns: u32,
	#[serde(default = "default_busy_timeout_ms")]
	pub busy_timeout_ms: u64,
	/// Zero disables the vector index and search runs lexical-only.
	#[serde(default)]
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub default_list_limit: u32,
	/// Each retrieval stage keeps `limit * candidate_multiplier` candidates.
	pub candidate_multiplier: u32,
	pub rrf_k: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_limit: 5, default_list_limit: 20, candidate_multiplier: 4, rrf_k: 60.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub recency_half_life_days: f32,
	/// Used when a vector signal took part in the search.
	pub hybrid: RankingWeights,
	pub lexical_only: RankingWeights,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			recency_half_life_days: 7.0,
			hybrid: RankingWeights { relevance: 0.7, recency: 0.2, frequency: 0.1 },
			lexical_only: RankingWeights { relevance: 0.6, recency: 0.3, frequency: 0.1 },
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RankingWeights {
	pub relevance: f32,
	pub recency: f32,
	pub frequency: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Providers {
	pub embedding: Option<EmbeddingProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	/// Instruction prepended to search queries for instruction-aware models.
	pub query_instruction: Option<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_db_path() -> PathBuf {
	PathBuf::from("~/.mnemo/memories.db")
}

fn default_pool_max_conns() -> u32 {
	4
}

fn default_busy_timeout_ms() -> u64 {
	5_000
}
