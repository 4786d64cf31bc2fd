mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Providers, Ranking, RankingWeights, Search, Service, Storage,
};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.db_path.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "storage.db_path must be non-empty.".to_string(),
		});
	}
	if cfg.storage.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_list_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_list_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.candidate_multiplier == 0 {
		return Err(Error::Validation {
			message: "search.candidate_multiplier must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.rrf_k.is_finite() || cfg.search.rrf_k <= 0.0 {
		return Err(Error::Validation {
			message: "search.rrf_k must be a finite number greater than zero.".to_string(),
		});
	}
	if !cfg.ranking.recency_half_life_days.is_finite()
		|| cfg.ranking.recency_half_life_days <= 0.0
	{
		return Err(Error::Validation {
			message: "ranking.recency_half_life_days must be a finite number greater than zero."
				.to_string(),
		});
	}

	validate_weights("ranking.hybrid", &cfg.ranking.hybrid)?;
	validate_weights("ranking.lexical_only", &cfg.ranking.lexical_only)?;

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if cfg.storage.vector_dim == 0 {
			return Err(Error::Validation {
				message: "storage.vector_dim must be greater than zero when providers.embedding is configured."
					.to_string(),
			});
		}
		if embedding.dimensions != cfg.storage.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.vector_dim."
					.to_string(),
			});
		}
		if embedding.api_base.trim().is_empty() || embedding.model.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.api_base and providers.embedding.model must be non-empty."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn validate_weights(section: &str, weights: &RankingWeights) -> Result<()> {
	let values = [
		("relevance", weights.relevance),
		("recency", weights.recency),
		("frequency", weights.frequency),
	];

	for (name, value) in values {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{section}.{name} must be a finite number, zero or greater."),
			});
		}
	}

	if weights.relevance + weights.recency + weights.frequency <= 0.0 {
		return Err(Error::Validation {
			message: format!("{section} weights must sum to a positive value."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.http_bind = cfg.service.http_bind.trim().to_string();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.storage.db_path = expand_home(&cfg.storage.db_path, env::var_os("HOME").map(PathBuf::from));

	if let Some(embedding) = cfg.providers.embedding.as_mut()
		&& embedding.query_instruction.as_deref().is_some_and(|value| value.trim().is_empty())
	{
		embedding.query_instruction = None;
	}
}

fn expand_home(path: &Path, home: Option<PathBuf>) -> PathBuf {
	let Some(home) = home else { return path.to_path_buf() };

	if path == Path::new("~") {
		return home;
	}

	match path.strip_prefix("~") {
		Ok(rest) => home.join(rest),
		Err(_) => path.to_path_buf(),
	}
}
