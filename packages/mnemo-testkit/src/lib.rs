mod error;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mnemo_config::{Config, Providers, Ranking, Search, Service, Storage};

/// A scratch directory holding one store file; removed on drop.
pub struct TestStore {
	dir: TempDir,
	path: PathBuf,
}
impl TestStore {
	pub fn new() -> Result<Self> {
		let dir = tempfile::Builder::new().prefix("mnemo_test_").tempdir()?;
		let path = dir.path().join("test.db");

		Ok(Self { dir, path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Another file path inside the same scratch directory.
	pub fn sibling(&self, name: &str) -> Result<PathBuf> {
		if name.is_empty() || name.contains(std::path::MAIN_SEPARATOR) {
			return Err(Error::Message(format!("Invalid sibling file name {name:?}.")));
		}

		Ok(self.dir.path().join(name))
	}

	pub fn storage(&self, vector_dim: u32) -> Storage {
		storage_at(&self.path, vector_dim)
	}

	pub fn config(&self, vector_dim: u32) -> Config {
		config_at(&self.path, vector_dim)
	}
}

pub fn storage_at(path: &Path, vector_dim: u32) -> Storage {
	Storage {
		db_path: path.to_path_buf(),
		pool_max_conns: 2,
		busy_timeout_ms: 5_000,
		vector_dim,
	}
}

pub fn config_at(path: &Path, vector_dim: u32) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: storage_at(path, vector_dim),
		search: Search::default(),
		ranking: Ranking::default(),
		providers: Providers::default(),
	}
}
