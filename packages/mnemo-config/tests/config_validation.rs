use std::{fs, path::PathBuf};

use tempfile::TempDir;
use toml::Value;

use mnemo_config::Error;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn set_key(value: &mut Value, section: &[&str], key: &str, item: Value) {
	let mut table = value.as_table_mut().expect("Template config must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{name}]."));
	}

	table.insert(key.to_string(), item);
}

fn write_config(dir: &TempDir, value: &Value) -> PathBuf {
	let path = dir.path().join("mnemo.toml");
	let payload = toml::to_string(value).expect("Failed to render template config.");

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_err(value: &Value) -> String {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = write_config(&dir, value);
	let err = mnemo_config::load(&path).expect_err("Expected validation error.");

	err.to_string()
}

#[test]
fn template_config_loads_and_normalizes() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = write_config(&dir, &sample_value());
	let cfg = mnemo_config::load(&path).expect("Failed to load template config.");

	assert_eq!(cfg.storage.vector_dim, 3);
	assert_eq!(cfg.search.candidate_multiplier, 4);

	let embedding = cfg.providers.embedding.expect("Embedding provider must be configured.");

	assert_eq!(embedding.dimensions, 3);
	assert!(embedding.query_instruction.is_none());
}

#[test]
fn minimal_config_uses_engine_defaults() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("minimal.toml");

	fs::write(
		&path,
		"[service]\nhttp_bind = \"127.0.0.1:0\"\n\n[storage]\ndb_path = \"/tmp/m.db\"\n",
	)
	.expect("Failed to write test config.");

	let cfg = mnemo_config::load(&path).expect("Failed to load minimal config.");

	assert_eq!(cfg.service.log_level, "info");
	assert_eq!(cfg.storage.vector_dim, 0);
	assert_eq!(cfg.storage.busy_timeout_ms, 5_000);
	assert_eq!(cfg.search.default_limit, 5);
	assert_eq!(cfg.search.rrf_k, 60.0);
	assert_eq!(cfg.ranking.recency_half_life_days, 7.0);
	assert_eq!(cfg.ranking.hybrid.relevance, 0.7);
	assert_eq!(cfg.ranking.lexical_only.recency, 0.3);
	assert!(cfg.providers.embedding.is_none());
}

#[test]
fn candidate_multiplier_must_be_positive() {
	let mut value = sample_value();

	set_key(&mut value, &["search"], "candidate_multiplier", Value::Integer(0));

	let message = load_err(&value);

	assert!(
		message.contains("search.candidate_multiplier must be greater than zero."),
		"Unexpected error message: {message}"
	);
}

#[test]
fn negative_weights_are_rejected() {
	let mut value = sample_value();

	set_key(&mut value, &["ranking", "hybrid"], "recency", Value::Float(-0.1));

	let message = load_err(&value);

	assert!(message.contains("ranking.hybrid.recency"), "Unexpected error message: {message}");
}

#[test]
fn all_zero_weights_are_rejected() {
	let mut value = sample_value();

	for key in ["relevance", "recency", "frequency"] {
		set_key(&mut value, &["ranking", "lexical_only"], key, Value::Float(0.0));
	}

	let message = load_err(&value);

	assert!(
		message.contains("ranking.lexical_only weights must sum to a positive value."),
		"Unexpected error message: {message}"
	);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let mut value = sample_value();

	set_key(&mut value, &["providers", "embedding"], "dimensions", Value::Integer(8));

	let message = load_err(&value);

	assert!(
		message.contains("providers.embedding.dimensions must match storage.vector_dim."),
		"Unexpected error message: {message}"
	);
}

#[test]
fn embedding_provider_requires_vector_index() {
	let mut value = sample_value();

	set_key(&mut value, &["storage"], "vector_dim", Value::Integer(0));

	let message = load_err(&value);

	assert!(message.contains("storage.vector_dim"), "Unexpected error message: {message}");
}

#[test]
fn missing_file_reports_read_error() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let err = mnemo_config::load(&dir.path().join("absent.toml"))
		.expect_err("Expected read error for a missing file.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_toml_reports_parse_error() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("broken.toml");

	fs::write(&path, "[service\nhttp_bind = 1").expect("Failed to write test config.");

	let err = mnemo_config::load(&path).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err:?}");
}
