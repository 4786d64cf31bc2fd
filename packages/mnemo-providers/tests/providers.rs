use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use mnemo_config::EmbeddingProviderConfig;
use mnemo_providers::Error;

fn provider(query_instruction: Option<&str>) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: String::new(),
		path: "/v1/embeddings".to_string(),
		model: "test-embed".to_string(),
		dimensions: 3,
		timeout_ms: 500,
		query_instruction: query_instruction.map(str::to_string),
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		mnemo_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn empty_api_key_sends_no_authorization() {
	let headers =
		mnemo_providers::auth_headers("", &Map::new()).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn non_string_default_header_is_rejected() {
	let mut extra = Map::new();

	extra.insert("x-team".to_string(), Value::from(7));

	let err = mnemo_providers::auth_headers("secret", &extra)
		.expect_err("Expected invalid header config.");

	assert!(matches!(err, Error::InvalidConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn query_instruction_prefixes_queries() {
	assert_eq!(
		mnemo_providers::embedding::query_text(&provider(Some("Find notes")), "rust"),
		"Instruct: Find notes\nQuery: rust"
	);
	assert_eq!(mnemo_providers::embedding::query_text(&provider(None), "rust"), "rust");
}

#[tokio::test]
async fn empty_batch_skips_the_network() {
	let vectors = mnemo_providers::embedding::embed(&provider(None), &[])
		.await
		.expect("Empty batch must not fail.");

	assert!(vectors.is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
	let err = mnemo_providers::embedding::embed(&provider(None), &["hello".to_string()])
		.await
		.expect_err("Expected a transport error.");

	assert!(matches!(err, Error::Reqwest(_)), "Unexpected error: {err:?}");
}
