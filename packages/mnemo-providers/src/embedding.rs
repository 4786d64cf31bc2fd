//! OpenAI-compatible embedding client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Embeds `texts` in one request and returns one vector per input, in input order, each fitted
/// to `cfg.dimensions` components.
pub async fn embed(
	cfg: &mnemo_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	check_count(&vectors, texts.len())?;

	let dimensions = cfg.dimensions as usize;

	Ok(vectors.into_iter().map(|vector| fit_dimensions(vector, dimensions)).collect())
}

/// Query-side input for instruction-aware models. Documents are embedded as-is.
pub fn query_text(cfg: &mnemo_config::EmbeddingProviderConfig, query: &str) -> String {
	match cfg.query_instruction.as_deref() {
		Some(instruction) => format!("Instruct: {instruction}\nQuery: {query}"),
		None => query.to_string(),
	}
}

/// Zero-pads or truncates `vector` to exactly `dimensions` components.
pub fn fit_dimensions(mut vector: Vec<f32>, dimensions: usize) -> Vec<f32> {
	vector.resize(dimensions, 0.0);

	vector
}

fn check_count(vectors: &[Vec<f32>], expected_len: usize) -> Result<()> {
	if vectors.len() != expected_len {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response has {} vectors for {expected_len} inputs.",
				vectors.len()
			),
		});
	}

	Ok(())
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(Value::as_array).ok_or_else(|| Error::InvalidResponse {
		message: "Embedding response is missing data array.".to_string(),
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(Value::as_u64)
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding =
			item.get("embedding").and_then(Value::as_array).ok_or_else(|| {
				Error::InvalidResponse {
					message: "Embedding item is missing embedding array.".to_string(),
				}
			})?;
		let mut vector = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vector.push(number as f32);
		}

		indexed.push((index, vector));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
