//! JSONL export and import, and reconciliation of a synced snapshot file.

use std::{path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, MemoryItem, MnemoService, Result};
use mnemo_storage::{
	db::Db,
	models::{DEFAULT_CATEGORY, Memory},
	queries, timestamp,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
	/// Keeps existing records; incoming duplicates are skipped.
	#[default]
	Merge,
	/// Clears the store before importing.
	Replace,
}
impl ImportMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Merge => "merge",
			Self::Replace => "replace",
		}
	}
}
impl FromStr for ImportMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"merge" => Ok(Self::Merge),
			"replace" => Ok(Self::Replace),
			other => Err(Error::validation(
				"mode",
				format!("Unknown import mode {other:?}; expected merge or replace."),
			)),
		}
	}
}

/// Either a JSONL payload or a list of record objects.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportData {
	Jsonl(String),
	Records(Vec<Value>),
}
impl ImportData {
	fn into_jsonl(self) -> Result<String> {
		match self {
			Self::Jsonl(data) => Ok(data),
			Self::Records(records) => {
				let mut lines = Vec::with_capacity(records.len());

				for record in &records {
					let line = serde_json::to_string(record).map_err(|err| Error::InvalidRequest {
						message: format!("Record cannot be encoded: {err}."),
					})?;

					lines.push(line);
				}

				Ok(lines.join("\n"))
			},
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRequest {
	pub data: ImportData,
	/// `merge` when absent.
	#[serde(default)]
	pub mode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLineError {
	/// 1-based.
	pub line: usize,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportResponse {
	pub imported: u64,
	pub skipped: u64,
	pub errors: Vec<ImportLineError>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportResponse {
	pub count: usize,
	/// One record per line in creation order; empty for an empty store.
	pub data: String,
}

impl MnemoService {
	pub async fn export(&self) -> Result<ExportResponse> {
		let mut conn = self.db.pool.acquire().await?;
		let memories = queries::export_memories(&mut *conn).await?;

		Ok(ExportResponse { count: memories.len(), data: render_jsonl(memories)? })
	}

	/// Imports every valid line in one transaction. Bad lines are reported and skipped.
	pub async fn import(&self, req: ImportRequest) -> Result<ImportResponse> {
		let mode = match req.mode.as_deref() {
			Some(raw) => ImportMode::from_str(raw)?,
			None => ImportMode::default(),
		};
		let data = req.data.into_jsonl()?;
		let now = timestamp::now();
		let mut response = ImportResponse::default();
		let mut tx = self.db.begin_write().await?;

		if mode == ImportMode::Replace {
			let cleared = queries::clear_memories(&mut *tx, self.vector_enabled()).await?;

			tracing::info!(cleared, "Cleared store before replace import.");
		}

		for (index, raw) in data.lines().enumerate() {
			let line = index + 1;
			let raw = raw.trim();

			if raw.is_empty() {
				continue;
			}

			let value = match serde_json::from_str::<Value>(raw) {
				Ok(value) => value,
				Err(err) => {
					response.errors.push(ImportLineError {
						line,
						field: None,
						message: format!("Invalid JSON: {err}."),
					});

					continue;
				},
			};
			let memory = match parse_record(value, now) {
				Ok(memory) => memory,
				Err(invalid) => {
					response.errors.push(ImportLineError {
						line,
						field: invalid.field.map(str::to_string),
						message: invalid.message,
					});

					continue;
				},
			};

			match mode {
				ImportMode::Merge => {
					if queries::memory_exists(&mut *tx, &memory.id).await? {
						response.skipped += 1;

						continue;
					}

					queries::insert_memory(&mut *tx, &memory).await?;
				},
				ImportMode::Replace => queries::upsert_memory(&mut *tx, &memory).await?,
			}

			response.imported += 1;
		}

		tx.commit().await?;

		tracing::info!(
			mode = mode.as_str(),
			imported = response.imported,
			skipped = response.skipped,
			errors = response.errors.len(),
			"Import finished."
		);

		Ok(response)
	}

	/// Merges a snapshot store file into this store. Records already present locally win.
	pub async fn merge_snapshot(&self, path: &Path) -> Result<ImportResponse> {
		let snapshot = Db::connect_snapshot(path).await?;
		let memories = {
			let mut conn = snapshot.pool.acquire().await?;

			queries::export_memories(&mut *conn).await?
		};

		snapshot.pool.close().await;

		tracing::info!(path = %path.display(), records = memories.len(), "Merging snapshot.");

		self.import(ImportRequest {
			data: ImportData::Jsonl(render_jsonl(memories)?),
			mode: Some(ImportMode::Merge.as_str().to_string()),
		})
		.await
	}
}

#[derive(Debug)]
struct InvalidLine {
	field: Option<&'static str>,
	message: String,
}
impl InvalidLine {
	fn field(field: &'static str, message: impl Into<String>) -> Self {
		Self { field: Some(field), message: message.into() }
	}
}

fn render_jsonl(memories: Vec<Memory>) -> Result<String> {
	let mut lines = Vec::with_capacity(memories.len());

	for memory in memories {
		let line = serde_json::to_string(&MemoryItem::from(memory)).map_err(|err| {
			Error::Storage { message: format!("Record cannot be encoded: {err}.") }
		})?;

		lines.push(line);
	}

	Ok(lines.join("\n"))
}

fn parse_record(value: Value, now: OffsetDateTime) -> std::result::Result<Memory, InvalidLine> {
	let Value::Object(record) = value else {
		return Err(InvalidLine { field: None, message: "Line is not a JSON object.".to_string() });
	};
	let content = match record.get("content") {
		Some(Value::String(content)) => content.clone(),
		Some(_) => return Err(InvalidLine::field("content", "content must be a string.")),
		None => return Err(InvalidLine::field("content", "content is required.")),
	};
	let id = match optional_string(&record, "id")? {
		Some(id) if !id.trim().is_empty() => id.trim().to_string(),
		Some(_) => return Err(InvalidLine::field("id", "id must not be blank.")),
		None => crate::new_memory_id(),
	};
	let category = optional_string(&record, "category")?
		.map(|category| crate::normalize_category(Some(category)))
		.unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

	Ok(Memory {
		id,
		content,
		category,
		tags: parse_tags(record.get("tags"))?,
		source: optional_string(&record, "source")?,
		created_at: parse_timestamp(&record, "created_at", now)?,
		updated_at: parse_timestamp(&record, "updated_at", now)?,
		access_count: parse_access_count(record.get("access_count"))?,
		last_accessed: parse_timestamp(&record, "last_accessed", now)?,
	})
}

fn optional_string(
	record: &Map<String, Value>,
	field: &'static str,
) -> std::result::Result<Option<String>, InvalidLine> {
	match record.get(field) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(value)) => Ok(Some(value.clone())),
		Some(_) => Err(InvalidLine::field(field, format!("{field} must be a string."))),
	}
}

/// Accepts a list of strings or a string holding a JSON-encoded list.
fn parse_tags(value: Option<&Value>) -> std::result::Result<Vec<String>, InvalidLine> {
	let decoded;
	let items = match value {
		None | Some(Value::Null) => return Ok(Vec::new()),
		Some(Value::Array(items)) => items,
		Some(Value::String(raw)) => {
			decoded = serde_json::from_str::<Value>(raw).map_err(|_| {
				InvalidLine::field("tags", "tags string must hold a JSON list.")
			})?;

			match &decoded {
				Value::Array(items) => items,
				_ => return Err(InvalidLine::field("tags", "tags string must hold a JSON list.")),
			}
		},
		Some(_) => return Err(InvalidLine::field("tags", "tags must be a list of strings.")),
	};

	items
		.iter()
		.map(|item| {
			item.as_str()
				.map(str::to_string)
				.ok_or_else(|| InvalidLine::field("tags", "tags must be a list of strings."))
		})
		.collect()
}

fn parse_timestamp(
	record: &Map<String, Value>,
	field: &'static str,
	now: OffsetDateTime,
) -> std::result::Result<OffsetDateTime, InvalidLine> {
	match optional_string(record, field)? {
		Some(raw) => timestamp::parse(&raw)
			.map_err(|err| InvalidLine::field(field, format!("{field} is not RFC 3339: {err}."))),
		None => Ok(now),
	}
}

fn parse_access_count(value: Option<&Value>) -> std::result::Result<i64, InvalidLine> {
	match value {
		None | Some(Value::Null) => Ok(0),
		Some(value) => value.as_i64().filter(|count| *count >= 0).ok_or_else(|| {
			InvalidLine::field("access_count", "access_count must be a non-negative integer.")
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(raw: &str) -> std::result::Result<Memory, InvalidLine> {
		let value = serde_json::from_str(raw).expect("Failed to parse test JSON.");

		parse_record(value, timestamp::now())
	}

	#[test]
	fn defaults_fill_missing_fields() {
		let memory = parse(r#"{"content":"bare"}"#).expect("Failed to parse record.");

		assert_eq!(memory.id.len(), 32);
		assert_eq!(memory.category, "general");
		assert!(memory.tags.is_empty());
		assert_eq!(memory.access_count, 0);
		assert_eq!(memory.created_at, memory.updated_at);
	}

	#[test]
	fn tags_accept_encoded_lists() {
		let memory =
			parse(r#"{"content":"x","tags":"[\"a\",\"b\"]"}"#).expect("Failed to parse record.");

		assert_eq!(memory.tags, vec!["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn invalid_fields_are_named() {
		let cases = [
			(r#"{"id":"x"}"#, "content"),
			(r#"{"content":1}"#, "content"),
			(r#"{"content":"x","id":7}"#, "id"),
			(r#"{"content":"x","tags":[1]}"#, "tags"),
			(r#"{"content":"x","tags":"nope"}"#, "tags"),
			(r#"{"content":"x","created_at":"yesterday"}"#, "created_at"),
			(r#"{"content":"x","access_count":-1}"#, "access_count"),
		];

		for (raw, field) in cases {
			let invalid = parse(raw).err().unwrap_or_else(|| panic!("Expected {raw} to fail."));

			assert_eq!(invalid.field, Some(field), "Wrong field for {raw}.");
		}
	}

	#[test]
	fn non_objects_have_no_field() {
		let invalid = parse("[1, 2]").err().expect("Expected a non-object to fail.");

		assert!(invalid.field.is_none());
	}

	#[test]
	fn unknown_mode_is_a_validation_error() {
		let err = ImportMode::from_str("upsert").expect_err("Expected an unknown mode.");

		assert!(matches!(err, Error::Validation { ref field, .. } if field == "mode"));
		assert_eq!(ImportMode::from_str(" replace ").ok(), Some(ImportMode::Replace));
	}
}
