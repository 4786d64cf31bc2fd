use time::OffsetDateTime;

use crate::{Error, Result, timestamp};

pub const DEFAULT_CATEGORY: &str = "general";

/// Raw `memories` row as SQLite returns it.
#[derive(Debug, sqlx::FromRow)]
pub struct MemoryRow {
	pub seq: i64,
	pub id: String,
	pub content: String,
	pub category: String,
	pub tags: String,
	pub source: Option<String>,
	pub created_at: String,
	pub updated_at: String,
	pub access_count: i64,
	pub last_accessed: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
	pub id: String,
	pub content: String,
	pub category: String,
	pub tags: Vec<String>,
	pub source: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub access_count: i64,
	pub last_accessed: OffsetDateTime,
}
impl TryFrom<MemoryRow> for Memory {
	type Error = Error;

	fn try_from(row: MemoryRow) -> Result<Self> {
		let tags: Vec<String> = serde_json::from_str(&row.tags).map_err(|err| {
			Error::Malformed(format!("tags of memory {} are not a string list: {err}.", row.id))
		})?;

		Ok(Self {
			created_at: timestamp::parse_stored(&row.created_at, "created_at")?,
			updated_at: timestamp::parse_stored(&row.updated_at, "updated_at")?,
			last_accessed: timestamp::parse_stored(&row.last_accessed, "last_accessed")?,
			id: row.id,
			content: row.content,
			category: row.category,
			tags,
			source: row.source,
			access_count: row.access_count,
		})
	}
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct MemoryPatch<'a> {
	pub content: Option<&'a str>,
	pub category: Option<&'a str>,
	pub tags: Option<&'a [String]>,
}

#[derive(Debug)]
pub struct CategoryCount {
	pub category: String,
	pub count: i64,
}

pub(crate) fn encode_tags(tags: &[String]) -> Result<String> {
	serde_json::to_string(tags)
		.map_err(|err| Error::InvalidArgument(format!("Tags cannot be encoded: {err}.")))
}
