//! Serde adapters rendering timestamps in the store's fixed-width UTC form.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;

use mnemo_storage::timestamp;

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = timestamp::format(*value).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	timestamp::parse(&raw).map_err(serde::de::Error::custom)
}
