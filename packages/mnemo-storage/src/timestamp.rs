//! Stored timestamps are fixed-width UTC strings, so lexical order equals chronological order.

use time::{
	OffsetDateTime, UtcOffset,
	format_description::{BorrowedFormatItem, well_known::Rfc3339},
	macros::format_description,
};

use crate::{Error, Result};

const STORED_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

/// Current UTC time truncated to the stored microsecond precision.
pub fn now() -> OffsetDateTime {
	truncate_to_micros(OffsetDateTime::now_utc())
}

pub fn format(value: OffsetDateTime) -> Result<String> {
	value
		.to_offset(UtcOffset::UTC)
		.format(STORED_FORMAT)
		.map_err(|err| Error::InvalidArgument(format!("Timestamp cannot be formatted: {err}.")))
}

/// Accepts any RFC 3339 timestamp and normalizes it to UTC microseconds.
pub fn parse(raw: &str) -> std::result::Result<OffsetDateTime, time::error::Parse> {
	let parsed = OffsetDateTime::parse(raw.trim(), &Rfc3339)?;

	Ok(truncate_to_micros(parsed.to_offset(UtcOffset::UTC)))
}

pub(crate) fn parse_stored(raw: &str, column: &str) -> Result<OffsetDateTime> {
	parse(raw)
		.map_err(|err| Error::Malformed(format!("{column} {raw:?} is not a timestamp: {err}.")))
}

fn truncate_to_micros(value: OffsetDateTime) -> OffsetDateTime {
	value.replace_nanosecond(value.nanosecond() / 1_000 * 1_000).unwrap_or(value)
}
