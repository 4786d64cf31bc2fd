pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {field}: {message}")]
	Validation { field: String, message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
		Self::Validation { field: field.to_string(), message: message.into() }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<mnemo_storage::Error> for Error {
	fn from(err: mnemo_storage::Error) -> Self {
		match err {
			mnemo_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			mnemo_storage::Error::Io(inner) => Self::Storage { message: inner.to_string() },
			mnemo_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			mnemo_storage::Error::NotFound(message) => Self::NotFound { message },
			mnemo_storage::Error::Conflict(message) => Self::Conflict { message },
			mnemo_storage::Error::Malformed(message) => Self::Storage { message },
		}
	}
}

impl From<mnemo_providers::Error> for Error {
	fn from(err: mnemo_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
