use thiserror::Error;

/// Why a service could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
	#[error("module `{path}` not found: {reason}")]
	ModuleNotFound { path: String, reason: String },

	#[error("symbol `{symbol}` not found in module `{module}`")]
	SymbolNotFound { module: String, symbol: String },

	#[error("service `{service}` refused to initialize: {reason}")]
	InitRejected { service: String, reason: String },
}

impl LoadError {
	pub(crate) fn rejected(service: impl Into<String>, reason: impl ToString) -> Self {
		Self::InitRejected {
			service: service.into(),
			reason: reason.to_string(),
		}
	}
}

/// Failure reported by a service object hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

impl From<&str> for ServiceError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

impl From<String> for ServiceError {
	fn from(message: String) -> Self {
		Self(message)
	}
}
