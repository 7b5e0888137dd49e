use thiserror::Error;

/// Why a directive failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
	#[error("no directive found")]
	Empty,

	#[error("unknown directive `{0}`")]
	UnknownDirective(String),

	#[error("unknown service type `{0}`")]
	UnknownServiceType(String),

	#[error("missing required field `{0}`")]
	MissingField(&'static str),

	#[error("expected {expected}, found {found}")]
	Unexpected { expected: &'static str, found: String },

	#[error("unterminated {0}")]
	Unterminated(&'static str),

	#[error("unexpected input after directive: `{0}`")]
	Trailing(String),
}

/// A parse failure with its 1-based source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
	pub kind: ParseErrorKind,
	pub line: usize,
	pub column: usize,
}
