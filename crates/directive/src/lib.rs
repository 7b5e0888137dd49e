//! # Service configuration directives
//!
//! Parses the textual directives that install, remove, suspend and resume services. Two concrete
//! syntaxes carry identical meaning and produce identical [`Descriptor`]s:
//!
//! ```text
//! # compact form
//! dynamic Logger Service_Object * liblogger:make_logger() "-v"
//! static  Timer "-r 10"
//! remove  Logger
//!
//! <!-- tagged form -->
//! <dynamic id="Logger" type="Service_Object">
//!   <initializer path="liblogger" init="make_logger" params="-v"/>
//! </dynamic>
//! <static id="Timer" params="-r 10"/>
//! <remove id="Logger"/>
//! ```
//!
//! A submission may hold any number of directives in either form, mixed freely. [`directives`]
//! yields one result per directive and resynchronises on the next directive keyword after a
//! malformed one, so a single bad line costs a single error. Parsing has no side effects.

mod compact;
mod cursor;
mod descriptor;
mod error;
mod tagged;

use cursor::Cursor;
pub use descriptor::{Action, Descriptor, ServiceType, UnknownServiceType};
pub use error::{ParseError, ParseErrorKind};

/// Parses exactly one directive.
///
/// # Errors
///
/// Returns a [`ParseError`] when the text is empty, malformed, or holds more than one directive.
///
/// # Examples
///
/// ```
/// use gestalt_directive::{parse, Descriptor};
///
/// let d = parse("remove Logger").unwrap();
/// assert_eq!(d, Descriptor::remove("Logger"));
/// ```
pub fn parse(text: &str) -> Result<Descriptor, ParseError> {
	let mut cursor = Cursor::new(text);
	skip_trivia(&mut cursor);
	if cursor.is_end() {
		return Err(cursor.error(ParseErrorKind::Empty));
	}

	let descriptor = parse_one(&mut cursor)?;

	skip_trivia(&mut cursor);
	if !cursor.is_end() {
		let trailing: String = cursor.rest().split_whitespace().next().unwrap_or_default().to_string();
		return Err(cursor.error(ParseErrorKind::Trailing(trailing)));
	}
	Ok(descriptor)
}

/// Iterates every directive in a submission.
pub fn directives(text: &str) -> Directives<'_> {
	Directives {
		cursor: Cursor::new(text),
	}
}

/// Iterator returned by [`directives`].
pub struct Directives<'a> {
	cursor: Cursor<'a>,
}

impl Iterator for Directives<'_> {
	type Item = Result<Descriptor, ParseError>;

	fn next(&mut self) -> Option<Self::Item> {
		skip_trivia(&mut self.cursor);
		if self.cursor.is_end() {
			return None;
		}

		let start = self.cursor.mark();
		let result = parse_one(&mut self.cursor);
		if result.is_err() {
			self.cursor.reset(start);
			recover(&mut self.cursor);
		}
		Some(result)
	}
}

impl std::str::FromStr for Descriptor {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse(s)
	}
}

fn parse_one(cursor: &mut Cursor<'_>) -> Result<Descriptor, ParseError> {
	if cursor.starts_with("<") {
		tagged::parse(cursor)
	} else {
		compact::parse(cursor)
	}
}

/// Skips anything that separates directives: whitespace, `#` comments, markup comments,
/// processing instructions and the optional `<svc_conf>` wrapper.
fn skip_trivia(cursor: &mut Cursor<'_>) {
	loop {
		compact::skip_trivia(cursor);
		if cursor.starts_with("<!--") {
			tagged::skip_markup_trivia(cursor);
		} else if cursor.eat("<?") {
			cursor.skip_past("?>");
		} else if !(cursor.eat("<svc_conf>") || cursor.eat("</svc_conf>")) {
			break;
		}
	}
}

/// Moves past a malformed directive to the start of the next one.
fn recover(cursor: &mut Cursor<'_>) {
	skip_token(cursor);
	loop {
		skip_trivia(cursor);
		if cursor.is_end() || at_directive_start(cursor) {
			return;
		}
		skip_token(cursor);
	}
}

fn skip_token(cursor: &mut Cursor<'_>) {
	match cursor.peek() {
		None => {}
		Some('<') => {
			cursor.skip_past(">");
		}
		Some('"') => {
			let _ = compact::quoted(cursor);
		}
		Some(_) => {
			if cursor.take_while(compact::is_word_char).is_empty() {
				cursor.bump();
			}
		}
	}
}

/// A resync point: a tagged directive anywhere, or a compact keyword opening a line.
///
/// Keywords in the middle of a line are ids, types or paths of the directive being skipped.
fn at_directive_start(cursor: &Cursor<'_>) -> bool {
	let rest = cursor.rest();
	if let Some(tag) = rest.strip_prefix('<') {
		return keyword_then(tag, |ch| ch.is_whitespace() || ch == '/' || ch == '>');
	}
	cursor.at_line_start() && keyword_then(rest, char::is_whitespace)
}

/// Whether `text` starts with a whole keyword followed by end of input or a `delimiter`.
fn keyword_then(text: &str, delimiter: impl Fn(char) -> bool) -> bool {
	compact::KEYWORDS.iter().any(|keyword| {
		text.strip_prefix(keyword)
			.is_some_and(|after| after.chars().next().is_none_or(&delimiter))
	})
}

#[cfg(test)]
mod tests;
