//! Compact, line-oriented directive form.
//!
//! ```text
//! dynamic <id> <type> [*] <path>:<symbol>[()] [active|inactive] ["params"]
//! static  <id> [<type> [*]] [active|inactive] ["params"]
//! remove  <id>
//! suspend <id>
//! resume  <id>
//! ```

use std::str::FromStr;

use crate::cursor::Cursor;
use crate::descriptor::{Descriptor, ServiceType};
use crate::error::{ParseError, ParseErrorKind};

/// Keywords that open a directive in either form.
pub(crate) const KEYWORDS: &[&str] = &["dynamic", "static", "remove", "suspend", "resume"];

/// Characters allowed in a bare word (ids, type tags, locations).
pub(crate) fn is_word_char(ch: char) -> bool {
	!ch.is_whitespace() && !matches!(ch, '"' | '#' | '<')
}

/// Skips whitespace and `#` comments.
pub(crate) fn skip_trivia(c: &mut Cursor<'_>) {
	loop {
		c.skip_whitespace();
		if c.peek() != Some('#') {
			break;
		}
		c.take_while(|ch| ch != '\n');
	}
}

fn word<'a>(c: &mut Cursor<'a>) -> Option<&'a str> {
	skip_trivia(c);
	let w = c.take_while(is_word_char);
	(!w.is_empty()).then_some(w)
}

/// Consumes the next word only if `accept` maps it to a value.
fn word_if<'a, T>(c: &mut Cursor<'a>, accept: impl FnOnce(&'a str) -> Option<T>) -> Option<T> {
	let mark = c.mark();
	let value = word(c).and_then(accept);
	if value.is_none() {
		c.reset(mark);
	}
	value
}

/// Parses one compact directive starting at the cursor.
pub(crate) fn parse(c: &mut Cursor<'_>) -> Result<Descriptor, ParseError> {
	skip_trivia(c);
	let start = c.mark();
	let Some(keyword) = word(c) else {
		return Err(c.unexpected("directive keyword"));
	};

	match keyword {
		"dynamic" => dynamic(c),
		"static" => static_(c),
		"remove" => Ok(Descriptor::remove(identifier(c)?)),
		"suspend" => Ok(Descriptor::suspend(identifier(c)?)),
		"resume" => Ok(Descriptor::resume(identifier(c)?)),
		other => Err(c.error_at(start, ParseErrorKind::UnknownDirective(other.to_string()))),
	}
}

fn identifier(c: &mut Cursor<'_>) -> Result<String, ParseError> {
	match word(c) {
		Some(w) => Ok(w.to_string()),
		None => Err(c.error(ParseErrorKind::MissingField("id"))),
	}
}

fn dynamic(c: &mut Cursor<'_>) -> Result<Descriptor, ParseError> {
	let id = identifier(c)?;
	let service_type = required_service_type(c)?;
	let (path, symbol) = location(c)?;
	let active = status(c);
	let params = params(c)?;

	let mut descriptor = Descriptor::install_dynamic(id, path, symbol, params).with_type(service_type);
	descriptor.active = active;
	Ok(descriptor)
}

fn static_(c: &mut Cursor<'_>) -> Result<Descriptor, ParseError> {
	let id = identifier(c)?;
	let service_type = service_type(c).unwrap_or_default();
	let active = status(c);
	let params = params(c)?;

	let mut descriptor = Descriptor::install_static(id, params).with_type(service_type);
	descriptor.active = active;
	Ok(descriptor)
}

/// Optional type tag, with the pointer marker either glued (`Service_Object*`) or separate.
fn service_type(c: &mut Cursor<'_>) -> Option<ServiceType> {
	let mut glued_star = false;
	let service_type = word_if(c, |w| {
		let tag = match w.strip_suffix('*') {
			Some(tag) => {
				glued_star = true;
				tag
			}
			None => w,
		};
		ServiceType::from_str(tag).ok()
	})?;
	if !glued_star {
		word_if(c, |w| (w == "*").then_some(()));
	}
	Some(service_type)
}

fn required_service_type(c: &mut Cursor<'_>) -> Result<ServiceType, ParseError> {
	if let Some(service_type) = service_type(c) {
		return Ok(service_type);
	}
	skip_trivia(c);
	let mark = c.mark();
	match word(c) {
		Some(w) => Err(c.error_at(mark, ParseErrorKind::UnknownServiceType(w.to_string()))),
		None => Err(c.error(ParseErrorKind::MissingField("type"))),
	}
}

/// `<path>:<symbol>` with an optional trailing `()`. Splits on the last colon.
fn location(c: &mut Cursor<'_>) -> Result<(String, String), ParseError> {
	skip_trivia(c);
	let mark = c.mark();
	let Some(w) = word(c) else {
		return Err(c.error(ParseErrorKind::MissingField("path")));
	};
	let Some((path, symbol)) = w.rsplit_once(':') else {
		return Err(c.error_at(
			mark,
			ParseErrorKind::Unexpected {
				expected: "`<path>:<symbol>`",
				found: format!("`{w}`"),
			},
		));
	};
	let symbol = symbol.strip_suffix("()").unwrap_or(symbol);
	if path.is_empty() {
		return Err(c.error_at(mark, ParseErrorKind::MissingField("path")));
	}
	if symbol.is_empty() {
		return Err(c.error_at(mark, ParseErrorKind::MissingField("init")));
	}
	Ok((path.to_string(), symbol.to_string()))
}

fn status(c: &mut Cursor<'_>) -> bool {
	word_if(c, |w| match w {
		"active" => Some(true),
		"inactive" => Some(false),
		_ => None,
	})
	.unwrap_or(true)
}

fn params(c: &mut Cursor<'_>) -> Result<String, ParseError> {
	skip_trivia(c);
	if c.peek() == Some('"') { quoted(c) } else { Ok(String::new()) }
}

/// Double-quoted string. `\"` and `\\` are escapes; any other backslash is kept.
pub(crate) fn quoted(c: &mut Cursor<'_>) -> Result<String, ParseError> {
	let mark = c.mark();
	c.bump();
	let mut out = String::new();
	loop {
		match c.bump() {
			None => return Err(c.error_at(mark, ParseErrorKind::Unterminated("string"))),
			Some('"') => return Ok(out),
			Some('\\') => match c.peek() {
				Some(ch @ ('"' | '\\')) => {
					c.bump();
					out.push(ch);
				}
				_ => out.push('\\'),
			},
			Some(ch) => out.push(ch),
		}
	}
}
