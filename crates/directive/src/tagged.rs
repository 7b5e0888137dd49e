//! Tagged (XML-like) directive form.
//!
//! ```text
//! <dynamic id="X" type="Service_Object" [status="inactive"]>
//!   <initializer path="Mod" init="make" [params="..."]/>
//! </dynamic>
//! <static id="X" [type="..."] [status="..."] [params="..."]/>
//! <remove id="X"/>   <suspend id="X"/>   <resume id="X"/>
//! ```
//!
//! Only what the directives need is understood: elements, quoted attributes, the five predefined
//! entities and comments. Unknown attributes are ignored.

use std::str::FromStr;

use crate::cursor::{Cursor, Mark};
use crate::descriptor::{Descriptor, ServiceType};
use crate::error::{ParseError, ParseErrorKind};

const ENTITIES: &[(&str, char)] = &[("&quot;", '"'), ("&apos;", '\''), ("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>')];

type Attributes<'a> = Vec<(&'a str, String)>;

fn is_name_char(ch: char) -> bool {
	ch.is_alphanumeric() || matches!(ch, '_' | '-' | ':' | '.')
}

/// Skips whitespace and `<!-- -->` comments.
pub(crate) fn skip_markup_trivia(c: &mut Cursor<'_>) {
	loop {
		c.skip_whitespace();
		if !c.eat("<!--") {
			break;
		}
		c.skip_past("-->");
	}
}

/// Parses one tagged directive starting at `<`.
pub(crate) fn parse(c: &mut Cursor<'_>) -> Result<Descriptor, ParseError> {
	let start = c.mark();
	c.expect("<", "`<`")?;
	let name = c.take_while(is_name_char);
	match name {
		"dynamic" | "static" | "remove" | "suspend" | "resume" => {}
		"" => return Err(c.unexpected("element name")),
		other => return Err(c.error_at(start, ParseErrorKind::UnknownDirective(other.to_string()))),
	}

	let (attrs, self_closing) = attributes(c)?;
	let id = required(c, start, &attrs, "id")?;

	let descriptor = match name {
		"dynamic" => {
			let service_type = service_type(c, start, &attrs)?.ok_or_else(|| c.error_at(start, ParseErrorKind::MissingField("type")))?;
			let active = status(c, start, &attrs)?;
			let initializer = if self_closing { None } else { initializer(c)? };
			let Some((path, symbol, params)) = initializer else {
				return Err(c.error_at(start, ParseErrorKind::MissingField("initializer")));
			};
			let mut d = Descriptor::install_dynamic(id, path, symbol, params).with_type(service_type);
			d.active = active;
			d
		}
		"static" => {
			let service_type = service_type(c, start, &attrs)?.unwrap_or_default();
			let active = status(c, start, &attrs)?;
			let params = attr(&attrs, "params").unwrap_or_default();
			let mut d = Descriptor::install_static(id, params).with_type(service_type);
			d.active = active;
			d
		}
		"remove" => Descriptor::remove(id),
		"suspend" => Descriptor::suspend(id),
		_ => Descriptor::resume(id),
	};

	if name != "dynamic" {
		if self_closing {
			eat_redundant_close(c, name);
		} else {
			close(c, name)?;
		}
	}
	Ok(descriptor)
}

/// Attributes up to `>` or `/>`. Returns whether the element was self-closing.
fn attributes<'a>(c: &mut Cursor<'a>) -> Result<(Attributes<'a>, bool), ParseError> {
	let mut attrs = Vec::new();
	loop {
		c.skip_whitespace();
		if c.eat("/>") {
			return Ok((attrs, true));
		}
		if c.eat(">") {
			return Ok((attrs, false));
		}
		if c.is_end() {
			return Err(c.error(ParseErrorKind::Unterminated("tag")));
		}
		let name = c.take_while(is_name_char);
		if name.is_empty() {
			return Err(c.unexpected("attribute name"));
		}
		c.skip_whitespace();
		c.expect("=", "`=`")?;
		c.skip_whitespace();
		attrs.push((name, attribute_value(c)?));
	}
}

fn attribute_value(c: &mut Cursor<'_>) -> Result<String, ParseError> {
	let mark = c.mark();
	let quote = match c.peek() {
		Some(q @ ('"' | '\'')) => q,
		_ => return Err(c.unexpected("quoted attribute value")),
	};
	c.bump();
	let raw = c.take_while(|ch| ch != quote);
	if c.bump() != Some(quote) {
		return Err(c.error_at(mark, ParseErrorKind::Unterminated("attribute value")));
	}
	Ok(decode_entities(raw))
}

fn decode_entities(raw: &str) -> String {
	if !raw.contains('&') {
		return raw.to_string();
	}
	let mut out = String::with_capacity(raw.len());
	let mut rest = raw;
	while let Some(i) = rest.find('&') {
		out.push_str(&rest[..i]);
		rest = &rest[i..];
		match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
			Some((entity, ch)) => {
				out.push(*ch);
				rest = &rest[entity.len()..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

/// Last value for `name`; later duplicates win.
fn attr(attrs: &Attributes<'_>, name: &str) -> Option<String> {
	attrs.iter().rev().find(|(key, _)| *key == name).map(|(_, value)| value.clone())
}

fn required(c: &Cursor<'_>, at: Mark, attrs: &Attributes<'_>, name: &'static str) -> Result<String, ParseError> {
	match attr(attrs, name) {
		Some(value) if !value.is_empty() => Ok(value),
		_ => Err(c.error_at(at, ParseErrorKind::MissingField(name))),
	}
}

fn service_type(c: &Cursor<'_>, at: Mark, attrs: &Attributes<'_>) -> Result<Option<ServiceType>, ParseError> {
	let Some(raw) = attr(attrs, "type") else {
		return Ok(None);
	};
	let tag = raw.trim().trim_end_matches('*').trim_end();
	ServiceType::from_str(tag)
		.map(Some)
		.map_err(|_| c.error_at(at, ParseErrorKind::UnknownServiceType(raw.clone())))
}

fn status(c: &Cursor<'_>, at: Mark, attrs: &Attributes<'_>) -> Result<bool, ParseError> {
	match attr(attrs, "status").as_deref() {
		None | Some("active") => Ok(true),
		Some("inactive") => Ok(false),
		Some(other) => Err(c.error_at(
			at,
			ParseErrorKind::Unexpected {
				expected: "`active` or `inactive`",
				found: format!("`{other}`"),
			},
		)),
	}
}

/// Children of `<dynamic>` through `</dynamic>`; returns `(path, init, params)` of the initializer.
fn initializer(c: &mut Cursor<'_>) -> Result<Option<(String, String, String)>, ParseError> {
	let mut found = None;
	loop {
		skip_markup_trivia(c);
		if c.starts_with("</") {
			close(c, "dynamic")?;
			return Ok(found);
		}
		if c.is_end() {
			return Err(c.error(ParseErrorKind::Unterminated("`<dynamic>` element")));
		}

		let mark = c.mark();
		c.expect("<", "`<initializer>` or `</dynamic>`")?;
		let name = c.take_while(is_name_char);
		if name != "initializer" {
			return Err(c.error_at(
				mark,
				ParseErrorKind::Unexpected {
					expected: "`<initializer>`",
					found: format!("`<{name}>`"),
				},
			));
		}
		let (attrs, self_closing) = attributes(c)?;
		if !self_closing {
			close(c, "initializer")?;
		}
		let path = required(c, mark, &attrs, "path")?;
		let init = required(c, mark, &attrs, "init")?;
		let params = attr(&attrs, "params").unwrap_or_default();
		found = Some((path, init, params));
	}
}

/// Consumes `</name>`.
fn close(c: &mut Cursor<'_>, name: &str) -> Result<(), ParseError> {
	skip_markup_trivia(c);
	let mark = c.mark();
	let expected = match name {
		"dynamic" => "`</dynamic>`",
		"static" => "`</static>`",
		"remove" => "`</remove>`",
		"suspend" => "`</suspend>`",
		"resume" => "`</resume>`",
		_ => "`</initializer>`",
	};
	if !c.eat("</") {
		return Err(c.unexpected(expected));
	}
	let found = c.take_while(is_name_char);
	c.skip_whitespace();
	if found != name || !c.eat(">") {
		return Err(c.error_at(
			mark,
			ParseErrorKind::Unexpected {
				expected,
				found: format!("`</{found}`"),
			},
		));
	}
	Ok(())
}

/// Tolerates `<remove id="X"/></remove>`.
fn eat_redundant_close(c: &mut Cursor<'_>, name: &str) {
	let mark = c.mark();
	c.skip_whitespace();
	let matched = c.eat("</") && c.take_while(is_name_char) == name && {
		c.skip_whitespace();
		c.eat(">")
	};
	if !matched {
		c.reset(mark);
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn parse_str(s: &str) -> Result<Descriptor, ParseError> {
		parse(&mut Cursor::new(s))
	}

	#[test]
	fn dynamic_with_initializer() {
		let d = parse_str(
			r#"<dynamic id="Test_Object_1" type="Service_Object">
				<initializer init="_make_Service_Config_DLL" path="Service_Config_DLL" params="Test_Object_1"/>
			</dynamic>"#,
		)
		.unwrap();
		assert_eq!(d, Descriptor::install_dynamic("Test_Object_1", "Service_Config_DLL", "_make_Service_Config_DLL", "Test_Object_1"));
	}

	#[test]
	fn entities_and_single_quotes() {
		let d = parse_str(r#"<static id='Echo' params="-p &quot;4911&quot; &lt;x&gt; &amp; &bogus;"/>"#).unwrap();
		assert_eq!(d.params, r#"-p "4911" <x> & &bogus;"#);
	}

	#[test]
	fn type_attribute_may_carry_pointer_marker() {
		let d = parse_str(r#"<static id="S" type="Module *"/>"#).unwrap();
		assert_eq!(d.service_type, ServiceType::Module);
	}

	#[test]
	fn redundant_close_after_self_closed_remove() {
		let mut c = Cursor::new(r#"<remove id="X"/></remove> rest"#);
		assert_eq!(parse(&mut c).unwrap(), Descriptor::remove("X"));
		assert_eq!(c.rest(), " rest");
	}

	#[test]
	fn explicit_close_tags() {
		let d = parse_str(r#"<suspend id="X"></suspend>"#).unwrap();
		assert_eq!(d, Descriptor::suspend("X"));

		let err = parse_str(r#"<resume id="X"></remove>"#).unwrap_err();
		assert!(matches!(err.kind, ParseErrorKind::Unexpected { expected: "`</resume>`", .. }));
	}

	#[test]
	fn dynamic_without_initializer() {
		let err = parse_str(r#"<dynamic id="X" type="Service_Object"/>"#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::MissingField("initializer"));

		let err = parse_str(r#"<dynamic id="X" type="Service_Object"><initializer init="make"/></dynamic>"#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::MissingField("path"));
	}

	#[test]
	fn missing_id_and_unknown_element() {
		let err = parse_str(r#"<remove/>"#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::MissingField("id"));

		let err = parse_str(r#"<stream id="S"/>"#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::UnknownDirective("stream".into()));
	}

	#[test]
	fn unterminated_tag_and_value() {
		let err = parse_str(r#"<remove id="X""#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::Unterminated("tag"));

		let err = parse_str(r#"<remove id="X/>"#).unwrap_err();
		assert_eq!(err.kind, ParseErrorKind::Unterminated("attribute value"));
	}
}
