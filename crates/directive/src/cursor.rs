use crate::error::{ParseError, ParseErrorKind};

/// Saved cursor position, used to report errors at the start of a construct and to rewind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mark {
	pos: usize,
	line: usize,
	column: usize,
}

/// Character cursor over directive text with line/column tracking.
pub(crate) struct Cursor<'a> {
	src: &'a str,
	pos: usize,
	line: usize,
	column: usize,
}

impl<'a> Cursor<'a> {
	pub fn new(src: &'a str) -> Self {
		Self {
			src,
			pos: 0,
			line: 1,
			column: 1,
		}
	}

	/// Unconsumed input.
	pub fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	pub fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	pub fn is_end(&self) -> bool {
		self.pos >= self.src.len()
	}

	pub fn starts_with(&self, prefix: &str) -> bool {
		self.rest().starts_with(prefix)
	}

	/// Consumes and returns the next character.
	pub fn bump(&mut self) -> Option<char> {
		let ch = self.peek()?;
		self.pos += ch.len_utf8();
		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(ch)
	}

	/// Consumes `prefix` if the input starts with it.
	pub fn eat(&mut self, prefix: &str) -> bool {
		if !self.starts_with(prefix) {
			return false;
		}
		for _ in prefix.chars() {
			self.bump();
		}
		true
	}

	/// Consumes `expected` or fails with an `Unexpected` error naming `what`.
	pub fn expect(&mut self, expected: &str, what: &'static str) -> Result<(), ParseError> {
		if self.eat(expected) {
			Ok(())
		} else {
			Err(self.unexpected(what))
		}
	}

	/// Consumes characters while `predicate` holds and returns them as a slice.
	pub fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
		let start = self.pos;
		while let Some(ch) = self.peek() {
			if !predicate(ch) {
				break;
			}
			self.bump();
		}
		&self.src[start..self.pos]
	}

	/// Consumes everything up to and including `terminator`. Returns false at end of input.
	pub fn skip_past(&mut self, terminator: &str) -> bool {
		while !self.is_end() {
			if self.eat(terminator) {
				return true;
			}
			self.bump();
		}
		false
	}

	/// Whether only whitespace precedes the cursor on its line.
	pub fn at_line_start(&self) -> bool {
		self.src[..self.pos]
			.chars()
			.rev()
			.take_while(|&ch| ch != '\n')
			.all(char::is_whitespace)
	}

	pub fn skip_whitespace(&mut self) {
		self.take_while(char::is_whitespace);
	}

	pub fn mark(&self) -> Mark {
		Mark {
			pos: self.pos,
			line: self.line,
			column: self.column,
		}
	}

	pub fn reset(&mut self, mark: Mark) {
		self.pos = mark.pos;
		self.line = mark.line;
		self.column = mark.column;
	}

	pub fn error(&self, kind: ParseErrorKind) -> ParseError {
		ParseError {
			kind,
			line: self.line,
			column: self.column,
		}
	}

	pub fn error_at(&self, mark: Mark, kind: ParseErrorKind) -> ParseError {
		ParseError {
			kind,
			line: mark.line,
			column: mark.column,
		}
	}

	/// `Unexpected` error describing whatever sits at the cursor.
	pub fn unexpected(&self, expected: &'static str) -> ParseError {
		let found = match self.peek() {
			None => "end of input".to_string(),
			Some(_) => {
				let token: String = self.rest().chars().take_while(|c| !c.is_whitespace()).take(24).collect();
				format!("`{token}`")
			}
		};
		self.error(ParseErrorKind::Unexpected { expected, found })
	}
}
