//! Parser for the OpenStep-style text format used by `project.pbxproj`
//!
//! Besides the value tree, the parser keeps the `/* ... */` annotation that
//! follows a string token (Xcode writes the referenced object's display name
//! there). Those annotations are fed back to the writer so untouched parts of
//! a project come out byte-for-byte identical.

use super::value::{Dict, Value};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Result of parsing a whole document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub root: Dict,
    /// Annotation text keyed by the token it followed (first occurrence wins)
    pub annotations: HashMap<String, String>,
}

/// Parse a complete document whose top level is a dictionary.
pub fn parse_document(source: &str) -> Result<ParsedDocument> {
    let mut parser = Parser::new(source);
    parser.skip_trivia()?;
    let root = match parser.parse_value()? {
        Value::Dict(dict) => dict,
        _ => return Err(Error::parse(1, "top-level value must be a dictionary")),
    };
    parser.skip_trivia()?;
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected trailing character '{c}'")));
    }
    Ok(ParsedDocument {
        root,
        annotations: parser.annotations,
    })
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    annotations: HashMap<String, String>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            annotations: HashMap::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.line, message)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_trivia()?;
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Skip whitespace and every kind of comment.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if !self.at_comment_start() {
                return Ok(());
            }
            self.read_comment()?;
        }
    }

    fn at_comment_start(&self) -> bool {
        let mut lookahead = self.chars.clone();
        lookahead.next() == Some('/') && matches!(lookahead.next(), Some('/') | Some('*'))
    }

    /// Consume a comment starting at the current position and return its text.
    fn read_comment(&mut self) -> Result<String> {
        self.bump();
        let mut text = String::new();
        match self.bump() {
            Some('/') => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
            }
            Some('*') => loop {
                match self.bump() {
                    Some('*') if self.peek() == Some('/') => {
                        self.bump();
                        break;
                    }
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated block comment")),
                }
            },
            _ => return Err(self.error("malformed comment")),
        }
        Ok(text.trim().to_string())
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_dict().map(Value::Dict),
            Some('(') => self.parse_array().map(Value::Array),
            Some(_) => self.parse_string().map(Value::String),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dict(&mut self) -> Result<Dict> {
        self.expect('{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }
            let key = self.parse_string()?;
            self.expect('=')?;
            let value = self.parse_value()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(c) => return Err(self.error(format!("expected ',' or ')', found '{c}'"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_trivia()?;
        let token = match self.peek() {
            Some('"') => self.parse_quoted()?,
            Some(c) if is_bare_char(c) => {
                let mut token = String::new();
                while let Some(c) = self.peek() {
                    if !is_bare_char(c) {
                        break;
                    }
                    token.push(c);
                    self.bump();
                }
                token
            }
            Some(c) => return Err(self.error(format!("unexpected character '{c}'"))),
            None => return Err(self.error("unexpected end of input")),
        };
        self.capture_annotation(&token)?;
        Ok(token)
    }

    /// Annotations always sit on the same line as their token.
    fn capture_annotation(&mut self, token: &str) -> Result<()> {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some('/') && lookahead.next() == Some('*') {
            let text = self.read_comment()?;
            self.annotations.entry(token.to_string()).or_insert(text);
        }
        Ok(())
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated escape sequence")),
                },
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated quoted string")),
            }
        }
    }
}

fn is_bare_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '{' | '}' | '(' | ')' | '=' | ';' | ',' | '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_structures() {
        let source = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objects = {
		ABC /* Thing */ = {isa = PBXGroup; children = (DEF /* Child */, ); name = "My Group"; };
	};
}
"#;
        let doc = parse_document(source).unwrap();
        assert_eq!(doc.root["archiveVersion"].as_str(), Some("1"));

        let objects = doc.root["objects"].as_dict().unwrap();
        let group = objects["ABC"].as_dict().unwrap();
        assert_eq!(group["name"].as_str(), Some("My Group"));
        assert_eq!(group["children"].as_array().unwrap().len(), 1);

        assert_eq!(doc.annotations.get("ABC").map(String::as_str), Some("Thing"));
        assert_eq!(doc.annotations.get("DEF").map(String::as_str), Some("Child"));
    }

    #[test]
    fn test_parse_quoted_escapes() {
        let source = r#"{ shellScript = "set -e\n\"$NODE\" --print"; }"#;
        let doc = parse_document(source).unwrap();
        assert_eq!(
            doc.root["shellScript"].as_str(),
            Some("set -e\n\"$NODE\" --print")
        );
    }

    #[test]
    fn test_section_comments_are_not_annotations() {
        let source =
            "{\n/* Begin PBXGroup section */\n\tkey = value;\n/* End PBXGroup section */\n}";
        let doc = parse_document(source).unwrap();
        assert_eq!(doc.root["key"].as_str(), Some("value"));
        assert!(doc.annotations.is_empty());
    }

    #[test]
    fn test_missing_semicolon_reports_line() {
        let source = "{\n\ta = b;\n\tc = d\n}";
        match parse_document(source) {
            Err(Error::ParseError { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(parse_document("{ a = \"open; }").is_err());
    }
}
