//! Minimal XML-RPC codec
//!
//! Values are exchanged as [`serde_json::Value`]:
//!
//! | XML-RPC                     | JSON                          |
//! |-----------------------------|-------------------------------|
//! | `string`, untyped           | string                        |
//! | `int`, `i4`                 | integer                       |
//! | `double`                    | number                        |
//! | `boolean`                   | bool                          |
//! | `nil`                       | null                          |
//! | `struct`                    | object (member order kept)    |
//! | `array`                     | array                         |
//! | `base64`, `dateTime.iso8601`, `i8` | `{"$xmlrpc:<type>": ..}` |
//!
//! Types the configuration code has no use for are kept behind a one-member
//! marker object so that a fetched section is written back with the same
//! element types it was read with.

use pfdns_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};
use std::fmt::Display;

/// Member-name prefix of a value kept with its original XML-RPC type
pub const TYPED_PREFIX: &str = "$xmlrpc:";

/// Types carried through as marker objects
const OPAQUE_TYPES: &[&str] = &["base64", "dateTime.iso8601", "i8"];

/// Wrap `value` so that it is re-encoded as `<kind>`
pub fn typed(kind: &str, value: Value) -> Value {
    let mut marker = Map::new();
    marker.insert(format!("{}{}", TYPED_PREFIX, kind), value);
    Value::Object(marker)
}

/// Element type and text of a marker object built by [`typed`]
fn as_typed(members: &Map<String, Value>) -> Option<(&str, String)> {
    if members.len() != 1 {
        return None;
    }
    let (name, value) = members.iter().next()?;
    let kind = name.strip_prefix(TYPED_PREFIX)?;
    if !OPAQUE_TYPES.contains(&kind) {
        return None;
    }
    match value {
        Value::String(text) => Some((kind, text.clone())),
        Value::Number(n) => Some((kind, n.to_string())),
        _ => None,
    }
}

fn xml_error(e: impl Display) -> Error {
    Error::rpc(format!("malformed XML: {}", e))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `methodCall` document
pub fn method_call(method: &str, params: &[Value]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(xml_error)?;
    open(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    open(&mut writer, "params")?;
    for param in params {
        open(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn write_value(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<()> {
    open(writer, "value")?;
    match value {
        Value::Null => {
            writer
                .write_event(Event::Empty(BytesStart::new("nil")))
                .map_err(xml_error)?;
        }
        Value::Bool(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::Number(n) => match n.as_i64() {
            Some(i) => text_element(writer, "int", &i.to_string())?,
            None => text_element(writer, "double", &n.to_string())?,
        },
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Array(items) => {
            open(writer, "array")?;
            open(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            close(writer, "data")?;
            close(writer, "array")?;
        }
        Value::Object(members) => match as_typed(members) {
            Some((kind, text)) => text_element(writer, kind, &text)?,
            None => {
                open(writer, "struct")?;
                for (name, member) in members {
                    open(writer, "member")?;
                    text_element(writer, "name", name)?;
                    write_value(writer, member)?;
                    close(writer, "member")?;
                }
                close(writer, "struct")?;
            }
        },
    }
    close(writer, "value")
}

fn open(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)
}

fn close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    open(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    close(writer, name)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => tokens.push(Token::Open(tag_name(e.local_name().as_ref())?)),
            Event::End(e) => tokens.push(Token::Close(tag_name(e.local_name().as_ref())?)),
            Event::Empty(e) => {
                let name = tag_name(e.local_name().as_ref())?;
                tokens.push(Token::Open(name.clone()));
                tokens.push(Token::Close(name));
            }
            Event::Text(t) => tokens.push(Token::Text(t.unescape().map_err(xml_error)?.into_owned())),
            Event::CData(c) => {
                let text = String::from_utf8(c.into_inner().into_owned()).map_err(xml_error)?;
                tokens.push(Token::Text(text));
            }
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    Ok(tokens)
}

fn tag_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw).map(str::to_string).map_err(xml_error)
}

/// Cursor over the token stream
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Skip indentation between structural elements
    fn skip_whitespace(&mut self) {
        while let Some(Token::Text(text)) = self.peek() {
            if !text.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<()> {
        self.skip_whitespace();
        match self.next() {
            Some(Token::Open(found)) if found == name => Ok(()),
            other => Err(unexpected(&format!("<{}>", name), other)),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<()> {
        self.skip_whitespace();
        match self.next() {
            Some(Token::Close(found)) if found == name => Ok(()),
            other => Err(unexpected(&format!("</{}>", name), other)),
        }
    }

    /// Whether the next structural token opens `name`
    fn at_open(&mut self, name: &str) -> bool {
        self.skip_whitespace();
        matches!(self.peek(), Some(Token::Open(found)) if found == name)
    }

    /// Text content up to the closing tag of `name`
    fn text_until_close(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next() {
                Some(Token::Text(t)) => text.push_str(&t),
                Some(Token::Close(found)) if found == name => return Ok(text),
                other => return Err(unexpected(&format!("</{}>", name), other)),
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.expect_open("value")?;

        // Untyped values are strings, whitespace included
        let mut untyped = String::new();
        while let Some(Token::Text(t)) = self.peek() {
            untyped.push_str(t);
            self.pos += 1;
        }
        if let Some(Token::Close(found)) = self.peek() {
            if found == "value" {
                self.pos += 1;
                return Ok(Value::String(untyped));
            }
        }
        if !untyped.trim().is_empty() {
            return Err(Error::rpc(format!("unexpected text in <value>: {}", untyped.trim())));
        }

        let kind = match self.next() {
            Some(Token::Open(kind)) => kind,
            other => return Err(unexpected("a value type", other)),
        };

        let value = match kind.as_str() {
            "string" => Value::String(self.text_until_close(&kind)?),
            "base64" | "dateTime.iso8601" => typed(&kind, Value::String(self.text_until_close(&kind)?)),
            "int" | "i4" | "i8" => {
                let text = self.text_until_close(&kind)?;
                let n: i64 = text
                    .trim()
                    .parse()
                    .map_err(|_| Error::rpc(format!("invalid <{}>: {}", kind, text)))?;
                if kind == "i8" {
                    typed(&kind, Value::Number(n.into()))
                } else {
                    Value::Number(n.into())
                }
            }
            "double" => {
                let text = self.text_until_close(&kind)?;
                let f: f64 = text
                    .trim()
                    .parse()
                    .map_err(|_| Error::rpc(format!("invalid <double>: {}", text)))?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| Error::rpc(format!("non-finite <double>: {}", text)))?
            }
            "boolean" => {
                let text = self.text_until_close(&kind)?;
                match text.trim() {
                    "1" | "true" => Value::Bool(true),
                    "0" | "false" => Value::Bool(false),
                    other => return Err(Error::rpc(format!("invalid <boolean>: {}", other))),
                }
            }
            "nil" => {
                self.expect_close("nil")?;
                Value::Null
            }
            "struct" => {
                let mut members = Map::new();
                while self.at_open("member") {
                    self.expect_open("member")?;
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let member = self.value()?;
                    self.expect_close("member")?;
                    members.insert(name, member);
                }
                self.expect_close("struct")?;
                Value::Object(members)
            }
            "array" => {
                let mut items = Vec::new();
                self.expect_open("data")?;
                while self.at_open("value") {
                    items.push(self.value()?);
                }
                self.expect_close("data")?;
                self.expect_close("array")?;
                Value::Array(items)
            }
            other => return Err(Error::rpc(format!("unsupported value type <{}>", other))),
        };

        self.expect_close("value")?;
        Ok(value)
    }
}

fn unexpected(expected: &str, found: Option<Token>) -> Error {
    let found = match found {
        Some(Token::Open(name)) => format!("<{}>", name),
        Some(Token::Close(name)) => format!("</{}>", name),
        Some(Token::Text(text)) => format!("text {:?}", text),
        None => "end of document".to_string(),
    };
    Error::rpc(format!("expected {}, found {}", expected, found))
}

/// Decode a `methodResponse` document
///
/// # Errors
///
/// [`Error::Rpc`] for a `<fault>` response or a malformed document.
pub fn parse_response(xml: &str) -> Result<Value> {
    let mut parser = Parser::new(tokenize(xml)?);

    parser.expect_open("methodResponse")?;

    if parser.at_open("fault") {
        parser.expect_open("fault")?;
        let fault = parser.value()?;
        let code = fault
            .get("faultCode")
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let message = fault
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("no fault string");
        return Err(Error::rpc(format!("fault {}: {}", code, message)));
    }

    parser.expect_open("params")?;
    parser.expect_open("param")?;
    let value = parser.value()?;
    parser.expect_close("param")?;
    parser.expect_close("params")?;
    parser.expect_close("methodResponse")?;

    Ok(value)
}
