//! Minimal XML-RPC encoding and decoding for the supervisord interface.
//!
//! Supervisord speaks XML-RPC; the subset it actually emits is small:
//! scalar values (`i4`/`int`, `boolean`, `string`, `double`), arrays, and
//! structs. These are pure functions over strings so they can be tested
//! against canned responses without a socket.

use std::collections::HashMap;

/// Error type for malformed XML-RPC documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xml-rpc parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    Array(Vec<Value>),
    Struct(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// A decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Fault { code: i64, message: String },
}

/// Renders a parameterless `<methodCall>` body.
pub fn method_call(method: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall>\n<methodName>{}</methodName>\n<params></params>\n</methodCall>\n",
        escape(method)
    )
}

/// Parses a `<methodResponse>` document into a success value or a fault.
pub fn parse_response(body: &str) -> Result<Response, ParseError> {
    let start = body
        .find("<methodResponse>")
        .ok_or_else(|| ParseError::new("missing <methodResponse>"))?;
    let mut cur = Cursor::new(&body[start + "<methodResponse>".len()..]);

    if cur.eat("<fault>") {
        let value = parse_value(&mut cur)?;
        cur.expect("</fault>")?;
        let (code, message) = match &value {
            Value::Struct(fields) => (
                fields.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
                fields
                    .get("faultString")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            ),
            _ => (0, String::new()),
        };
        Ok(Response::Fault { code, message })
    } else {
        cur.expect("<params>")?;
        cur.expect("<param>")?;
        let value = parse_value(&mut cur)?;
        cur.expect("</param>")?;
        cur.expect("</params>")?;
        Ok(Response::Success(value))
    }
}

/// Byte cursor over the response text.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Consumes `token` if it is next (after whitespace).
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if let Some(rest) = self.rest.strip_prefix(token) {
            self.rest = rest;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            let got: String = self.rest.chars().take(24).collect();
            Err(ParseError::new(format!(
                "expected {}, found {:?}",
                token, got
            )))
        }
    }

    /// Returns the text before the next `token` and consumes through it.
    fn until(&mut self, token: &str) -> Result<&'a str, ParseError> {
        match self.rest.find(token) {
            Some(idx) => {
                let text = &self.rest[..idx];
                self.rest = &self.rest[idx + token.len()..];
                Ok(text)
            }
            None => Err(ParseError::new(format!("missing {}", token))),
        }
    }

    fn peek(&mut self, token: &str) -> bool {
        self.skip_ws();
        self.rest.starts_with(token)
    }
}

fn parse_value(cur: &mut Cursor<'_>) -> Result<Value, ParseError> {
    cur.expect("<value>")?;

    let value = if cur.eat("<int>") {
        parse_int(cur.until("</int>")?)?
    } else if cur.eat("<i4>") {
        parse_int(cur.until("</i4>")?)?
    } else if cur.eat("<boolean>") {
        Value::Bool(cur.until("</boolean>")?.trim() == "1")
    } else if cur.eat("<string>") {
        Value::String(unescape(cur.until("</string>")?))
    } else if cur.eat("<double>") {
        let text = cur.until("</double>")?;
        let n: f64 = text
            .trim()
            .parse()
            .map_err(|_| ParseError::new(format!("invalid double {:?}", text)))?;
        Value::Double(n)
    } else if cur.eat("<array>") {
        cur.expect("<data>")?;
        let mut items = Vec::new();
        while cur.peek("<value>") {
            items.push(parse_value(cur)?);
        }
        cur.expect("</data>")?;
        cur.expect("</array>")?;
        Value::Array(items)
    } else if cur.eat("<struct>") {
        let mut fields = HashMap::new();
        while cur.eat("<member>") {
            cur.expect("<name>")?;
            let name = unescape(cur.until("</name>")?);
            let value = parse_value(cur)?;
            cur.expect("</member>")?;
            fields.insert(name, value);
        }
        cur.expect("</struct>")?;
        Value::Struct(fields)
    } else if cur.peek("</value>") {
        // <value></value>: an empty untyped string
        Value::String(String::new())
    } else if cur.peek("<") {
        let got: String = cur.rest.chars().take(24).collect();
        return Err(ParseError::new(format!("unsupported value type {:?}", got)));
    } else {
        // Untyped values carry string content.
        return Ok(Value::String(unescape(cur.until("</value>")?.trim_end())));
    };

    cur.expect("</value>")?;
    Ok(value)
}

fn parse_int(text: &str) -> Result<Value, ParseError> {
    text.trim()
        .parse()
        .map(Value::Int)
        .map_err(|_| ParseError::new(format!("invalid integer {:?}", text)))
}

/// Escapes the characters XML cannot carry literally.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes the named entities Python's marshaller emits, plus numeric refs.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let Some(end) = rest.find(';') else {
            // A stray '&' with no terminator: keep it literally.
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let decoded = entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                        continue;
                    }
                }
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call_body() {
        let body = method_call("supervisor.getAllProcessInfo");
        assert!(body.contains("<methodName>supervisor.getAllProcessInfo</methodName>"));
        assert!(body.starts_with("<?xml"));
    }

    #[test]
    fn test_parse_scalar_response() {
        let body = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n<value><int>3</int></value>\n</param>\n</params>\n</methodResponse>\n";
        assert_eq!(
            parse_response(body).unwrap(),
            Response::Success(Value::Int(3))
        );
    }

    #[test]
    fn test_parse_untyped_string_value() {
        let body = "<methodResponse><params><param><value>plain</value></param></params></methodResponse>";
        assert_eq!(
            parse_response(body).unwrap(),
            Response::Success(Value::String("plain".to_string()))
        );
    }

    #[test]
    fn test_parse_process_info_response() {
        // Shape of a supervisor.getAllProcessInfo answer, trimmed to the
        // fields the client reads.
        let body = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n<value><array><data>\n<value><struct>\n<member><name>name</name><value><string>worker</string></value></member>\n<member><name>group</name><value><string>pool</string></value></member>\n<member><name>pid</name><value><int>4242</int></value></member>\n<member><name>statename</name><value><string>RUNNING</string></value></member>\n</struct></value>\n<value><struct>\n<member><name>name</name><value><string>cron</string></value></member>\n<member><name>group</name><value><string>cron</string></value></member>\n<member><name>pid</name><value><int>0</int></value></member>\n<member><name>statename</name><value><string>STOPPED</string></value></member>\n</struct></value>\n</data></array></value>\n</param>\n</params>\n</methodResponse>\n";

        let Response::Success(Value::Array(entries)) = parse_response(body).unwrap() else {
            panic!("expected array response");
        };
        assert_eq!(entries.len(), 2);

        let Value::Struct(first) = &entries[0] else {
            panic!("expected struct entry");
        };
        assert_eq!(first.get("name").and_then(Value::as_str), Some("worker"));
        assert_eq!(first.get("pid").and_then(Value::as_i64), Some(4242));
        assert_eq!(
            first.get("statename").and_then(Value::as_str),
            Some("RUNNING")
        );
    }

    #[test]
    fn test_parse_fault_response() {
        let body = "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n<member><name>faultCode</name><value><int>6</int></value></member>\n<member><name>faultString</name><value><string>SHUTDOWN_STATE</string></value></member>\n</struct></value>\n</fault>\n</methodResponse>\n";
        assert_eq!(
            parse_response(body).unwrap(),
            Response::Fault {
                code: 6,
                message: "SHUTDOWN_STATE".to_string()
            }
        );
    }

    #[test]
    fn test_parse_boolean_and_double() {
        let body = "<methodResponse><params><param><value><array><data><value><boolean>1</boolean></value><value><double>2.5</double></value></data></array></value></param></params></methodResponse>";
        assert_eq!(
            parse_response(body).unwrap(),
            Response::Success(Value::Array(vec![
                Value::Bool(true),
                Value::Double(2.5)
            ]))
        );
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(unescape("&quot;q&quot; &apos;a&apos;"), "\"q\" 'a'");
        assert_eq!(unescape("&#65;&#x42;"), "AB");
        assert_eq!(unescape("broken & alone"), "broken & alone");
        assert_eq!(unescape("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_parse_missing_close_is_error() {
        let body = "<methodResponse><params><param><value><string>oops</value></param></params></methodResponse>";
        assert!(parse_response(body).is_err());
    }
}
