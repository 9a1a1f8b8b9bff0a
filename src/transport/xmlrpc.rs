//! XML-RPC over HTTP, the default transport.
//! Requests are rendered directly as text; responses are read with `quick-xml` into
//! `serde_json::Value` (dateTime and base64 values stay as their string form).

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Number, Value};
use tracing::warn;

use super::{Connector, Service, Transport, TransportError};
use crate::config::ClientConfig;
use crate::error::OdooResult;

#[derive(Debug, Clone)]
struct HttpSettings {
    skip_tls_verify: bool,
    request_timeout: Option<Duration>,
}

/// Opens XML-RPC handles against `<base>/xmlrpc/2/{common,object}`.
/// All handles share one lazily built blocking HTTP client.
#[derive(Clone)]
pub struct XmlRpcConnector {
    base: String,
    settings: HttpSettings,
    http: Arc<OnceCell<reqwest::blocking::Client>>,
}

impl XmlRpcConnector {
    pub fn new(config: &ClientConfig) -> OdooResult<Self> {
        if config.skip_tls_verify {
            warn!(target: "odoo::transport", "TLS certificate verification is disabled for Odoo connections; do not use in production");
        }
        Ok(Self {
            base: config.url.trim_end_matches('/').to_string(),
            settings: HttpSettings { skip_tls_verify: config.skip_tls_verify, request_timeout: config.request_timeout },
            http: Arc::new(OnceCell::new()),
        })
    }
}

impl Connector for XmlRpcConnector {
    fn open(&self, service: Service) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(XmlRpcTransport {
            url: format!("{}{}", self.base, service.path()),
            settings: self.settings.clone(),
            http: self.http.clone(),
        }))
    }
}

pub struct XmlRpcTransport {
    url: String,
    settings: HttpSettings,
    http: Arc<OnceCell<reqwest::blocking::Client>>,
}

impl XmlRpcTransport {
    // Built on first call, which always runs on a blocking worker.
    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.http.get_or_try_init(|| {
            // `None` disables reqwest's own 30s default.
            reqwest::blocking::Client::builder()
                .connect_timeout(Duration::from_secs(15))
                .timeout(self.settings.request_timeout)
                .danger_accept_invalid_certs(self.settings.skip_tls_verify)
                .build()
                .map_err(|e| TransportError::Connect(e.to_string()))
        })
    }
}

impl Transport for XmlRpcTransport {
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let body = encode_call(method, &params)?;
        let resp = self.client()?
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Http(format!("HTTP {} from {}", status, self.url)));
        }
        let text = resp.text().map_err(|e| TransportError::Http(e.to_string()))?;
        decode_response(&text)
    }

    fn ident(&self) -> String { format!("xmlrpc:{}", self.url) }
}

// ---------------------------------------------------------------------------
// Encoding

/// Render a `methodCall`. Fails on numbers XML-RPC cannot carry (unsigned above `i64::MAX`).
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, TransportError> {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for p in params {
        out.push_str("<param>");
        encode_value(p, &mut out)?;
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    Ok(out)
}

fn encode_value(v: &Value, out: &mut String) -> Result<(), TransportError> {
    out.push_str("<value>");
    match v {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::Number(n) => encode_number(n, out)?,
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for it in items { encode_value(it, out)?; }
            out.push_str("</data></array>");
        }
        Value::Object(map) => {
            out.push_str("<struct>");
            for (k, it) in map {
                out.push_str("<member><name>");
                out.push_str(&escape(k.as_str()));
                out.push_str("</name>");
                encode_value(it, out)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
    Ok(())
}

fn encode_number(n: &Number, out: &mut String) -> Result<(), TransportError> {
    if let Some(i) = n.as_i64() {
        if i32::try_from(i).is_ok() {
            out.push_str(&format!("<int>{}</int>", i));
        } else {
            out.push_str(&format!("<i8>{}</i8>", i));
        }
        return Ok(());
    }
    if n.is_u64() {
        return Err(TransportError::Encode(format!("integer {} does not fit in a signed 64-bit <i8>", n)));
    }
    match n.as_f64() {
        Some(f) => {
            out.push_str(&format!("<double>{}</double>", f));
            Ok(())
        }
        None => Err(TransportError::Encode(format!("number {} has no XML-RPC form", n))),
    }
}

// ---------------------------------------------------------------------------
// Decoding

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn decode_err(msg: impl Into<String>) -> TransportError { TransportError::Decode(msg.into()) }

fn tokenize(body: &str) -> Result<Vec<Token>, TransportError> {
    // Text is kept verbatim; whitespace between structural tags is skipped by the cursor.
    let mut reader = Reader::from_str(body);
    let mut out = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => out.push(Token::Open(String::from_utf8_lossy(e.name().as_ref()).into_owned())),
            Ok(Event::End(e)) => out.push(Token::Close(String::from_utf8_lossy(e.name().as_ref()).into_owned())),
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                out.push(Token::Open(name.clone()));
                out.push(Token::Close(name));
            }
            Ok(Event::Text(t)) => {
                let s = t.unescape().map_err(|e| decode_err(e.to_string()))?;
                out.push(Token::Text(s.into_owned()));
            }
            Ok(Event::CData(c)) => out.push(Token::Text(String::from_utf8_lossy(&c.into_inner()).into_owned())),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_err(format!("malformed XML at {}: {}", reader.buffer_position(), e))),
        }
    }
    Ok(out)
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    fn next(&mut self) -> Result<Token, TransportError> {
        let t = self.tokens.get(self.pos).cloned().ok_or_else(|| decode_err("unexpected end of response"))?;
        self.pos += 1;
        Ok(t)
    }

    fn skip_ws(&mut self) {
        while matches!(self.tokens.get(self.pos), Some(Token::Text(s)) if s.trim().is_empty()) {
            self.pos += 1;
        }
    }

    fn peek_open(&mut self, name: &str) -> bool {
        self.skip_ws();
        matches!(self.peek(), Some(Token::Open(n)) if n == name)
    }

    fn open(&mut self, name: &str) -> Result<(), TransportError> {
        self.skip_ws();
        match self.next()? {
            Token::Open(n) if n == name => Ok(()),
            other => Err(decode_err(format!("expected <{}>, found {:?}", name, other))),
        }
    }

    fn close(&mut self, name: &str) -> Result<(), TransportError> {
        self.skip_ws();
        match self.next()? {
            Token::Close(n) if n == name => Ok(()),
            other => Err(decode_err(format!("expected </{}>, found {:?}", name, other))),
        }
    }

    /// Consecutive text and CDATA runs, verbatim.
    fn raw_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(Token::Text(s)) = self.tokens.get(self.pos) {
            out.push_str(s);
            self.pos += 1;
        }
        out
    }

    /// Optional text followed by the closing tag.
    fn text_then_close(&mut self, name: &str) -> Result<String, TransportError> {
        let text = self.raw_text();
        self.close(name)?;
        Ok(text)
    }
}

fn parse_value(c: &mut Cursor) -> Result<Value, TransportError> {
    c.open("value")?;
    let lead = c.raw_text();
    let v = match c.next()? {
        // untyped value defaults to string
        Token::Close(n) if n == "value" => return Ok(Value::String(lead)),
        Token::Text(_) => return Err(decode_err("unexpected text")),
        Token::Open(tag) if !lead.trim().is_empty() => {
            return Err(decode_err(format!("text before <{}> in <value>", tag)))
        }
        Token::Close(n) => return Err(decode_err(format!("unexpected </{}>", n))),
        Token::Open(tag) => match tag.as_str() {
            "int" | "i4" | "i8" => {
                let s = c.text_then_close(&tag)?;
                let n: i64 = s.trim().parse().map_err(|_| decode_err(format!("bad integer '{}'", s)))?;
                Value::from(n)
            }
            "boolean" => {
                let s = c.text_then_close(&tag)?;
                match s.trim() {
                    "1" | "true" => Value::Bool(true),
                    "0" | "false" => Value::Bool(false),
                    other => return Err(decode_err(format!("bad boolean '{}'", other))),
                }
            }
            "double" => {
                let s = c.text_then_close(&tag)?;
                let f: f64 = s.trim().parse().map_err(|_| decode_err(format!("bad double '{}'", s)))?;
                Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            }
            "string" | "dateTime.iso8601" | "base64" => Value::String(c.text_then_close(&tag)?),
            "nil" => { c.close("nil")?; Value::Null }
            "array" => {
                c.open("data")?;
                let mut items = Vec::new();
                while c.peek_open("value") { items.push(parse_value(c)?); }
                c.close("data")?;
                c.close("array")?;
                Value::Array(items)
            }
            "struct" => {
                let mut map = Map::new();
                while c.peek_open("member") {
                    c.open("member")?;
                    c.open("name")?;
                    let key = c.text_then_close("name")?;
                    let val = parse_value(c)?;
                    c.close("member")?;
                    map.insert(key, val);
                }
                c.close("struct")?;
                Value::Object(map)
            }
            other => return Err(decode_err(format!("unsupported value type <{}>", other))),
        },
    };
    c.close("value")?;
    Ok(v)
}

/// Decode a `methodResponse` body into its single return value or a fault.
pub fn decode_response(body: &str) -> Result<Value, TransportError> {
    let tokens = tokenize(body)?;
    let mut c = Cursor { tokens, pos: 0 };
    c.open("methodResponse")?;
    if c.peek_open("fault") {
        c.open("fault")?;
        let v = parse_value(&mut c)?;
        let code = v.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = v.get("faultString").and_then(Value::as_str).unwrap_or_default().to_string();
        return Err(TransportError::Fault { code, message });
    }
    c.open("params")?;
    if !c.peek_open("param") {
        c.close("params")?;
        return Ok(Value::Null);
    }
    c.open("param")?;
    let v = parse_value(&mut c)?;
    c.close("param")?;
    c.close("params")?;
    Ok(v)
}
