//! Route descriptors and the `@RestOperation` annotation grammar.
//!
//! An annotation is a marker followed by a parenthesized list of
//! `key = value` pairs:
//!
//! ```text
//! @RestOperation( method = "GET", path = "/person/{uid}", middlewares = ["Auth" "Logging"], timeout = 30, disableAuth = true )
//! ```
//!
//! | key | value | default |
//! |---|---|---|
//! | `method` | quoted, one of `GET POST PUT DELETE PATCH` | required |
//! | `path` | quoted template, placeholders are not interpreted | required |
//! | `middlewares` | bracketed list of quoted names | `[]` |
//! | `timeout` | unquoted integer, seconds | `30` |
//! | `disableAuth` | unquoted `true` / `false` | `false` |
//!
//! Key order does not matter and unknown keys are ignored so that newer
//! annotations still parse on older engines.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::method::Method;

/// The annotation marker looked for in doc comments.
pub const MARKER: &str = "@RestOperation";

/// Timeout applied when an annotation does not name one.
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@RestOperation\s*\((.*)\)").expect("annotation regex should be valid")
});

/// A validated route: method, path template, middleware chain and the two
/// pieces of metadata carried for the router (timeout, auth opt-out).
///
/// Fields are private; a `RouteDescriptor` that exists has passed
/// validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteDescriptor {
    method: Method,
    path: String,
    middlewares: Vec<String>,
    timeout_secs: i64,
    disable_auth: bool,
}

impl RouteDescriptor {
    /// A descriptor with default middleware, timeout and auth settings.
    pub fn new(method: Method, path: impl Into<String>) -> Result<Self, ParseError> {
        Self::validated(Fields {
            method: Some(method.as_str().to_owned()),
            path: Some(path.into()),
            ..Fields::default()
        })
    }

    /// Replaces the middleware chain. Names run outermost first.
    ///
    /// A name must be non-empty and free of whitespace, `"`, `,`, `[` and
    /// `]`, the characters the bracketed list syntax splits on.
    pub fn with_middlewares<I, S>(mut self, names: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.iter().try_for_each(|name| check_middleware_name(name))?;
        self.middlewares = names;
        Ok(self)
    }

    pub fn with_timeout(mut self, secs: i64) -> Result<Self, ParseError> {
        if secs < 0 {
            return Err(ParseError::InvalidTimeout { value: secs.to_string(), source: None });
        }
        self.timeout_secs = secs;
        Ok(self)
    }

    pub fn with_disable_auth(mut self, disable: bool) -> Self {
        self.disable_auth = disable;
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn middlewares(&self) -> &[String] { &self.middlewares }

    /// Carried for the router or middleware to interpret; never enforced here.
    pub fn timeout_secs(&self) -> i64 { self.timeout_secs }
    pub fn disable_auth(&self) -> bool { self.disable_auth }

    /// Parses the first `@RestOperation(...)` found in `annotation`.
    pub fn parse(annotation: &str) -> Result<Self, ParseError> {
        parse(annotation)
    }

    fn validated(fields: Fields) -> Result<Self, ParseError> {
        let method = match fields.method {
            None => return Err(ParseError::MissingMethod),
            Some(m) if m.is_empty() => return Err(ParseError::MissingMethod),
            Some(m) => m.parse::<Method>().map_err(|e| ParseError::InvalidMethod(e.0))?,
        };
        let path = match fields.path {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ParseError::MissingPath),
        };
        if path.chars().any(|c| c == '"' || c.is_control()) {
            return Err(ParseError::InvalidFormat {
                detail: format!("path {path:?} may not contain quotes or control characters"),
            });
        }
        if fields.timeout_secs < 0 {
            return Err(ParseError::InvalidTimeout {
                value: fields.timeout_secs.to_string(),
                source: None,
            });
        }
        fields.middlewares.iter().try_for_each(|name| check_middleware_name(name))?;
        Ok(Self {
            method,
            path,
            middlewares: fields.middlewares,
            timeout_secs: fields.timeout_secs,
            disable_auth: fields.disable_auth,
        })
    }
}

/// Renders the canonical annotation text; parsing it back yields an equal
/// descriptor.
impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"{MARKER}( method = "{}", path = "{}", middlewares = ["#, self.method, self.path)?;
        for (i, name) in self.middlewares.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, r#""{name}""#)?;
        }
        write!(f, "], timeout = {}, disableAuth = {} )", self.timeout_secs, self.disable_auth)
    }
}

/// Raw values pulled out of the parameter list, before validation.
struct Fields {
    method: Option<String>,
    path: Option<String>,
    middlewares: Vec<String>,
    timeout_secs: i64,
    disable_auth: bool,
}

impl Default for Fields {
    fn default() -> Self {
        Self {
            method: None,
            path: None,
            middlewares: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            disable_auth: false,
        }
    }
}

/// Parses one annotation into a validated [`RouteDescriptor`].
///
/// Extraction runs first and fails on a malformed list or an unparseable
/// timeout. Validation then checks, in order and stopping at the first
/// failure: method present, method known, path present, timeout not
/// negative.
pub fn parse(annotation: &str) -> Result<RouteDescriptor, ParseError> {
    let params = ANNOTATION
        .captures(annotation)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ParseError::InvalidFormat {
            detail: format!("no `{MARKER}(...)` in `{}`", annotation.trim()),
        })?
        .as_str();

    let mut fields = Fields::default();
    for segment in split_top_level(params)? {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').ok_or_else(|| ParseError::InvalidFormat {
            detail: format!("expected `key = value`, got `{segment}`"),
        })?;
        let key = key.trim();
        if !is_identifier(key) {
            return Err(ParseError::InvalidFormat { detail: format!("invalid key `{key}`") });
        }
        let value = value.trim();
        match key {
            "method"      => fields.method = Some(unquote(value).to_owned()),
            "path"        => fields.path = Some(unquote(value).to_owned()),
            "middlewares" => fields.middlewares = parse_list(value),
            "timeout"     => {
                fields.timeout_secs = value.parse().map_err(|e| ParseError::InvalidTimeout {
                    value: value.to_owned(),
                    source: Some(e),
                })?;
            }
            "disableAuth" => fields.disable_auth = value == "true",
            _             => {}
        }
    }

    RouteDescriptor::validated(fields)
}

/// Splits on commas that sit outside double quotes and square brackets.
/// A quote left open at the end is a format error.
fn split_top_level(params: &str) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(ParseError::InvalidFormat {
            detail: format!("unterminated quote in `{}`", params.trim()),
        });
    }
    parts.push(&params[start..]);
    Ok(parts)
}

/// `["Auth" "Logging"]` → `["Auth", "Logging"]`. Commas between elements
/// are accepted as well as whitespace.
fn parse_list(value: &str) -> Vec<String> {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(unquote)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

fn check_middleware_name(name: &str) -> Result<(), ParseError> {
    let unlisted = |c: char| c.is_whitespace() || matches!(c, '"' | ',' | '[' | ']');
    if name.is_empty() || name.chars().any(unlisted) {
        return Err(ParseError::InvalidFormat {
            detail: format!("middleware name {name:?} cannot be written in a list"),
        });
    }
    Ok(())
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
