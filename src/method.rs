//! HTTP method as a typed enum.
//!
//! Only the methods a route annotation may name are represented. Anything
//! else is rejected at parse time with [`ParseError::InvalidMethod`] and, at
//! the server level, with `405 Method Not Allowed` before it reaches a
//! handler.
//!
//! [`ParseError::InvalidMethod`]: crate::ParseError::InvalidMethod

use std::fmt;
use std::str::FromStr;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Every routable method, in wire-name order.
    pub const ALL: [Method; 5] = [
        Self::Delete,
        Self::Get,
        Self::Patch,
        Self::Post,
        Self::Put,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }
}

/// The method string was not one of `GET`, `POST`, `PUT`, `DELETE`, `PATCH`.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "PATCH"  => Ok(Self::Patch),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(UnknownMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
