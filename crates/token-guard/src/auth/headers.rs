//! Authorization header access across request representations.

use axum::http::{header, HeaderMap};
use std::borrow::Cow;
use std::collections::HashMap;

/// Anything a bearer token can be read from.
pub trait HeaderSource {
    /// Raw `Authorization` header value, if present.
    fn authorization(&self) -> Option<Cow<'_, str>>;
}

impl HeaderSource for HeaderMap {
    fn authorization(&self) -> Option<Cow<'_, str>> {
        // Non-UTF-8 bytes are replaced, so the value still fails token decoding
        self.get(header::AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
    }
}

/// Plain header maps use lowercase keys; `Authorization` is accepted too.
impl HeaderSource for HashMap<String, String> {
    fn authorization(&self) -> Option<Cow<'_, str>> {
        self.get("authorization")
            .or_else(|| self.get("Authorization"))
            .map(|value| Cow::Borrowed(value.as_str()))
    }
}
