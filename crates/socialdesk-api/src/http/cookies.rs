//! Cookie parsing and `Set-Cookie` construction.
//!
//! Every cookie we issue is `HttpOnly; SameSite=Lax; Path=/`, plus `Secure`
//! when the server is configured for HTTPS.

use std::convert::Infallible;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use chrono::TimeDelta;
use socialdesk_core::identity::RequestCookies;

pub const SESSION_COOKIE: &str = "session_id";
pub const ANONYMOUS_COOKIE: &str = "anonymous_user_id";

/// Value of the named cookie across all `Cookie` headers. First match wins.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

pub fn request_cookies(headers: &HeaderMap) -> RequestCookies {
    RequestCookies {
        session_id: cookie_value(headers, SESSION_COOKIE),
        anonymous_user_id: cookie_value(headers, ANONYMOUS_COOKIE),
    }
}

fn build(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` headers to attach to a response.
#[derive(Debug, Default)]
pub struct SetCookies {
    secure: bool,
    cookies: Vec<String>,
}

impl SetCookies {
    pub fn new(secure: bool) -> Self {
        Self {
            secure,
            cookies: Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: &str, max_age: TimeDelta) {
        let secs = max_age.num_seconds().max(0);
        self.cookies.push(build(name, value, secs, self.secure));
    }

    pub fn clear(&mut self, name: &str) {
        self.cookies.push(build(name, "", 0, self.secure));
    }
}

impl IntoResponseParts for SetCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.cookies {
            match HeaderValue::try_from(cookie) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "dropping unencodable Set-Cookie header"),
            }
        }
        Ok(res)
    }
}
