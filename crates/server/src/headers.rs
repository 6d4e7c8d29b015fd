//! Recovery signal extraction and response header construction.
//!
//! The cookie and validator channels ride on plain HTTP headers:
//!
//! ```text
//!   request:  Cookie: twinpath-id=<token>        If-None-Match: "<recovery key>"
//!   response: Set-Cookie: twinpath-id=<token>; … ETag: "<recovery key>"
//! ```

use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, IF_NONE_MATCH},
};
use chrono::{DateTime, TimeDelta, Utc};

/// Media type of the raw token representation.
pub const APPLICATION_JWT: &str = "application/jwt";

/// Body representations `/token` can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    /// `{"token": "<token>"}`
    Json,
    /// The token itself as `application/jwt`.
    Jwt,
}

/// Returns the value of cookie `name`, if present.
///
/// All `Cookie` headers are searched; the first pair with a matching name
/// wins. Surrounding double quotes on the value are removed.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(pair_name, _)| pair_name.trim() == name)
        .map(|(_, value)| strip_quotes(value.trim()).to_owned())
}

/// Returns the first entity tag in `If-None-Match` as a bare recovery key.
///
/// Weak tags are treated like strong ones. `*` carries no key and yields
/// `None`.
#[must_use]
pub fn validator_tag(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(IF_NONE_MATCH)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first == "*" {
        return None;
    }
    let tag = strip_quotes(first.strip_prefix("W/").unwrap_or(first));
    (!tag.is_empty()).then(|| tag.to_owned())
}

/// Formats a recovery key as a strong entity tag.
#[must_use]
pub fn entity_tag(key: &str) -> String {
    format!("\"{key}\"")
}

/// Returns the token from an `Authorization: Bearer` header.
///
/// The scheme is matched case-insensitively. Other schemes yield `None`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Builds the `Set-Cookie` value carrying a freshly signed token.
///
/// `Expires` is included alongside `Max-Age` for older clients, and is
/// omitted only if `ttl` does not fit a calendar date.
#[must_use]
pub fn identity_cookie(name: &str, token: &str, ttl: Duration, now: DateTime<Utc>) -> String {
    let mut cookie = format!("{name}={token}; Path=/; Max-Age={}", ttl.as_secs());
    if let Some(expires) = TimeDelta::from_std(ttl).ok().and_then(|ttl| now.checked_add_signed(ttl))
    {
        cookie.push_str(&format!("; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT")));
    }
    cookie.push_str("; HttpOnly");
    cookie
}

/// Chooses the `/token` body representation from an `Accept` header.
///
/// Media ranges are tried by descending quality, ties in listed order.
/// Wildcards (`*/*`, `application/*`) and a missing header select JSON.
/// Returns `None` when nothing acceptable can be produced.
#[must_use]
pub fn negotiate(accept: Option<&HeaderValue>) -> Option<Representation> {
    let Some(accept) = accept else {
        return Some(Representation::Json);
    };
    let accept = accept.to_str().ok()?;
    if accept.trim().is_empty() {
        return Some(Representation::Json);
    }

    let mut ranges: Vec<(f32, String)> = accept
        .split(',')
        .filter_map(|range| {
            let mut parts = range.split(';');
            let media = parts.next()?.trim().to_ascii_lowercase();
            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0 && !media.is_empty()).then_some((quality, media))
        })
        .collect();
    // Stable, so equal qualities keep their listed order.
    ranges.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranges.iter().find_map(|(_, media)| match media.as_str() {
        "application/json" | "application/*" | "*/*" => Some(Representation::Json),
        APPLICATION_JWT => Some(Representation::Jwt),
        _ => None,
    })
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use axum::http::header::ACCEPT;
    use chrono::TimeZone;

    use super::*;

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let map = headers(&[(COOKIE, "theme=dark; twinpath-id=abc.def.ghi; lang=en")]);
        assert_eq!(cookie_value(&map, "twinpath-id").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&map, "missing"), None);
    }

    #[test]
    fn test_cookie_value_searches_all_headers_and_strips_quotes() {
        let map = headers(&[(COOKIE, "a=1"), (COOKIE, "twinpath-id=\"quoted\"")]);
        assert_eq!(cookie_value(&map, "twinpath-id").as_deref(), Some("quoted"));
    }

    #[test]
    fn test_cookie_value_does_not_match_name_prefix() {
        let map = headers(&[(COOKIE, "twinpath-id-old=stale")]);
        assert_eq!(cookie_value(&map, "twinpath-id"), None);
    }

    #[test]
    fn test_validator_tag_variants() {
        let cases = [
            ("\"key-1\"", Some("key-1")),
            ("W/\"key-2\"", Some("key-2")),
            ("bare-key", Some("bare-key")),
            ("\"first\", \"second\"", Some("first")),
            ("*", None),
            ("\"\"", None),
        ];
        for (raw, expected) in cases {
            let map = headers(&[(IF_NONE_MATCH, raw)]);
            assert_eq!(validator_tag(&map).as_deref(), expected, "If-None-Match: {raw}");
        }
        assert_eq!(validator_tag(&HeaderMap::new()), None);
    }

    #[test]
    fn test_entity_tag_round_trips_through_validator_tag() {
        let tag = entity_tag("3b9d-key");
        let map = headers(&[(IF_NONE_MATCH, tag.as_str())]);
        assert_eq!(validator_tag(&map).as_deref(), Some("3b9d-key"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers(&[(AUTHORIZATION, "Bearer tok")])), Some("tok"));
        assert_eq!(bearer_token(&headers(&[(AUTHORIZATION, "bearer tok")])), Some("tok"));
        assert_eq!(bearer_token(&headers(&[(AUTHORIZATION, "Basic dXNlcg==")])), None);
        assert_eq!(bearer_token(&headers(&[(AUTHORIZATION, "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_identity_cookie_attributes() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let cookie = identity_cookie("sid", "t.o.k", Duration::from_secs(86_400), now);
        assert_eq!(
            cookie,
            "sid=t.o.k; Path=/; Max-Age=86400; Expires=Tue, 02 Jan 2024 00:00:00 GMT; HttpOnly"
        );
    }

    #[test]
    fn test_identity_cookie_omits_unrepresentable_expiry() {
        let cookie = identity_cookie("sid", "t", Duration::MAX, Utc::now());
        assert!(!cookie.contains("Expires="));
        assert!(cookie.ends_with("; HttpOnly"));
    }

    #[test]
    fn test_negotiate() {
        let cases = [
            ("application/json", Some(Representation::Json)),
            ("application/jwt", Some(Representation::Jwt)),
            ("*/*", Some(Representation::Json)),
            ("application/*", Some(Representation::Json)),
            ("text/html, application/jwt", Some(Representation::Jwt)),
            ("text/html, */*;q=0.8", Some(Representation::Json)),
            ("application/json;q=0.5, application/jwt", Some(Representation::Jwt)),
            ("application/jwt;q=0, application/json", Some(Representation::Json)),
            ("Application/JWT", Some(Representation::Jwt)),
            ("text/html", None),
            ("image/png, text/plain", None),
        ];
        for (raw, expected) in cases {
            let map = headers(&[(ACCEPT, raw)]);
            assert_eq!(negotiate(map.get(ACCEPT)), expected, "Accept: {raw}");
        }
        assert_eq!(negotiate(None), Some(Representation::Json));
    }
}
