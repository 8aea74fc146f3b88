//! Cookie text parsing and serialization.
//!
//! Converts between [`Cookie`] records and the `name=value; Attr=...`
//! header-style text used for import/export. Parsing is intentionally
//! lenient about attribute order and casing but **never** silent about
//! garbage: input with no `name=value` pair is rejected with
//! [`CookieTextError::Unparseable`] instead of yielding a partial record.

use crate::cookies::cookie::{Cookie, SameSite};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// `Expires` attribute format (`Sat, 01 Jan 2033 00:00:00 GMT`).
const EXPIRES_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// A cookie parsed from text. Attributes that were absent stay `None`;
/// the caller decides the defaults when materializing a [`Cookie`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Raw `Expires` attribute value, untouched.
    pub expires: Option<String>,
    /// Raw `Max-Age` attribute value, untouched.
    pub max_age: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

#[derive(Debug, thiserror::Error)]
pub enum CookieTextError {
    /// The input contained no `name=value` pair at all.
    #[error("unparseable cookie text: no name=value pair found")]
    Unparseable,
}

/// Parses header-style cookie text into a [`ParsedCookie`].
///
/// Attribute keys are matched ASCII-case-insensitively. The first segment
/// that is not a known attribute becomes the cookie's name/value pair.
pub fn parse_cookie_str(text: &str) -> Result<ParsedCookie, CookieTextError> {
    let mut parsed = ParsedCookie::default();
    let mut named = false;

    for part in text.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), Some(v.trim())),
            None => (part.to_ascii_lowercase(), None),
        };
        // `Domain=;` style attributes carry no value
        let value = value.filter(|v| !v.is_empty());

        match key.as_str() {
            "path" => parsed.path = value.map(str::to_string),
            "domain" => parsed.domain = value.map(str::to_string),
            "expires" => parsed.expires = value.map(str::to_string),
            "max-age" => parsed.max_age = value.map(str::to_string),
            "secure" => parsed.secure = true,
            "httponly" => parsed.http_only = true,
            "samesite" => {
                parsed.same_site = match value.map(str::to_ascii_lowercase).as_deref() {
                    Some("none") => SameSite::NoRestriction,
                    Some("lax") => SameSite::Lax,
                    Some("strict") => SameSite::Strict,
                    _ => SameSite::Unspecified,
                }
            }
            _ => {
                if !named && !key.is_empty() {
                    parsed.name = key;
                    parsed.value = value.unwrap_or_default().to_string();
                    named = true;
                }
            }
        }
    }

    if !named {
        return Err(CookieTextError::Unparseable);
    }
    Ok(parsed)
}

/// Serializes a [`Cookie`] into header-style text.
///
/// Session cookies omit `Expires`; [`SameSite::Unspecified`] omits the
/// `SameSite` attribute.
pub fn serialize_cookie(cookie: &Cookie) -> String {
    let mut out = format!(
        "{}={}; Path={}; Domain={};",
        cookie.name, cookie.value, cookie.path, cookie.domain
    );

    if cookie.http_only {
        out.push_str(" HttpOnly;");
    }
    if cookie.secure {
        out.push_str(" Secure;");
    }
    if let Some(expires) = cookie.expiration_date.and_then(format_expires) {
        out.push_str(&format!(" Expires={expires};"));
    }
    if let Some(attr) = cookie.same_site.as_attribute() {
        out.push_str(&format!(" SameSite={attr};"));
    }

    out
}

/// Parse-of-serialize: reduces a host cookie record to the attributes that
/// survive the text form. Used when exporting cookies as JSON.
pub fn prune_cookie(cookie: &Cookie) -> ParsedCookie {
    // Serialization always emits a name=value pair, so this cannot fail.
    parse_cookie_str(&serialize_cookie(cookie)).unwrap_or_default()
}

fn format_expires(timestamp: f64) -> Option<String> {
    let dt = OffsetDateTime::from_unix_timestamp(timestamp as i64).ok()?;
    dt.format(EXPIRES_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_value_and_attributes() {
        let parsed =
            parse_cookie_str("sid=abc; Path=/; Domain=.example.com; Secure; HttpOnly; SameSite=Lax")
                .unwrap();
        assert_eq!(parsed.name, "sid");
        assert_eq!(parsed.value, "abc");
        assert_eq!(parsed.path.as_deref(), Some("/"));
        assert_eq!(parsed.domain.as_deref(), Some(".example.com"));
        assert!(parsed.secure);
        assert!(parsed.http_only);
        assert_eq!(parsed.same_site, SameSite::Lax);
    }

    #[test]
    fn attribute_keys_match_case_insensitively() {
        let parsed = parse_cookie_str("a=1; PATH=/x; dOmAiN=e.com; SECURE; SameSite=NONE").unwrap();
        assert_eq!(parsed.path.as_deref(), Some("/x"));
        assert_eq!(parsed.domain.as_deref(), Some("e.com"));
        assert!(parsed.secure);
        assert_eq!(parsed.same_site, SameSite::NoRestriction);
    }

    #[test]
    fn empty_attribute_value_stays_absent() {
        let parsed = parse_cookie_str("a=1; Domain=;").unwrap();
        assert_eq!(parsed.domain, None);
    }

    #[test]
    fn garbage_input_is_a_typed_error() {
        assert!(matches!(
            parse_cookie_str(""),
            Err(CookieTextError::Unparseable)
        ));
        assert!(matches!(
            parse_cookie_str("; ; ;"),
            Err(CookieTextError::Unparseable)
        ));
        // only attributes, no cookie pair
        assert!(matches!(
            parse_cookie_str("Secure; HttpOnly"),
            Err(CookieTextError::Unparseable)
        ));
    }

    #[test]
    fn serializes_flags_expiry_and_same_site() {
        let cookie = Cookie {
            name: "sid".into(),
            value: "abc".into(),
            domain: ".example.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            same_site: SameSite::Strict,
            expiration_date: Some(1988150400.0),
            host_only: false,
            store_id: None,
        };
        let text = serialize_cookie(&cookie);
        assert!(text.starts_with("sid=abc; Path=/; Domain=.example.com;"));
        assert!(text.contains(" HttpOnly;"));
        assert!(text.contains(" Secure;"));
        assert!(text.contains(" Expires=Sat, 01 Jan 2033 00:00:00 GMT;"));
        assert!(text.contains(" SameSite=Strict;"));
    }

    #[test]
    fn session_cookie_serializes_without_expires() {
        let cookie = Cookie {
            name: "tmp".into(),
            value: "1".into(),
            domain: "a.com".into(),
            path: "/".into(),
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            expiration_date: None,
            host_only: true,
            store_id: None,
        };
        let text = serialize_cookie(&cookie);
        assert!(!text.contains("Expires="));
        assert!(!text.contains("SameSite="));
    }

    #[test]
    fn prune_round_trips_through_text() {
        let cookie = Cookie {
            name: "sid".into(),
            value: "abc".into(),
            domain: ".example.com".into(),
            path: "/app".into(),
            secure: true,
            http_only: false,
            same_site: SameSite::Lax,
            expiration_date: None,
            host_only: false,
            store_id: Some("0".into()),
        };
        let pruned = prune_cookie(&cookie);
        assert_eq!(pruned.name, "sid");
        assert_eq!(pruned.value, "abc");
        assert_eq!(pruned.domain.as_deref(), Some(".example.com"));
        assert_eq!(pruned.path.as_deref(), Some("/app"));
        assert!(pruned.secure);
        assert_eq!(pruned.same_site, SameSite::Lax);
        // storeId does not survive the text form
    }
}
