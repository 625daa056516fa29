//! Cookie records, `document.cookie` formatting and parsing.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Two years, the lifetime of every attribution cookie.
pub const COOKIE_LIFETIME_MS: i64 = 63_072_000_000;

/// A cookie as written by the landing beacon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
    /// `SameSite=None`, so the cookie is sent on cross-site requests.
    pub same_site_none: bool,
    pub secure: bool,
}

impl Cookie {
    /// Site-wide, cross-site capable cookie expiring `lifetime_ms` after `now`.
    ///
    /// An expiry past the representable range saturates at `DateTime::<Utc>::MAX_UTC`.
    pub fn cross_site(
        name: impl Into<String>,
        value: impl Into<String>,
        now: DateTime<Utc>,
        lifetime_ms: i64,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: TimeDelta::try_milliseconds(lifetime_ms)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            path: "/".to_owned(),
            same_site_none: true,
            secure: true,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Assignment string for `document.cookie`.
    pub fn to_assignment(&self) -> String {
        let mut assignment = format!(
            "{}={}; expires={}; path={}",
            self.name,
            self.value,
            http_date(self.expires),
            self.path,
        );
        if self.same_site_none {
            assignment.push_str("; SameSite=None");
        }
        if self.secure {
            assignment.push_str("; Secure");
        }
        assignment
    }
}

/// IMF-fixdate, e.g. `Tue, 19 Oct 2027 00:00:00 GMT`.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses a `document.cookie` string (`a=1; b=2`).
///
/// Pairs with an empty name or value are skipped, and only the text up to a
/// second `=` is kept as the value.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split("; ")
        .filter_map(|pair| {
            let mut segments = pair.split('=');
            let name = segments.next()?;
            let value = segments.next()?;
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Percent-decodes an identifier value before it goes into a cookie.
///
/// Returns `None` when the decoded bytes are not UTF-8.
pub fn decode_value(raw: &str) -> Option<String> {
    percent_decode_str(raw).decode_utf8().ok().map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(0).unwrap()
    }

    #[test]
    fn cross_site_cookie_lives_two_years() {
        let cookie = Cookie::cross_site("CL_p", "x", epoch(), COOKIE_LIFETIME_MS);
        assert_eq!(cookie.expires.timestamp_millis(), 63_072_000_000);
        assert!(!cookie.is_expired_at(epoch()));
        assert!(cookie.is_expired_at(cookie.expires));
    }

    #[test]
    fn oversized_lifetime_saturates_expiry() {
        let cookie = Cookie::cross_site("CL_p", "x", epoch(), 9_000_000_000_000_000);
        assert_eq!(cookie.expires, DateTime::<Utc>::MAX_UTC);
        let cookie = Cookie::cross_site("CL_p", "x", epoch(), i64::MAX);
        assert_eq!(cookie.expires, DateTime::<Utc>::MAX_UTC);
        assert!(!cookie.is_expired_at(epoch()));
    }

    #[test]
    fn assignment_carries_all_attributes() {
        let cookie = Cookie::cross_site("CL_p", "abc", epoch(), COOKIE_LIFETIME_MS);
        assert_eq!(
            cookie.to_assignment(),
            "CL_p=abc; expires=Sat, 01 Jan 1972 00:00:00 GMT; path=/; SameSite=None; Secure"
        );
    }

    #[test]
    fn header_parsing_skips_incomplete_pairs() {
        let jar = parse_cookie_header("CL_p=abc; empty=; =orphan; ACT_p=js; token=a=b");
        assert_eq!(jar.get("CL_p").map(String::as_str), Some("abc"));
        assert_eq!(jar.get("ACT_p").map(String::as_str), Some("js"));
        assert_eq!(jar.get("token").map(String::as_str), Some("a"));
        assert!(!jar.contains_key("empty"));
        assert!(!jar.contains_key(""));
    }

    #[test]
    fn header_parsing_handles_empty_input() {
        assert!(parse_cookie_header("").is_empty());
    }

    #[test]
    fn decode_value_handles_percent_escapes() {
        assert_eq!(decode_value("a%2Fb%20c").as_deref(), Some("a/b c"));
        assert_eq!(decode_value("plain").as_deref(), Some("plain"));
        assert_eq!(decode_value("%FF"), None);
    }
}
