// Host-scoped cookie set
//
// Gateways set one or two cookies and never scope them beyond their own
// host, so this is intentionally much smaller than a browser jar: cookies
// are keyed by the host that set them and only ever sent back to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cookie::Cookie;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use url::Url;

/// Cookies grouped by host, then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet {
    domains: BTreeMap<String, BTreeMap<String, String>>,
}

/// One parsed `Set-Cookie` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// The server asked for the cookie to be deleted (`Max-Age=0` or a past
    /// `Expires`).
    pub expired: bool,
}

impl SetCookie {
    /// Parse a raw `Set-Cookie` header value. Returns `None` for entries with
    /// no `name=value` pair.
    ///
    /// `Max-Age` wins over `Expires` when both are present.
    pub fn parse(raw: &str, now: DateTime<Utc>) -> Option<Self> {
        let parsed = Cookie::parse(raw).ok()?;

        let expired = match (parsed.max_age(), parsed.expires_datetime()) {
            (Some(max_age), _) => !max_age.is_positive(),
            (None, Some(at)) => at.unix_timestamp() <= now.timestamp(),
            (None, None) => false,
        };

        Some(Self {
            name: parsed.name().to_owned(),
            value: parsed.value_trimmed().to_owned(),
            expired,
        })
    }
}

/// The host key a URL's cookies are filed under.
pub fn host_key(url: &Url) -> Option<String> {
    url.host_str().map(str::to_ascii_lowercase)
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.values().all(BTreeMap::is_empty)
    }

    /// Look up a single cookie value for `host`.
    pub fn get(&self, host: &str, name: &str) -> Option<&str> {
        self.domains
            .get(host)
            .and_then(|jar| jar.get(name))
            .map(String::as_str)
    }

    /// Apply one parsed entry for `host`. Returns `true` if anything changed.
    pub fn apply(&mut self, host: &str, cookie: &SetCookie) -> bool {
        if cookie.expired {
            let removed = self
                .domains
                .get_mut(host)
                .and_then(|jar| jar.remove(&cookie.name))
                .is_some();
            if self.domains.get(host).is_some_and(BTreeMap::is_empty) {
                self.domains.remove(host);
            }
            return removed;
        }

        let jar = self.domains.entry(host.to_owned()).or_default();
        jar.insert(cookie.name.clone(), cookie.value.clone()) != Some(cookie.value.clone())
    }

    /// Parse every `Set-Cookie` header in `headers`, filing them under the
    /// host of `url`. Returns the entries that were applied.
    pub fn absorb(&mut self, url: &Url, headers: &HeaderMap, now: DateTime<Utc>) -> Vec<SetCookie> {
        let Some(host) = host_key(url) else {
            return Vec::new();
        };

        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| SetCookie::parse(raw, now))
            .inspect(|cookie| {
                self.apply(&host, cookie);
            })
            .collect()
    }

    /// Build the `Cookie` request header for `url`, if any cookies apply.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let host = host_key(url)?;
        let jar = self.domains.get(&host)?;
        if jar.is_empty() {
            return None;
        }
        Some(
            jar.iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn parses_name_value_and_ignores_attributes() {
        let cookie = SetCookie::parse("DUKSID=abc123; Path=/; HttpOnly", Utc::now()).unwrap();
        assert_eq!(cookie.name, "DUKSID");
        assert_eq!(cookie.value, "abc123");
        assert!(!cookie.expired);
    }

    #[test]
    fn max_age_zero_means_delete() {
        let cookie = SetCookie::parse("DUKSID=; Max-Age=0", Utc::now()).unwrap();
        assert!(cookie.expired);
    }

    #[test]
    fn past_expires_means_delete() {
        let cookie =
            SetCookie::parse("DUKSID=x; Expires=Thu, 01 Jan 1970 00:00:00 GMT", Utc::now()).unwrap();
        assert!(cookie.expired);
    }

    #[test]
    fn dashed_past_expires_means_delete() {
        let cookie = SetCookie::parse(
            "DUKSID=x; Expires=Thu, 01-Jan-1970 00:00:00 GMT; path=/",
            Utc::now(),
        )
        .unwrap();
        assert!(cookie.expired);
    }

    #[test]
    fn future_expires_keeps_cookie() {
        let cookie =
            SetCookie::parse("DUKSID=x; Expires=Fri, 01 Jan 2100 00:00:00 GMT", Utc::now()).unwrap();
        assert!(!cookie.expired);
    }

    #[test]
    fn max_age_takes_precedence_over_expires() {
        let now = Utc::now();
        let kept = SetCookie::parse(
            "DUKSID=x; Max-Age=3600; Expires=Thu, 01-Jan-1970 00:00:00 GMT",
            now,
        )
        .unwrap();
        assert!(!kept.expired);

        let dropped = SetCookie::parse(
            "DUKSID=x; Expires=Fri, 01 Jan 2100 00:00:00 GMT; Max-Age=0",
            now,
        )
        .unwrap();
        assert!(dropped.expired);
    }

    #[test]
    fn quoted_value_is_unwrapped() {
        let cookie = SetCookie::parse("DUKSID=\"abc\"; Path=/", Utc::now()).unwrap();
        assert_eq!(cookie.value, "abc");
    }

    #[test]
    fn dashed_expires_deletion_clears_the_set() {
        let mut set = CookieSet::new();
        let target = url("http://10.0.0.1/logout.jst");
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("DUKSID=abc; Path=/"));
        set.absorb(&target, &headers, Utc::now());
        assert_eq!(set.get("10.0.0.1", "DUKSID"), Some("abc"));

        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("DUKSID=deleted; expires=Thu, 01-Jan-1970 00:00:01 GMT; path=/"),
        );
        set.absorb(&target, &headers, Utc::now());
        assert_eq!(set.get("10.0.0.1", "DUKSID"), None);
        assert!(set.is_empty());
    }

    #[test]
    fn rejects_entries_without_pair() {
        assert!(SetCookie::parse("garbage", Utc::now()).is_none());
        assert!(SetCookie::parse("=value", Utc::now()).is_none());
    }

    #[test]
    fn cookies_are_never_sent_to_another_host() {
        let mut set = CookieSet::new();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("DUKSID=abc; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("csrf=tok"));

        let applied = set.absorb(&url("http://10.0.0.1/check.jst"), &headers, Utc::now());
        assert_eq!(applied.len(), 2);

        assert_eq!(
            set.header_for(&url("http://10.0.0.1/at_a_glance.jst")).as_deref(),
            Some("DUKSID=abc; csrf=tok")
        );
        assert_eq!(set.header_for(&url("http://192.168.1.1/")), None);
    }

    #[test]
    fn deletion_removes_cookie_and_empty_host() {
        let mut set = CookieSet::new();
        let now = Utc::now();
        set.apply("10.0.0.1", &SetCookie::parse("a=1", now).unwrap());
        set.apply("10.0.0.1", &SetCookie::parse("a=; Max-Age=0", now).unwrap());
        assert!(set.is_empty());
        assert_eq!(set.header_for(&url("http://10.0.0.1/")), None);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut set = CookieSet::new();
        set.apply("10.0.0.1", &SetCookie::parse("a=1", Utc::now()).unwrap());
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"10.0.0.1":{"a":"1"}}"#);
        let back: CookieSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
