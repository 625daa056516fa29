//! Flat query-string handling.
//!
//! Values are never decoded here: they travel from the landing URL into
//! local storage and outbound requests exactly as received.

use std::collections::BTreeMap;

/// Flat key/value mapping parsed from a query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryMap(BTreeMap<String, String>);

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `a=1&b=2`, with or without a leading `?`.
    ///
    /// Only the first two `=`-separated segments of a part are used. Parts
    /// with an empty value are dropped; duplicate keys keep the last value.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut map = BTreeMap::new();
        for part in query.split('&') {
            let mut segments = part.split('=');
            let key = segments.next().unwrap_or_default();
            match segments.next() {
                Some(value) if !value.is_empty() => {
                    map.insert(key.to_owned(), value.to_owned());
                }
                _ => {}
            }
        }
        Self(map)
    }

    /// Query component of a full URL (text between `?` and `#`).
    pub fn from_url(url: &str) -> Self {
        let Some((_, rest)) = url.split_once('?') else {
            return Self::new();
        };
        let query = rest.split_once('#').map_or(rest, |(query, _)| query);
        Self::parse(query)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key` if present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }
}

/// Appends `key=value` pairs to a base URL, verbatim.
pub struct UrlBuilder {
    url: String,
    has_query: bool,
}

impl UrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let url = base.into();
        let has_query = url.contains('?');
        Self { url, has_query }
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.has_query = true;
        self.url.push_str(key);
        self.url.push('=');
        self.url.push_str(value);
        self
    }

    pub fn build(self) -> String {
        self.url
    }
}
