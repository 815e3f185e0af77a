//! Cache key construction
//!
//! A key is `operation[:args][@fingerprint]`. Arguments are encoded by an
//! explicit, typed builder per accessor instead of stringifying whatever was
//! passed. Two calls share a key iff operation, arguments and fingerprint
//! all match.

use super::fingerprint::Fingerprint;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque key into the cache store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from its three parts
    pub fn build<A: KeyArgs + ?Sized>(operation: &str, args: &A, fingerprint: &Fingerprint) -> Self {
        let mut key = operation.to_string();

        let encoded = args.encode();
        if !encoded.is_empty() {
            key.push(':');
            key.push_str(&encoded);
        }

        if let Some(segment) = fingerprint.key_segment() {
            key.push('@');
            key.push_str(&segment);
        }

        Self(key)
    }

    /// Key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Operation part of the key
    pub fn operation(&self) -> &str {
        let end = self.0.find([':', '@']).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Deterministic encoding of a memoized function's arguments
///
/// Implementations must produce the same string for logically equal
/// arguments regardless of how the caller ordered them.
pub trait KeyArgs {
    /// Encoded argument string; empty for no arguments
    fn encode(&self) -> String;
}

impl KeyArgs for () {
    fn encode(&self) -> String {
        String::new()
    }
}

impl KeyArgs for str {
    fn encode(&self) -> String {
        escape(self)
    }
}

impl KeyArgs for String {
    fn encode(&self) -> String {
        escape(self)
    }
}

impl<T: KeyArgs> KeyArgs for Option<T> {
    fn encode(&self) -> String {
        match self {
            Some(v) => v.encode(),
            None => NONE_TOKEN.to_string(),
        }
    }
}

impl KeyArgs for NaiveDate {
    fn encode(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

/// Named parameters encoded as sorted `name=value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams(BTreeMap<String, String>);

impl KeyParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same name
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    /// Look up a parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for KeyParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

impl KeyArgs for KeyParams {
    fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Set of row ids, normalised to sorted unique order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(Vec<String>);

impl IdSet {
    /// Normalise ids: sort and drop duplicates
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    /// Ids in normalised order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl KeyArgs for IdSet {
    fn encode(&self) -> String {
        let escaped: Vec<String> = self.0.iter().map(|id| escape(id)).collect();
        format!("ids=[{}]", escaped.join(","))
    }
}

// Escaped values never contain a bare '%' followed by '-'
const NONE_TOKEN: &str = "%-";

// Keep separators unambiguous inside encoded values
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | ':' | '@' | ',' | '=' | '[' | ']' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_args_or_fingerprint() {
        let key = CacheKey::build("wps_pivot", &(), &Fingerprint::Absent);
        assert_eq!(key.as_str(), "wps_pivot");
        assert_eq!(key.operation(), "wps_pivot");
    }

    #[test]
    fn key_embeds_fingerprint() {
        let key = CacheKey::build("wps_pivot", &(), &Fingerprint::Mtime(42));
        assert_eq!(key.as_str(), "wps_pivot@m42");
        assert_eq!(key.operation(), "wps_pivot");
    }

    #[test]
    fn params_are_order_independent() {
        let ab = KeyParams::new().with("a", 1).with("b", 2);
        let ba = KeyParams::new().with("b", 2).with("a", 1);
        let other = KeyParams::new().with("a", 1).with("b", 3);

        let fp = Fingerprint::Absent;
        assert_eq!(
            CacheKey::build("query", &ab, &fp),
            CacheKey::build("query", &ba, &fp)
        );
        assert_ne!(
            CacheKey::build("query", &ab, &fp),
            CacheKey::build("query", &other, &fp)
        );
    }

    #[test]
    fn params_collect_from_pairs() {
        let params: KeyParams = [("region", "PADD3"), ("from", "2020-01-01")]
            .into_iter()
            .collect();
        assert_eq!(params.encode(), "from=2020-01-01,region=PADD3");
        assert_eq!(params.get("region"), Some("PADD3"));
    }

    #[test]
    fn separators_are_escaped() {
        let tricky = KeyParams::new().with("a", "1,b=2");
        let plain = KeyParams::new().with("a", 1).with("b", 2);
        assert_ne!(tricky.encode(), plain.encode());
    }

    #[test]
    fn id_set_normalises_order() {
        let a = IdSet::new(["W_EPC0", "W_EPM0", "W_EPC0"]);
        let b = IdSet::new(["W_EPM0", "W_EPC0"]);
        assert_eq!(a, b);
        assert_eq!(a.encode(), "ids=[W_EPC0,W_EPM0]");
    }

    #[test]
    fn optional_args() {
        let none: Option<String> = None;
        let empty = Some(String::new());
        assert_eq!(Some("PADD1".to_string()).encode(), "PADD1");
        assert_ne!(none.encode(), empty.encode());

        let fp = Fingerprint::Absent;
        assert_ne!(
            CacheKey::build("dpr", &none, &fp),
            CacheKey::build("dpr", &empty, &fp)
        );
        assert_eq!(CacheKey::build("dpr", &none, &fp).operation(), "dpr");
    }
}
