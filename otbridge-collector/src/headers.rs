//! `http::HeaderMap` carriers for context propagation over HTTP.

use otbridge::propagation::{Extractor, Injector};

/// Helper for injecting span context into HTTP request headers.
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the HeaderMap. Does nothing if the key or
    /// value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = http::header::HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Helper for extracting span context from HTTP request headers.
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the HeaderMap. If the value is not valid
    /// ASCII, returns None.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    /// Collect all the keys from the HeaderMap.
    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_injector_sets_values() {
        let mut headers = http::HeaderMap::new();
        let mut injector = HeaderInjector(&mut headers);
        injector.set("x-ot-span-context", "dG9rZW4=".to_string());
        injector.set("x-ot-span-context", "b3RoZXI=".to_string());

        assert_eq!(headers["x-ot-span-context"], "b3RoZXI=");
    }

    #[test]
    fn invalid_header_values_are_dropped() {
        let mut headers = http::HeaderMap::new();
        let mut injector = HeaderInjector(&mut headers);
        injector.set("x-ot-span-context", "line\nbreak".to_string());
        injector.set("bad header name", "value".to_string());

        assert!(headers.is_empty());
    }

    #[test]
    fn header_extractor_reads_back() {
        let mut headers = http::HeaderMap::new();
        headers.insert("ot-tracer-traceid", "1f".parse().unwrap());

        let extractor = HeaderExtractor(&headers);
        assert_eq!(extractor.get("ot-tracer-traceid"), Some("1f"));
        assert_eq!(extractor.get("missing"), None);
        assert_eq!(extractor.keys(), vec!["ot-tracer-traceid"]);
    }
}
