use std::collections::BTreeMap;
use std::time::Instant;

/// One unit of work. Immutable once built; two specs with the same URL are
/// the same work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    method: String,
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A single try at a [`RequestSpec`]. `attempt_number` is 0 for the first try.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub spec: RequestSpec,
    pub attempt_number: u32,
    pub started_at: Instant,
}

impl Attempt {
    pub fn new(spec: RequestSpec, attempt_number: u32) -> Self {
        Self {
            spec,
            attempt_number,
            started_at: Instant::now(),
        }
    }

    pub fn url(&self) -> &str {
        self.spec.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_is_normalized_to_uppercase() {
        let spec = RequestSpec::new("post", "https://example.com/api");
        assert_eq!(spec.method(), "POST");
        assert_eq!(spec.body(), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let spec = RequestSpec::post("https://example.com/api", b"{}".to_vec())
            .with_header("Content-Type", "application/json");
        assert_eq!(spec.header("content-type"), Some("application/json"));
        assert_eq!(spec.header("cookie"), None);
        assert_eq!(spec.body(), Some(&b"{}"[..]));
    }
}
