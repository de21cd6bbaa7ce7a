// context.rs — RequestContext: the attributes of one outbound call.
//
// The four core fields (url, method, hostname, path) are always present.
// Everything else the evaluator can test — scheme, port, query, headers —
// lives in an ordered extension map so policies can grow new fields without
// changing this type.

use std::collections::BTreeMap;

use crate::error::PolicyError;

/// Normalized view of one HTTP request, built fresh per intercepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub url: String,
    /// Always uppercase.
    pub method: String,
    pub hostname: String,
    pub path: String,
    extensions: BTreeMap<String, String>,
}

impl RequestContext {
    /// Build a context from explicit parts, with no extension fields.
    pub fn new(
        method: impl AsRef<str>,
        url: impl Into<String>,
        hostname: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.as_ref().to_ascii_uppercase(),
            hostname: hostname.into(),
            path: path.into(),
            extensions: BTreeMap::new(),
        }
    }

    /// Parse a URL and derive hostname, path, scheme, port and query.
    ///
    /// Fails for URLs that do not parse or have no host (e.g. `mailto:`).
    pub fn from_url(method: impl AsRef<str>, raw_url: &str) -> Result<Self, PolicyError> {
        let parsed = url::Url::parse(raw_url).map_err(|e| PolicyError::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        let hostname = parsed
            .host_str()
            .ok_or_else(|| PolicyError::InvalidUrl {
                url: raw_url.to_string(),
                reason: "URL has no host".to_string(),
            })?
            .to_string();

        let mut ctx = Self::new(method, raw_url, hostname, parsed.path());
        ctx = ctx.with_field("scheme", parsed.scheme());
        if let Some(port) = parsed.port_or_known_default() {
            ctx = ctx.with_field("port", port.to_string());
        }
        if let Some(query) = parsed.query() {
            ctx = ctx.with_field("query", query);
        }
        Ok(ctx)
    }

    /// Add an arbitrary extension field (builder pattern).
    pub fn with_field(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.extensions
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Expose a request header as `header_<name>`, lowercased with `-` → `_`.
    pub fn with_header(self, name: &str, value: impl Into<String>) -> Self {
        let key = format!("header_{}", name.to_ascii_lowercase().replace('-', "_"));
        self.with_field(key, value)
    }

    /// Look up a field by the name used in policies. Unknown fields are `None`.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "url" => Some(&self.url),
            "method" => Some(&self.method),
            "hostname" => Some(&self.hostname),
            "path" => Some(&self.path),
            other => self.extensions.get(other).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_extracts_core_fields() {
        let ctx = RequestContext::from_url("post", "https://api.example.com:8443/v1/chat?q=1")
            .unwrap();
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.hostname, "api.example.com");
        assert_eq!(ctx.path, "/v1/chat");
        assert_eq!(ctx.field("scheme"), Some("https"));
        assert_eq!(ctx.field("port"), Some("8443"));
        assert_eq!(ctx.field("query"), Some("q=1"));
    }

    #[test]
    fn default_port_is_filled_in() {
        let ctx = RequestContext::from_url("GET", "https://example.com").unwrap();
        assert_eq!(ctx.field("port"), Some("443"));
        assert_eq!(ctx.path, "/");
        assert_eq!(ctx.field("query"), None);
    }

    #[test]
    fn unparsable_url_is_an_error() {
        let err = RequestContext::from_url("GET", "not a url").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidUrl { .. }));
        assert!(RequestContext::from_url("GET", "mailto:someone@example.com").is_err());
    }

    #[test]
    fn headers_become_prefixed_fields() {
        let ctx = RequestContext::new("GET", "https://a.com/", "a.com", "/")
            .with_header("X-Agent-Id", "bot-7");
        assert_eq!(ctx.field("header_x_agent_id"), Some("bot-7"));
    }

    #[test]
    fn unknown_field_is_none() {
        let ctx = RequestContext::new("GET", "https://a.com/", "a.com", "/");
        assert_eq!(ctx.field("body"), None);
    }
}
