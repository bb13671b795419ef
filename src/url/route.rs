use crate::url::Locator;
use crate::UrlError;
use std::fmt;
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Placeholder substituted with the encoded target locator
pub const TARGET_PLACEHOLDER: &str = "{url}";

/// One relay template used to reach a target page indirectly
///
/// A template either contains the `{url}` placeholder, which is replaced by
/// the percent-encoded target, or is treated as a prefix that the encoded
/// target is appended to:
///
/// | Template | Resolved for `https://a.com/x` |
/// |----------|--------------------------------|
/// | `https://relay.example/raw?url=` | `https://relay.example/raw?url=https%3A%2F%2Fa.com%2Fx` |
/// | `https://relay.example/get/{url}/raw` | `https://relay.example/get/https%3A%2F%2Fa.com%2Fx/raw` |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    template: String,
}

impl Route {
    /// Creates a route from a template string
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Returns the raw template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the relay host, used to label diagnostics
    ///
    /// Falls back to the whole template when it has no parseable host.
    pub fn host(&self) -> String {
        let bare = self.template.replace(TARGET_PLACEHOLDER, "");
        Url::parse(&bare)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.template.clone())
    }

    /// Builds the address to request for `target` through this route
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The relay URL carrying the encoded target
    /// * `Err(UrlError)` - The template does not produce an http(s) URL
    pub fn resolve(&self, target: &Locator) -> Result<Url, UrlError> {
        let encoded: String = byte_serialize(target.as_str().as_bytes()).collect();

        let raw = if self.template.contains(TARGET_PLACEHOLDER) {
            self.template.replace(TARGET_PLACEHOLDER, &encoded)
        } else {
            format!("{}{}", self.template, encoded)
        };

        let url = Url::parse(&raw)
            .map_err(|e| UrlError::Malformed(format!("route '{}': {}", self.template, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "route '{}' uses unsupported scheme {}",
                self.template,
                url.scheme()
            )));
        }

        Ok(url)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl From<&str> for Route {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for Route {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}
