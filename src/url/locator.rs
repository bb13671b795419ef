use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// An absolute, validated page address
///
/// Locators are immutable once created. Only `http` and `https` URLs with a
/// host are accepted, so a malformed starting address is rejected before any
/// network activity happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator(Url);

impl Locator {
    /// Parses and validates a locator
    ///
    /// # Arguments
    ///
    /// * `input` - The address to parse; surrounding whitespace is ignored
    ///
    /// # Returns
    ///
    /// * `Ok(Locator)` - The input is an absolute http(s) URL with a host
    /// * `Err(UrlError)` - The input is relative, malformed, or uses another scheme
    ///
    /// # Examples
    ///
    /// ```
    /// use mcq_harvest::url::Locator;
    ///
    /// let locator = Locator::parse("https://example.com/mcqs?page=2").unwrap();
    /// assert_eq!(locator.as_str(), "https://example.com/mcqs?page=2");
    ///
    /// assert!(Locator::parse("/relative/path").is_err());
    /// assert!(Locator::parse("ftp://example.com/").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Parse("empty URL".to_string()));
        }

        let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                url.scheme()
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(UrlError::MissingHost(trimmed.to_string()));
        }

        Ok(Self(url))
    }

    /// Returns the locator as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host of this locator
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for Locator {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.0.into()
    }
}

impl std::str::FromStr for Locator {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
