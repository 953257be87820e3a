//! Physical resource addresses and the environment they are judged against.
//!
//! - `Address` is always absolute (resolved against the page base URL)
//! - `Environment` carries the page origin and module support

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use url::{Origin, Url};

/// Absolute URL of a script or stylesheet.
///
/// Identity for presence/absence diffing: two resources with equal
/// addresses are the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Arc<str>);

impl Address {
    /// Resolve a raw `src`/`href` attribute value against the page base.
    ///
    /// Returns `None` for empty values or values that do not form a URL.
    pub fn resolve(base: &Url, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        base.join(trimmed).ok().map(|url| Self(Arc::from(url.as_str())))
    }

    /// Wrap an already absolute address without resolution.
    pub fn from_absolute(address: impl AsRef<str>) -> Self {
        Self(Arc::from(address.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Origin of this address, if it parses as a URL.
    pub fn origin(&self) -> Option<Origin> {
        Url::parse(&self.0).ok().map(|url| url.origin())
    }

    /// Path component of this address (`/js/app.js`).
    pub fn path(&self) -> Option<String> {
        Url::parse(&self.0).ok().map(|url| url.path().to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Environment
// =============================================================================

/// What the hosting page can do.
///
/// Decides lifecycle eligibility (same-origin check) and which scripts are
/// opted out of execution (`nomodule` / `type="module"`).
#[derive(Debug, Clone)]
pub struct Environment {
    base: Url,
    origin: Origin,
    supports_modules: bool,
}

impl Environment {
    pub fn new(base: Url, supports_modules: bool) -> Self {
        let origin = base.origin();
        Self {
            base,
            origin,
            supports_modules,
        }
    }

    /// Parse the base URL and build an environment.
    pub fn parse(base: &str, supports_modules: bool) -> Result<Self, url::ParseError> {
        Url::parse(base).map(|base| Self::new(base, supports_modules))
    }

    #[inline]
    pub fn base(&self) -> &Url {
        &self.base
    }

    #[inline]
    pub fn supports_modules(&self) -> bool {
        self.supports_modules
    }

    /// Check if an address shares the page origin.
    pub fn is_same_origin(&self, address: &Address) -> bool {
        address.origin().is_some_and(|origin| origin == self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post/").unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = base();
        assert_eq!(
            Address::resolve(&base, "/js/app.js").unwrap().as_str(),
            "https://example.com/js/app.js"
        );
        assert_eq!(
            Address::resolve(&base, "local.js").unwrap().as_str(),
            "https://example.com/blog/post/local.js"
        );
        assert_eq!(
            Address::resolve(&base, "https://cdn.net/lib.js").unwrap().as_str(),
            "https://cdn.net/lib.js"
        );
        assert!(Address::resolve(&base, "   ").is_none());
    }

    #[test]
    fn test_same_origin() {
        let env = Environment::new(base(), true);
        let local = Address::resolve(env.base(), "/a.js").unwrap();
        let remote = Address::from_absolute("https://cdn.net/a.js");
        let other_port = Address::from_absolute("https://example.com:8443/a.js");

        assert!(env.is_same_origin(&local));
        assert!(!env.is_same_origin(&remote));
        assert!(!env.is_same_origin(&other_port));
        assert!(!env.is_same_origin(&Address::from_absolute("not a url")));
    }

    #[test]
    fn test_address_path() {
        let address = Address::from_absolute("https://example.com/css/site.css?v=2");
        assert_eq!(address.path().as_deref(), Some("/css/site.css"));
    }
}
