//! Logical feature keys and lifecycle vocabulary.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Logical feature identifier, stable across navigations.
///
/// Cheap to clone. Several resources may carry the same key over time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Arc<str>);

impl Key {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Lifecycle status of a resource on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Not (or no longer) active on the page.
    #[default]
    Unloaded,
    /// Present and participating in the lifecycle.
    Loaded,
}

/// The four lifecycle signals published per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// First activation of a feature.
    Init,
    /// Feature binds to a page region.
    Load,
    /// Feature releases a page region.
    Unload,
    /// Feature is gone from the page.
    Destroy,
}

impl SignalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_key_equality_and_lookup() {
        let mut set = FxHashSet::default();
        set.insert(Key::from("gallery"));
        assert!(set.contains("gallery"));
        assert_eq!(Key::from("a"), Key::from(String::from("a")));
        assert_eq!(Key::new("menu").to_string(), "menu");
    }

    #[test]
    fn test_key_deserializes_from_json_list() {
        let keys: Vec<Key> = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);
    }

    #[test]
    fn test_status_defaults_to_unloaded() {
        assert_eq!(Status::default(), Status::Unloaded);
    }

    #[test]
    fn test_signal_kind_names() {
        assert_eq!(SignalKind::Init.as_str(), "init");
        assert_eq!(SignalKind::Destroy.to_string(), "destroy");
    }
}
