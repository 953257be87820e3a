//! Resource loading.
//!
//! The network step of a freshly inserted script sits behind
//! [`ResourceLoader`], so the reconciler can run against a real origin, a
//! directory on disk, or a test double.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::core::Address;
use crate::debug;
use crate::lifecycle::LoadError;

/// Performs the network step for one inserted resource.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Resolves once the resource has loaded (and, for scripts, executed).
    async fn load(&self, address: &Address) -> Result<(), LoadError>;
}

// =============================================================================
// Immediate
// =============================================================================

/// Loader that succeeds at once. Used when no asset root is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateLoader;

#[async_trait]
impl ResourceLoader for ImmediateLoader {
    async fn load(&self, address: &Address) -> Result<(), LoadError> {
        debug!("scripts"; "loaded {} (immediate)", address);
        Ok(())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// Loader that serves URL paths from a local directory.
///
/// `https://host/js/app.js` loads iff `<root>/js/app.js` is a file.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an address onto a file below the root.
    ///
    /// Returns `None` for paths that would escape the root.
    pub fn file_for(&self, address: &Address) -> Option<PathBuf> {
        let url_path = address.path()?;
        let relative = Path::new(url_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ResourceLoader for FsLoader {
    async fn load(&self, address: &Address) -> Result<(), LoadError> {
        let Some(file) = self.file_for(address) else {
            return Err(LoadError::network(address, "path is outside the asset root"));
        };
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {
                debug!("scripts"; "loaded {} from {}", address, file.display());
                Ok(())
            }
            Ok(_) => Err(LoadError::network(address, format!("`{}` is not a file", file.display()))),
            Err(err) => Err(LoadError::network(address, format!("`{}`: {err}", file.display()))),
        }
    }
}

// =============================================================================
// Test double
// =============================================================================

#[cfg(test)]
pub mod testing {
    //! Loader whose completions are released by the test, per address.

    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use tokio::sync::watch;

    use super::ResourceLoader;
    use crate::core::Address;
    use crate::lifecycle::LoadError;

    type Gate = watch::Sender<Option<Result<(), LoadError>>>;

    #[derive(Debug, Default)]
    pub struct GatedLoader {
        gates: Mutex<FxHashMap<Address, Gate>>,
        calls: Mutex<Vec<Address>>,
    }

    impl GatedLoader {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_gate<R>(&self, address: &Address, f: impl FnOnce(&Gate) -> R) -> R {
            let mut gates = self.gates.lock();
            let gate = gates
                .entry(address.clone())
                .or_insert_with(|| watch::channel(None).0);
            f(gate)
        }

        /// Let the load of `address` succeed (before or after it starts).
        pub fn succeed(&self, address: &str) {
            let address = Address::from_absolute(address);
            self.with_gate(&address, |gate| {
                gate.send_replace(Some(Ok(())));
            });
        }

        /// Let the load of `address` fail.
        pub fn fail(&self, address: &str) {
            let address = Address::from_absolute(address);
            let err = LoadError::network(&address, "gated failure");
            self.with_gate(&address, |gate| {
                gate.send_replace(Some(Err(err)));
            });
        }

        /// Addresses whose load has started, in call order.
        pub fn calls(&self) -> Vec<Address> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ResourceLoader for GatedLoader {
        async fn load(&self, address: &Address) -> Result<(), LoadError> {
            self.calls.lock().push(address.clone());
            let mut rx = self.with_gate(address, |gate| gate.subscribe());
            loop {
                if let Some(result) = rx.borrow_and_update().clone() {
                    return result;
                }
                if rx.changed().await.is_err() {
                    return Err(LoadError::Abandoned(Arc::from(address.as_str())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_loader_finds_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js/app.js"), "void 0;").unwrap();
        let loader = FsLoader::new(dir.path());

        let present = Address::from_absolute("https://example.com/js/app.js?v=3");
        let missing = Address::from_absolute("https://example.com/js/gone.js");
        let directory = Address::from_absolute("https://example.com/js/");

        assert_eq!(loader.load(&present).await, Ok(()));
        assert!(matches!(loader.load(&missing).await, Err(LoadError::Network { .. })));
        assert!(loader.load(&directory).await.is_err());
    }

    #[test]
    fn test_fs_loader_stays_in_root() {
        let loader = FsLoader::new("/srv/public");
        let nested = Address::from_absolute("https://example.com/a/b.css");
        assert_eq!(
            loader.file_for(&nested),
            Some(PathBuf::from("/srv/public/a/b.css"))
        );
        // `..` is normalized away by URL parsing
        let dotted = Address::from_absolute("https://example.com/../etc/passwd");
        assert_eq!(
            loader.file_for(&dotted),
            Some(PathBuf::from("/srv/public/etc/passwd"))
        );
    }

    #[tokio::test]
    async fn test_immediate_loader() {
        let address = Address::from_absolute("https://example.com/a.js");
        assert_eq!(ImmediateLoader.load(&address).await, Ok(()));
    }

    #[tokio::test]
    async fn test_gated_loader_releases_on_demand() {
        let loader = testing::GatedLoader::new();
        let address = Address::from_absolute("https://example.com/a.js");

        let task = {
            let loader = Arc::clone(&loader);
            let address = address.clone();
            tokio::spawn(async move { loader.load(&address).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(loader.calls(), vec![address]);

        loader.succeed("https://example.com/a.js");
        assert_eq!(task.await.unwrap(), Ok(()));
    }
}
