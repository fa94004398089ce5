use crate::assets::AssetError;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Bump the version to invalidate every older cache on the next start.
pub(crate) const CACHE_NAME: &str = "retro-pet-cache-v2";

pub(crate) const PRECACHE: &[&str] = &[
    "icon-512.png",
    "pig-left.png",
    "pig-right.png",
    "pig-sleep.png",
    "pig-sleepR.png",
];

/// Versioned on-disk copy of the static assets. Reads are served from the
/// cache first and refreshed from the source directory behind them.
pub(crate) struct AssetCache {
    root: PathBuf,
    name: String,
    source: PathBuf,
}

fn check_relative(rel: &str) -> Result<&Path, AssetError> {
    let p = Path::new(rel);
    let ok = !rel.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(p)
    } else {
        Err(AssetError::BadPath(rel.to_string()))
    }
}

impl AssetCache {
    pub(crate) fn open(
        root: impl Into<PathBuf>,
        name: &str,
        source: impl Into<PathBuf>,
    ) -> Result<Self, AssetError> {
        let cache = Self {
            root: root.into(),
            name: name.to_string(),
            source: source.into(),
        };
        fs::create_dir_all(cache.dir())?;
        Ok(cache)
    }

    pub(crate) fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn store(&self, rel: &Path, bytes: &[u8]) -> Result<(), AssetError> {
        let dst = self.dir().join(rel);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = dst.with_extension("part");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &dst)?;
        Ok(())
    }

    /// Copies every listed asset into the cache. Assets missing from the
    /// source are skipped. Returns how many were stored.
    pub(crate) fn install(&self, list: &[&str]) -> Result<usize, AssetError> {
        let mut stored = 0;
        for rel in list {
            let rel_path = check_relative(rel)?;
            match fs::read(self.source.join(rel_path)) {
                Ok(bytes) => {
                    self.store(rel_path, &bytes)?;
                    stored += 1;
                }
                Err(e) => warn!(asset = rel, error = %e, "precache skipped"),
            }
        }
        info!(cache = %self.name, stored, listed = list.len(), "cache installed");
        Ok(stored)
    }

    /// Removes every sibling cache whose name is not ours.
    pub(crate) fn activate(&self) -> Result<Vec<String>, AssetError> {
        let mut purged = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.name {
                continue;
            }
            fs::remove_dir_all(entry.path())?;
            purged.push(name);
        }
        if !purged.is_empty() {
            info!(?purged, "stale caches removed");
        }
        Ok(purged)
    }

    /// Cache first; the source copy always refreshes the cache when readable.
    pub(crate) fn fetch(&self, rel: &str) -> Result<Vec<u8>, AssetError> {
        let rel_path = check_relative(rel)?;
        let cached = fs::read(self.dir().join(rel_path)).ok();

        let fresh = match fs::read(self.source.join(rel_path)) {
            Ok(bytes) => {
                if cached.as_deref() != Some(bytes.as_slice()) {
                    if let Err(e) = self.store(rel_path, &bytes) {
                        warn!(asset = rel, error = %e, "cache refresh failed");
                    } else {
                        debug!(asset = rel, "cache refreshed");
                    }
                }
                Ok(bytes)
            }
            Err(e) => Err(e),
        };

        match (cached, fresh) {
            (Some(bytes), _) => Ok(bytes),
            (None, Ok(bytes)) => Ok(bytes),
            (None, Err(source)) => Err(AssetError::Unavailable {
                path: rel.to_string(),
                source,
            }),
        }
    }
}

/// Opens, installs and activates in one go, the way the app starts up.
pub(crate) fn prepare(root: &Path, source: &Path) -> Result<AssetCache, AssetError> {
    let cache = AssetCache::open(root, CACHE_NAME, source)?;
    cache.install(PRECACHE)?;
    cache.activate()?;
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, tempfile::TempDir) {
        (
            tempfile::tempdir().expect("tempdir"),
            tempfile::tempdir().expect("tempdir"),
        )
    }

    #[test]
    fn install_copies_available_assets() {
        let (root, src) = setup();
        fs::write(src.path().join("pig-left.png"), b"left").unwrap();
        fs::write(src.path().join("pig-right.png"), b"right").unwrap();

        let cache = AssetCache::open(root.path(), "v1", src.path()).unwrap();
        assert_eq!(cache.install(PRECACHE).unwrap(), 2);
        assert_eq!(fs::read(cache.dir().join("pig-left.png")).unwrap(), b"left");
        assert!(!cache.dir().join("pig-sleep.png").exists());
    }

    #[test]
    fn activate_purges_other_versions_only() {
        let (root, src) = setup();
        fs::create_dir_all(root.path().join("retro-pet-cache-v1")).unwrap();
        fs::create_dir_all(root.path().join("older")).unwrap();
        fs::write(root.path().join("note.txt"), b"keep").unwrap();

        let cache = AssetCache::open(root.path(), CACHE_NAME, src.path()).unwrap();
        let mut purged = cache.activate().unwrap();
        purged.sort();
        assert_eq!(purged, vec!["older".to_string(), "retro-pet-cache-v1".to_string()]);
        assert!(cache.dir().is_dir());
        assert!(root.path().join("note.txt").exists());
    }

    #[test]
    fn fetch_serves_cached_copy_then_refreshes() {
        let (root, src) = setup();
        fs::write(src.path().join("a.png"), b"old").unwrap();
        let cache = AssetCache::open(root.path(), "v1", src.path()).unwrap();
        cache.install(&["a.png"]).unwrap();

        fs::write(src.path().join("a.png"), b"new").unwrap();
        assert_eq!(cache.fetch("a.png").unwrap(), b"old");
        assert_eq!(fs::read(cache.dir().join("a.png")).unwrap(), b"new");
        assert_eq!(cache.fetch("a.png").unwrap(), b"new");
    }

    #[test]
    fn fetch_falls_back_to_source_then_cache() {
        let (root, src) = setup();
        let cache = AssetCache::open(root.path(), "v1", src.path()).unwrap();
        fs::write(src.path().join("b.png"), b"bytes").unwrap();
        assert_eq!(cache.fetch("b.png").unwrap(), b"bytes");

        // source gone: the cached copy still serves
        fs::remove_file(src.path().join("b.png")).unwrap();
        assert_eq!(cache.fetch("b.png").unwrap(), b"bytes");
    }

    #[test]
    fn fetch_fails_when_nothing_has_it() {
        let (root, src) = setup();
        let cache = AssetCache::open(root.path(), "v1", src.path()).unwrap();
        let err = cache.fetch("nope.png").unwrap_err();
        assert!(matches!(err, AssetError::Unavailable { .. }));
    }

    #[test]
    fn rejects_paths_escaping_the_root() {
        let (root, src) = setup();
        let cache = AssetCache::open(root.path(), "v1", src.path()).unwrap();
        assert!(matches!(cache.fetch("../x.png"), Err(AssetError::BadPath(_))));
        assert!(matches!(cache.fetch("/etc/passwd"), Err(AssetError::BadPath(_))));
        assert!(matches!(cache.install(&[""]), Err(AssetError::BadPath(_))));
    }

    #[test]
    fn prepare_installs_and_activates() {
        let (root, src) = setup();
        fs::create_dir_all(root.path().join("retro-pet-cache-v1")).unwrap();
        fs::write(src.path().join("pig-sleep.png"), b"zz").unwrap();
        let cache = prepare(root.path(), src.path()).unwrap();
        assert!(cache.dir().join("pig-sleep.png").exists());
        assert!(!root.path().join("retro-pet-cache-v1").exists());
    }
}
