//! Filesystem construction parameters.
//!
//! ```toml
//! root_mode = 0o775
//! uid = 1000
//! gid = 1000
//!
//! [clock]
//! kind = "fixed"
//! unix_secs = 1377986400
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};
use crate::fs::Clock;

/// Where the filesystem clock reads time from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClockConfig {
    /// Wall clock.
    #[default]
    System,
    /// A clock stopped at `unix_secs`, for reproducible timestamps.
    Fixed { unix_secs: u64 },
}

impl ClockConfig {
    pub fn into_clock(self) -> Clock {
        match self {
            ClockConfig::System => Arc::new(SystemTime::now),
            ClockConfig::Fixed { unix_secs } => {
                let t = UNIX_EPOCH + Duration::from_secs(unix_secs);
                Arc::new(move || t)
            }
        }
    }
}

/// Parameters for [`FileSystem::from_config`].
///
/// [`FileSystem::from_config`]: crate::FileSystem::from_config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Permission bits of the root directory.
    pub root_mode: u32,
    /// Owner of the root directory.
    pub uid: u32,
    /// Group of the root directory.
    pub gid: u32,
    pub clock: ClockConfig,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root_mode: 0o755,
            uid: 0,
            gid: 0,
            clock: ClockConfig::System,
        }
    }
}

impl FsConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> TreeResult<Self> {
        toml::from_str(text).map_err(|e| TreeError::invalid_input(format!("filesystem config: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> TreeResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> TreeResult<String> {
        toml::to_string(self).map_err(|e| TreeError::other(format!("filesystem config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::S_IFDIR;
    use crate::fs::FileSystem;
    use crate::node::Node;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = FsConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, FsConfig::default());
        assert_eq!(cfg.root_mode, 0o755);
        assert_eq!(cfg.clock, ClockConfig::System);
    }

    #[test]
    fn test_parse_fixed_clock() {
        let cfg = FsConfig::from_toml_str(
            r#"
            root_mode = 0o775
            uid = 1000

            [clock]
            kind = "fixed"
            unix_secs = 1377986400
            "#,
        )
        .unwrap();
        assert_eq!(cfg.root_mode, 0o775);
        assert_eq!(cfg.uid, 1000);
        assert_eq!(cfg.gid, 0);
        assert_eq!(cfg.clock, ClockConfig::Fixed { unix_secs: 1377986400 });

        let clock = cfg.clock.into_clock();
        assert_eq!(clock(), UNIX_EPOCH + Duration::from_secs(1377986400));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            FsConfig::from_toml_str("root_mode = \"rwx\""),
            Err(TreeError::InvalidInput(_))
        ));
        assert!(matches!(
            FsConfig::from_toml_str("[clock]\nkind = \"sundial\""),
            Err(TreeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_and_build() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.toml");
        let cfg = FsConfig {
            root_mode: 0o750,
            uid: 7,
            gid: 8,
            clock: ClockConfig::Fixed { unix_secs: 60 },
        };
        fs::write(&path, cfg.to_toml_string().unwrap()).unwrap();

        let loaded = FsConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);

        let filesys = FileSystem::from_config(&loaded);
        let attr = filesys.root().getattr().unwrap();
        assert_eq!(attr.mode, S_IFDIR | 0o750);
        assert_eq!((attr.uid, attr.gid), (7, 8));
        assert_eq!(attr.mtime, UNIX_EPOCH + Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = FsConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, TreeError::Io(_)));
    }
}
