//! File system paths for the portal session.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the user's home.
const BASE_DIR_NAME: &str = ".portal-session";

/// Manages file system paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.portal-session)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.portal-session`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.portal-session/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the directory holding one store file per origin.
    pub fn origins_dir(&self) -> PathBuf {
        self.base_dir.join("origins")
    }

    /// Get the credential store file for an origin.
    ///
    /// `https://app.example.com:8443` maps to `origins/https_app.example.com_8443.json`.
    pub fn origin_store_file(&self, origin: &str) -> PathBuf {
        self.origins_dir()
            .join(format!("{}.json", sanitize_origin(origin)))
    }

    /// Get the logs directory (~/.portal-session/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("portal.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.origins_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

fn sanitize_origin(origin: &str) -> String {
    let trimmed = origin.trim().trim_end_matches('/');
    let collapsed = trimmed.replace("://", "_");
    collapsed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-portal");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.origins_dir(), base.join("origins"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file(), base.join("logs/portal.jsonl"));
    }

    #[test]
    fn test_origin_store_file_is_sanitized() {
        let paths = Paths::with_base_dir(PathBuf::from("/base"));

        assert_eq!(
            paths.origin_store_file("https://app.example.com:8443/"),
            PathBuf::from("/base/origins/https_app.example.com_8443.json")
        );
        assert_eq!(
            paths.origin_store_file("../../etc/passwd"),
            PathBuf::from("/base/origins/.._.._etc_passwd.json")
        );
    }

    #[test]
    fn test_distinct_origins_get_distinct_files() {
        let paths = Paths::with_base_dir(PathBuf::from("/base"));
        assert_ne!(
            paths.origin_store_file("https://a.example.com"),
            paths.origin_store_file("https://b.example.com")
        );
    }

    #[test]
    fn test_paths_default() {
        let paths = Paths::new().unwrap();
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.base_dir(), &home.join(".portal-session"));
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("portal");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.origins_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
