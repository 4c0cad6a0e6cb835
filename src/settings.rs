//! Installer settings and the default install root.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::barrier::DEFAULT_MAX_WAIT;
use crate::runtime::Runtime;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory every server is installed under
    pub install_root: PathBuf,
    /// What `install_root` would be without overrides. Only used to warn before
    /// removing a non-default root.
    pub default_install_root: PathBuf,
    /// Upper bound for a synchronous install batch
    pub max_wait: Duration,
    /// Background installs allowed to run at once
    pub max_concurrency: usize,
    /// No interactive host: fatal errors schedule a non-zero exit
    pub headless: bool,
}

impl Settings {
    pub fn new(install_root: PathBuf, default_install_root: PathBuf) -> Self {
        Self {
            install_root,
            default_install_root,
            max_wait: DEFAULT_MAX_WAIT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            headless: false,
        }
    }

    /// Settings for the current user, honoring an explicit root override.
    pub fn resolve<R: Runtime + ?Sized>(runtime: &R, install_root: Option<PathBuf>) -> Result<Self> {
        let default_root = default_install_root(runtime)?;
        let root = install_root.unwrap_or_else(|| default_root.clone());
        Ok(Self::new(root, default_root))
    }

    pub fn is_default_root(&self) -> bool {
        self.install_root == self.default_install_root
    }
}

/// Get the default installation root directory
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_install_root())
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".lsi"))
    }
}

#[cfg(target_os = "macos")]
fn system_install_root() -> PathBuf {
    PathBuf::from("/opt/lsi")
}

#[cfg(target_os = "windows")]
fn system_install_root() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\lsi")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_install_root() -> PathBuf {
    PathBuf::from("/usr/local/lsi")
}

/// Default catalog location: `<config_dir>/lsi/catalog.json`
pub fn default_catalog_path<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    let config_dir = runtime
        .config_dir()
        .context("Could not find configuration directory")?;
    Ok(config_dir.join("lsi").join("catalog.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{test_home, test_root};

    #[test]
    fn test_default_root_for_user() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().returning(|| false);
        runtime.expect_home_dir().returning(|| Some(test_home()));

        assert_eq!(default_install_root(&runtime).unwrap(), test_root());
    }

    #[test]
    fn test_default_root_when_privileged() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().returning(|| true);

        assert_eq!(default_install_root(&runtime).unwrap(), system_install_root());
    }

    #[test]
    fn test_missing_home_is_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().returning(|| false);
        runtime.expect_home_dir().returning(|| None);

        assert!(default_install_root(&runtime).is_err());
    }

    #[test]
    fn test_resolve_keeps_default_for_comparison() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().returning(|| false);
        runtime.expect_home_dir().returning(|| Some(test_home()));

        let settings = Settings::resolve(&runtime, None).unwrap();
        assert!(settings.is_default_root());
        assert_eq!(settings.max_wait, Duration::from_secs(900));

        let custom = PathBuf::from("/srv/servers");
        let settings = Settings::resolve(&runtime, Some(custom.clone())).unwrap();
        assert_eq!(settings.install_root, custom);
        assert_eq!(settings.default_install_root, test_root());
        assert!(!settings.is_default_root());
    }
}
