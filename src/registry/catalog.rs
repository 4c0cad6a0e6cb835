//! Catalog-backed registry.
//!
//! The catalog is a JSON file describing how to install each server:
//!
//! ```json
//! {
//!   "servers": {
//!     "html-ls": { "install": ["npm", "install", "vscode-langservers-extracted@{version}"] }
//!   },
//!   "aliases": { "web": ["html-ls", "css-ls"] }
//! }
//! ```
//!
//! Each server installs into `<root>/<name>`; a `receipt.json` written after a
//! successful install marks it as installed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{InstallOptions, Lookup, Server, ServerRegistry, not_found_reason};
use crate::alias::AliasTable;
use crate::process::run_attached;
use crate::runtime::Runtime;

const RECEIPT_FILE: &str = "receipt.json";
const VERSION_PLACEHOLDER: &str = "{version}";
const FALLBACK_VERSION: &str = "latest";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
    #[serde(default)]
    pub aliases: AliasTable,
}

impl Catalog {
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            bail!("Catalog not found at {}", path.display());
        }
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Command to run inside the server directory; `{version}` is substituted
    pub install: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServerEntry {
    fn effective_version(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_version.as_deref())
            .unwrap_or(FALLBACK_VERSION)
            .to_string()
    }

    fn command(&self, version: &str) -> Vec<String> {
        self.install
            .iter()
            .map(|arg| arg.replace(VERSION_PLACEHOLDER, version))
            .collect()
    }
}

/// Written after a successful install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub name: String,
    pub version: String,
}

pub struct CatalogServer<R: Runtime> {
    runtime: Arc<R>,
    name: String,
    entry: ServerEntry,
    dir: PathBuf,
}

impl<R: Runtime> CatalogServer<R> {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn description(&self) -> Option<&str> {
        self.entry.description.as_deref()
    }

    fn receipt_path(&self) -> PathBuf {
        self.dir.join(RECEIPT_FILE)
    }

    pub fn receipt(&self) -> Result<Option<Receipt>> {
        let path = self.receipt_path();
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let content = self.runtime.read_to_string(&path)?;
        let receipt = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse receipt {}", path.display()))?;
        Ok(Some(receipt))
    }

    fn write_receipt(&self, version: &str) -> Result<()> {
        let receipt = Receipt {
            name: self.name.clone(),
            version: version.to_string(),
        };
        let json = serde_json::to_string_pretty(&receipt)?;
        self.runtime.write(&self.receipt_path(), json.as_bytes())
    }
}

#[async_trait]
impl<R: Runtime + 'static> Server for CatalogServer<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_installed(&self) -> bool {
        self.runtime.exists(&self.receipt_path())
    }

    #[tracing::instrument(skip(self), fields(server = %self.name))]
    async fn install(&self, options: InstallOptions) -> Result<()> {
        if self.runtime.exists(&self.dir) {
            debug!("Removing previous contents of {}", self.dir.display());
            self.runtime.remove_dir_all(&self.dir)?;
        }
        self.runtime.create_dir_all(&self.dir)?;

        let version = self
            .entry
            .effective_version(options.requested_version.as_deref());
        let argv = self.entry.command(&version);
        let envs = vec![
            (
                "LSI_SERVER_DIR".to_string(),
                self.dir.to_string_lossy().into_owned(),
            ),
            ("LSI_VERSION".to_string(), version.clone()),
        ];

        let result = match run_attached(&argv, &self.dir, &envs, options.sink.as_ref()).await {
            Ok(()) => self.write_receipt(&version),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            debug!("Install of {} failed: {:#}", self.name, e);
            if let Err(cleanup) = self.runtime.remove_dir_all(&self.dir) {
                warn!("Failed to clean up {}: {:#}", self.dir.display(), cleanup);
            }
        }
        result.with_context(|| format!("Failed to install {}", self.name))
    }

    #[tracing::instrument(skip(self), fields(server = %self.name))]
    async fn uninstall(&self) -> Result<()> {
        if !self.runtime.exists(&self.dir) {
            bail!("Server {} is not installed.", self.name);
        }
        self.runtime.remove_dir_all(&self.dir)
    }
}

pub struct CatalogRegistry<R: Runtime> {
    servers: BTreeMap<String, Arc<CatalogServer<R>>>,
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '@']);
    if invalid {
        bail!("Invalid server name in catalog: \"{}\"", name);
    }
    Ok(())
}

impl<R: Runtime + 'static> CatalogRegistry<R> {
    pub fn new(runtime: Arc<R>, catalog: &Catalog, install_root: &Path) -> Result<Self> {
        let mut servers = BTreeMap::new();
        for (name, entry) in &catalog.servers {
            validate_name(name)?;
            let server = CatalogServer {
                runtime: Arc::clone(&runtime),
                name: name.clone(),
                entry: entry.clone(),
                dir: install_root.join(name),
            };
            servers.insert(name.clone(), Arc::new(server));
        }
        Ok(Self { servers })
    }

    /// Concrete access for callers that need catalog details (e.g. receipts).
    pub fn server(&self, name: &str) -> Option<&Arc<CatalogServer<R>>> {
        self.servers.get(name)
    }
}

impl<R: Runtime + 'static> ServerRegistry for CatalogRegistry<R> {
    fn get_server(&self, name: &str) -> Lookup {
        match self.servers.get(name) {
            Some(server) => Lookup::Found(Arc::clone(server) as Arc<dyn Server>),
            None => Lookup::NotFound(not_found_reason(name, &self.available_server_names())),
        }
    }

    fn available_server_names(&self) -> BTreeSet<String> {
        self.servers.keys().cloned().collect()
    }

    fn installed_servers(&self) -> Vec<Arc<dyn Server>> {
        self.servers
            .values()
            .filter(|server| server.is_installed())
            .map(|server| Arc::clone(server) as Arc<dyn Server>)
            .collect()
    }
}
