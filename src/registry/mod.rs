//! Registry abstraction: where servers come from.
//!
//! The orchestration code only sees [`ServerRegistry`] and [`Server`]; the
//! catalog-backed implementation lives in [`catalog`].

mod catalog;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::sink::StdioSink;

pub use catalog::{Catalog, CatalogRegistry, CatalogServer, Receipt, ServerEntry};

/// Options for a single install.
#[derive(Clone)]
pub struct InstallOptions {
    pub sink: Arc<dyn StdioSink>,
    /// Version requested by the user (None = the server's default)
    pub requested_version: Option<String>,
}

impl fmt::Debug for InstallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallOptions")
            .field("requested_version", &self.requested_version)
            .finish_non_exhaustive()
    }
}

/// An installable server. Owned by the registry; the core only holds references.
#[async_trait]
pub trait Server: Send + Sync {
    fn name(&self) -> &str;

    fn is_installed(&self) -> bool;

    /// Run the install steps. Resolves once the server is usable or the install failed.
    async fn install(&self, options: InstallOptions) -> Result<()>;

    async fn uninstall(&self) -> Result<()>;
}

impl fmt::Debug for dyn Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server({})", self.name())
    }
}

/// Result of looking a server up by name.
pub enum Lookup {
    Found(Arc<dyn Server>),
    NotFound(String),
}

impl Lookup {
    /// Turn a lookup into a Result, keeping the not-found reason as the error message.
    pub fn found(self) -> Result<Arc<dyn Server>, String> {
        match self {
            Lookup::Found(server) => Ok(server),
            Lookup::NotFound(reason) => Err(reason),
        }
    }
}

pub trait ServerRegistry: Send + Sync {
    fn get_server(&self, name: &str) -> Lookup;

    fn available_server_names(&self) -> BTreeSet<String>;

    fn installed_servers(&self) -> Vec<Arc<dyn Server>>;
}

/// Standard reason for an unknown server name.
pub fn not_found_reason(name: &str, available: &BTreeSet<String>) -> String {
    if available.is_empty() {
        format!("Server \"{}\" is not a known server.", name)
    } else {
        let names: Vec<&str> = available.iter().map(String::as_str).collect();
        format!(
            "Server \"{}\" is not a known server. Available servers: {}",
            name,
            names.join(", ")
        )
    }
}
