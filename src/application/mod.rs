//! Application layer - use cases that coordinate the registry, surface and dispatcher.
//!
//! This layer contains the orchestration rules and is driven by the CLI layer
//! in `commands`.

mod install;
mod uninstall;

use std::sync::Arc;

use anyhow::Result;

use crate::alias::AliasTable;
use crate::dispatch::ReadyDispatcher;
use crate::host::Host;
use crate::identifier::Identifier;
use crate::registry::{Server, ServerRegistry};
use crate::runtime::Runtime;
use crate::settings::Settings;
use crate::surface::ProgressSurface;

pub use install::{BatchReport, InstallAction};
pub use uninstall::{UninstallAction, UninstallAllOutcome};

/// Everything the install and uninstall actions work against.
pub struct Services<R: Runtime> {
    pub runtime: Arc<R>,
    pub registry: Arc<dyn ServerRegistry>,
    pub aliases: AliasTable,
    pub surface: Arc<dyn ProgressSurface>,
    pub dispatcher: Arc<ReadyDispatcher>,
    pub settings: Settings,
    pub host: Host,
}

/// A resolved identifier: the server to act on and the version requested for it.
pub(crate) struct Resolved {
    pub server: Arc<dyn Server>,
    pub version: Option<String>,
}

impl<R: Runtime> Services<R> {
    /// Parse, expand aliases and look up. `Ok(None)` when the user declined an
    /// alias choice; `Err(reason)` when nothing matches.
    pub(crate) fn resolve(&self, raw: &str) -> Result<Option<Resolved>, String> {
        let identifier = raw.parse::<Identifier>().map_err(|e| e.to_string())?;
        let identifier = match self
            .aliases
            .resolve(self.runtime.as_ref(), &identifier)
            .map_err(|e| format!("{:#}", e))?
        {
            Some(identifier) => identifier,
            None => return Ok(None),
        };

        let server = self.registry.get_server(&identifier.name).found()?;
        Ok(Some(Resolved {
            server,
            version: identifier.version,
        }))
    }
}
