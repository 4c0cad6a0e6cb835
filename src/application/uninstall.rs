//! Uninstall use case - single, sequential batch, and remove-everything.

use std::panic::AssertUnwindSafe;

use anyhow::{Result, anyhow};
use futures_util::FutureExt;
use log::{debug, error, info};

use super::Services;
use crate::error::InstallerError;
use crate::identifier::Identifier;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallAllOutcome {
    /// The user declined; nothing was touched
    Aborted,
    Removed,
}

pub struct UninstallAction<'a, R: Runtime> {
    services: &'a Services<R>,
}

impl<'a, R: Runtime> UninstallAction<'a, R> {
    pub fn new(services: &'a Services<R>) -> Self {
        Self { services }
    }

    /// Queue a single uninstall on the progress surface.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, raw: &str) {
        let services = self.services;
        let name = match raw.parse::<Identifier>() {
            Ok(identifier) => identifier.name,
            Err(e) => {
                services.runtime.notify(&e.to_string());
                return;
            }
        };

        match services.registry.get_server(&name).found() {
            Ok(server) => {
                debug!("Queueing uninstall of {}", name);
                services.surface.uninstall_server(server);
                services.surface.open();
            }
            Err(reason) => services.runtime.notify(&reason),
        }
    }

    /// Uninstall servers one after another, stopping at the first problem.
    #[tracing::instrument(skip(self))]
    pub async fn uninstall_sync(&self, raws: &[String]) -> Result<Vec<String>> {
        let services = self.services;
        let mut removed = Vec::with_capacity(raws.len());

        for raw in raws {
            // Versions mean nothing for uninstall
            let name = raw
                .parse::<Identifier>()
                .map_err(|e| {
                    services.host.fatal(InstallerError::Resolution {
                        identifier: raw.clone(),
                        reason: e.to_string(),
                    })
                })?
                .name;

            let server = services.registry.get_server(&name).found().map_err(|reason| {
                services.host.fatal(InstallerError::Resolution {
                    identifier: raw.clone(),
                    reason,
                })
            })?;

            info!("Uninstalling server {}", name);
            let outcome = match AssertUnwindSafe(server.uninstall()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow!("uninstall of {} panicked", name)),
            };
            if let Err(e) = outcome {
                error!("Server {} failed to uninstall.", name);
                return Err(services.host.fatal(InstallerError::UninstallFailed {
                    name,
                    reason: format!("{:#}", e),
                }));
            }

            info!("Server {} was successfully uninstalled.", name);
            services.dispatcher.forget(&name);
            removed.push(name);
        }

        Ok(removed)
    }

    /// Remove the whole install root.
    ///
    /// Without `no_confirm` the user confirms once, and a second time when the
    /// root is not the default one.
    #[tracing::instrument(skip(self))]
    pub fn uninstall_all(&self, no_confirm: bool) -> Result<UninstallAllOutcome> {
        let services = self.services;
        let settings = &services.settings;
        let root = &settings.install_root;

        if !no_confirm {
            let prompt = format!(
                "Are you sure you want to uninstall all servers under {}?",
                root.display()
            );
            if !services.runtime.confirm(&prompt)? {
                println!("Uninstalling all servers was aborted.");
                return Ok(UninstallAllOutcome::Aborted);
            }

            if !settings.is_default_root() {
                let warning = format!(
                    "WARNING: {} is not the default install directory ({}). \
                     Everything inside it will be deleted. Are you really sure?",
                    root.display(),
                    settings.default_install_root.display()
                );
                if !services.runtime.confirm(&warning)? {
                    println!("Uninstalling all servers was aborted.");
                    return Ok(UninstallAllOutcome::Aborted);
                }
            }
        }

        if services.runtime.is_dir(root) {
            info!("Removing install root {}", root.display());
            services.runtime.remove_dir_all(root).map_err(|e| {
                services.host.fatal(InstallerError::RemoveRoot {
                    path: root.clone(),
                    reason: format!("{:#}", e),
                })
            })?;
        } else {
            debug!("Install root {} does not exist", root.display());
        }

        services.surface.mark_all_servers_uninstalled();
        services.dispatcher.forget_all();
        services.surface.open();

        info!("All servers were uninstalled.");
        Ok(UninstallAllOutcome::Removed)
    }
}
