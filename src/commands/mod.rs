//! CLI layer: builds a [`Config`] and drives the application actions.

use anyhow::Result;
use log::debug;

use crate::{
    application::{InstallAction, UninstallAction, UninstallAllOutcome},
    registry::ServerRegistry,
    runtime::Runtime,
    surface::ProgressSurface,
};

pub mod config;

pub use config::{Config, Options};

/// Install servers. With `sync` the batch is awaited and any failure is an
/// error; otherwise each server is queued and progress is reported as it runs.
#[tracing::instrument(skip(config))]
pub async fn install<R: Runtime + 'static>(
    config: &Config<R>,
    identifiers: &[String],
    sync: bool,
) -> Result<()> {
    let action = InstallAction::new(&config.services);
    if sync {
        let report = action.install_sync(identifiers).await?;
        debug!("Installed {} server(s)", report.installed.len());
        return Ok(());
    }

    for raw in identifiers {
        action.install(raw);
    }
    drain(config).await;
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn uninstall<R: Runtime + 'static>(
    config: &Config<R>,
    names: &[String],
    sync: bool,
) -> Result<()> {
    let action = UninstallAction::new(&config.services);
    if sync {
        action.uninstall_sync(names).await?;
        return Ok(());
    }

    for raw in names {
        action.uninstall(raw);
    }
    drain(config).await;
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn uninstall_all<R: Runtime + 'static>(config: &Config<R>, yes: bool) -> Result<()> {
    let action = UninstallAction::new(&config.services);
    if action.uninstall_all(yes)? == UninstallAllOutcome::Aborted {
        return Ok(());
    }
    drain(config).await;
    Ok(())
}

/// Print installed servers with their versions, or every catalog server with
/// `available`.
#[tracing::instrument(skip(config))]
pub fn list<R: Runtime + 'static>(config: &Config<R>, available: bool) -> Result<()> {
    for line in list_lines(config, available)? {
        println!("{}", line);
    }
    Ok(())
}

fn list_lines<R: Runtime + 'static>(config: &Config<R>, available: bool) -> Result<Vec<String>> {
    let registry = &config.catalog;
    let mut lines = Vec::new();

    if available {
        let names = registry.available_server_names();
        if names.is_empty() {
            lines.push("No servers in the catalog.".to_string());
        }
        for name in names {
            let Some(server) = registry.server(&name) else {
                continue;
            };
            let mut line = name.clone();
            if let Some(description) = server.description() {
                line.push_str(&format!(" - {}", description));
            }
            if server.receipt()?.is_some() {
                line.push_str(" (installed)");
            }
            lines.push(line);
        }
        return Ok(lines);
    }

    for name in registry.available_server_names() {
        let Some(server) = registry.server(&name) else {
            continue;
        };
        match server.receipt() {
            Ok(Some(receipt)) => lines.push(format!("{} {}", receipt.name, receipt.version)),
            Ok(None) => {}
            Err(e) => debug!("Skipping {}: {:#}", name, e),
        }
    }
    if lines.is_empty() {
        lines.push("No servers installed.".to_string());
    }
    Ok(lines)
}

/// Let queued work finish, then close the surface.
async fn drain<R: Runtime + 'static>(config: &Config<R>) {
    config.queue.wait_idle().await;
    config.queue.close();
}
