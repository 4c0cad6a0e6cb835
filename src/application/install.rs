//! Install use case.
//!
//! Two entry points share the resolve-then-start shape:
//! - `install` hands a single server to the progress surface and returns at once
//! - `install_sync` resolves the whole batch first, starts every install
//!   concurrently and waits on the completion barrier

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures_util::FutureExt;
use log::{debug, error, info, warn};

use super::{Resolved, Services};
use crate::barrier::{BarrierOutcome, completion_channel};
use crate::error::InstallerError;
use crate::registry::{InstallOptions, Server};
use crate::runtime::Runtime;
use crate::sink::simple_sink;

/// Servers installed by a successful batch, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub installed: Vec<String>,
}

struct Completion {
    index: usize,
    server: Arc<dyn Server>,
    outcome: Result<()>,
}

pub struct InstallAction<'a, R: Runtime> {
    services: &'a Services<R>,
}

impl<'a, R: Runtime> InstallAction<'a, R> {
    pub fn new(services: &'a Services<R>) -> Self {
        Self { services }
    }

    /// Queue a single install on the progress surface.
    ///
    /// Unknown servers are reported to the user; nothing here is fatal.
    #[tracing::instrument(skip(self))]
    pub fn install(&self, raw: &str) {
        let services = self.services;
        match services.resolve(raw) {
            Ok(Some(Resolved { server, version })) => {
                debug!("Queueing install of {} version={:?}", server.name(), version);
                services.surface.install_server(server, version);
                services.surface.open();
            }
            Ok(None) => debug!("No server chosen for {}, nothing to install", raw),
            Err(reason) => services.runtime.notify(&reason),
        }
    }

    /// Install every identifier and wait for all of them.
    ///
    /// Nothing starts unless every identifier resolves. Failures and then
    /// successes are logged one by one before a single `BatchFailed` error is
    /// raised.
    #[tracing::instrument(skip(self))]
    pub async fn install_sync(&self, raws: &[String]) -> Result<BatchReport> {
        let services = self.services;

        let mut batch = Vec::with_capacity(raws.len());
        for raw in raws {
            match services.resolve(raw) {
                Ok(Some(resolved)) => batch.push(resolved),
                Ok(None) => debug!("No server chosen for {}, skipping", raw),
                Err(reason) => {
                    return Err(services.host.fatal(InstallerError::Resolution {
                        identifier: raw.clone(),
                        reason,
                    }));
                }
            }
        }

        let total = batch.len();
        let (tx, barrier) = completion_channel::<Completion>(total);
        for (index, Resolved { server, version }) in batch.into_iter().enumerate() {
            info!("Installing server {}", server.name());
            let tx = tx.clone();
            let dispatcher = Arc::clone(&services.dispatcher);
            tokio::spawn(async move {
                let options = InstallOptions {
                    sink: simple_sink(server.name()),
                    requested_version: version,
                };
                let outcome = match AssertUnwindSafe(server.install(options)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(anyhow!("install of {} panicked", server.name())),
                };
                if outcome.is_ok() {
                    dispatcher.dispatch(Arc::clone(&server));
                }
                tx.complete(Completion {
                    index,
                    server,
                    outcome,
                });
            });
        }
        drop(tx);

        let max_wait = services.settings.max_wait;
        let mut completions = match barrier.wait(max_wait).await {
            BarrierOutcome::Complete(completions) => completions,
            BarrierOutcome::TimedOut {
                received,
                outstanding,
            } => {
                warn!(
                    "{} of {} servers finished before the timeout: {}",
                    received.len(),
                    total,
                    received
                        .iter()
                        .map(|c| c.server.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                return Err(services.host.fatal(InstallerError::BarrierTimeout {
                    outstanding,
                    total,
                    waited: max_wait,
                }));
            }
        };
        completions.sort_by_key(|c| c.index);

        let (failed, succeeded): (Vec<_>, Vec<_>) =
            completions.into_iter().partition(|c| c.outcome.is_err());

        for completion in &failed {
            error!("Server {} failed to install.", completion.server.name());
            if let Err(e) = &completion.outcome {
                warn!("{}: {:#}", completion.server.name(), e);
            }
        }

        let mut report = BatchReport::default();
        for completion in succeeded {
            let name = completion.server.name();
            info!("Server {} was successfully installed.", name);
            report.installed.push(name.to_string());
        }

        if !failed.is_empty() {
            return Err(services.host.fatal(InstallerError::BatchFailed {
                failed: failed.len(),
                total,
            }));
        }
        Ok(report)
    }
}
