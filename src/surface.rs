//! Progress surface: where interactive installs and uninstalls are queued and shown.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use futures_util::FutureExt;
use log::{error, info};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::dispatch::ReadyDispatcher;
use crate::registry::{InstallOptions, Server};
use crate::sink::simple_sink;

pub trait ProgressSurface: Send + Sync {
    fn open(&self);
    fn close(&self);
    /// Queue an install; returns without waiting for it.
    fn install_server(&self, server: Arc<dyn Server>, version: Option<String>);
    /// Queue an uninstall; returns without waiting for it.
    fn uninstall_server(&self, server: Arc<dyn Server>);
    fn mark_all_servers_uninstalled(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Queued,
    Installing,
    Installed,
    Failed(String),
    Uninstalling,
    Uninstalled,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Queued => write!(f, "queued"),
            ServerStatus::Installing => write!(f, "installing"),
            ServerStatus::Installed => write!(f, "installed"),
            ServerStatus::Failed(reason) => write!(f, "failed: {}", reason),
            ServerStatus::Uninstalling => write!(f, "uninstalling"),
            ServerStatus::Uninstalled => write!(f, "uninstalled"),
        }
    }
}

/// A panicking operation counts as a failed one.
async fn isolate<F: Future<Output = Result<()>>>(operation: F) -> Result<()> {
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("panicked")),
    }
}

/// Runs queued operations on background tasks and prints status lines while open.
pub struct QueueSurface {
    state: Arc<QueueState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct QueueState {
    statuses: Mutex<BTreeMap<String, ServerStatus>>,
    open: AtomicBool,
    permits: Semaphore,
    dispatcher: Arc<ReadyDispatcher>,
}

impl QueueState {
    fn set(&self, name: &str, status: ServerStatus) {
        if self.open.load(Ordering::SeqCst) {
            println!("   {} {}", name, status);
        }
        let mut statuses = match self.statuses.lock() {
            Ok(statuses) => statuses,
            Err(poisoned) => poisoned.into_inner(),
        };
        statuses.insert(name.to_string(), status);
    }
}

impl QueueSurface {
    pub fn new(dispatcher: Arc<ReadyDispatcher>, max_concurrency: usize) -> Self {
        Self {
            state: Arc::new(QueueState {
                statuses: Mutex::new(BTreeMap::new()),
                open: AtomicBool::new(false),
                permits: Semaphore::new(max_concurrency.max(1)),
                dispatcher,
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn status(&self, name: &str) -> Option<ServerStatus> {
        match self.state.statuses.lock() {
            Ok(statuses) => statuses.get(name).cloned(),
            Err(poisoned) => poisoned.into_inner().get(name).cloned(),
        }
    }

    pub fn statuses(&self) -> BTreeMap<String, ServerStatus> {
        match self.state.statuses.lock() {
            Ok(statuses) => statuses.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(task),
            Err(poisoned) => poisoned.into_inner().push(task),
        }
    }

    /// Wait for every queued operation, including ones queued while waiting.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = match self.tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(poisoned) => poisoned.into_inner().drain(..).collect(),
            };
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(e) = task.await {
                    error!("Queued operation panicked: {}", e);
                }
            }
        }
    }
}

impl ProgressSurface for QueueSurface {
    fn open(&self) {
        if self.state.open.swap(true, Ordering::SeqCst) {
            return;
        }
        for (name, status) in self.statuses() {
            println!("   {} {}", name, status);
        }
    }

    fn close(&self) {
        self.state.open.store(false, Ordering::SeqCst);
    }

    fn install_server(&self, server: Arc<dyn Server>, version: Option<String>) {
        let state = Arc::clone(&self.state);
        state.set(server.name(), ServerStatus::Queued);

        let task = tokio::spawn(async move {
            let Ok(_permit) = state.permits.acquire().await else {
                return;
            };
            let name = server.name().to_string();
            state.set(&name, ServerStatus::Installing);

            let options = InstallOptions {
                sink: simple_sink(&name),
                requested_version: version,
            };
            match isolate(server.install(options)).await {
                Ok(()) => {
                    info!("Server {} was successfully installed.", name);
                    state.set(&name, ServerStatus::Installed);
                    state.dispatcher.dispatch(server);
                }
                Err(e) => {
                    error!("Server {} failed to install: {:#}", name, e);
                    state.set(&name, ServerStatus::Failed(format!("{:#}", e)));
                }
            }
        });
        self.track(task);
    }

    fn uninstall_server(&self, server: Arc<dyn Server>) {
        let state = Arc::clone(&self.state);
        state.set(server.name(), ServerStatus::Queued);

        let task = tokio::spawn(async move {
            let Ok(_permit) = state.permits.acquire().await else {
                return;
            };
            let name = server.name().to_string();
            state.set(&name, ServerStatus::Uninstalling);

            match isolate(server.uninstall()).await {
                Ok(()) => {
                    info!("Server {} was successfully uninstalled.", name);
                    state.set(&name, ServerStatus::Uninstalled);
                    state.dispatcher.forget(&name);
                }
                Err(e) => {
                    error!("Server {} failed to uninstall: {:#}", name, e);
                    state.set(&name, ServerStatus::Failed(format!("{:#}", e)));
                }
            }
        });
        self.track(task);
    }

    fn mark_all_servers_uninstalled(&self) {
        let mut statuses = match self.state.statuses.lock() {
            Ok(statuses) => statuses,
            Err(poisoned) => poisoned.into_inner(),
        };
        for status in statuses.values_mut() {
            *status = ServerStatus::Uninstalled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeRegistry, FakeServer};
    use std::sync::atomic::AtomicUsize;

    fn surface(servers: Vec<Arc<FakeServer>>) -> (QueueSurface, Arc<ReadyDispatcher>) {
        let dispatcher = Arc::new(ReadyDispatcher::new(FakeRegistry::new(servers)));
        (QueueSurface::new(Arc::clone(&dispatcher), 2), dispatcher)
    }

    #[tokio::test]
    async fn test_install_success_is_dispatched() {
        let foo = FakeServer::succeeding("foo");
        let (surface, dispatcher) = surface(vec![foo.clone()]);

        let ready = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ready);
        dispatcher
            .register(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .replay
            .await
            .unwrap();

        surface.install_server(foo.clone(), Some("1.0".into()));
        surface.wait_idle().await;

        assert_eq!(surface.status("foo"), Some(ServerStatus::Installed));
        assert_eq!(foo.requested_versions(), vec![Some("1.0".to_string())]);
        assert_eq!(ready.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_install_failure_is_not_dispatched() {
        let bar = FakeServer::failing("bar");
        let (surface, dispatcher) = surface(vec![bar.clone()]);

        let ready = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ready);
        dispatcher
            .register(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .replay
            .await
            .unwrap();

        surface.install_server(bar, None);
        surface.wait_idle().await;

        assert!(matches!(surface.status("bar"), Some(ServerStatus::Failed(_))));
        assert_eq!(ready.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_install_panic_is_reported_as_failure() {
        let boom = FakeServer::panicking("boom");
        let (surface, _dispatcher) = surface(vec![boom.clone()]);

        surface.install_server(boom, None);
        surface.wait_idle().await;

        assert_eq!(
            surface.status("boom"),
            Some(ServerStatus::Failed("panicked".to_string()))
        );
    }

    #[tokio::test]
    async fn test_uninstall_and_mark_all() {
        let foo = FakeServer::installed("foo");
        let baz = FakeServer::installed("baz");
        let (surface, _dispatcher) = surface(vec![foo.clone(), baz.clone()]);

        surface.uninstall_server(foo.clone());
        surface.install_server(baz.clone(), None);
        surface.wait_idle().await;
        assert_eq!(surface.status("foo"), Some(ServerStatus::Uninstalled));
        assert_eq!(foo.uninstall_calls(), 1);
        assert_eq!(surface.status("baz"), Some(ServerStatus::Installed));

        surface.mark_all_servers_uninstalled();
        assert!(
            surface
                .statuses()
                .values()
                .all(|status| *status == ServerStatus::Uninstalled)
        );
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let (surface, _dispatcher) = surface(vec![]);
        assert!(!surface.is_open());
        surface.open();
        assert!(surface.is_open());
        surface.close();
        assert!(!surface.is_open());
    }
}
