//! Ready-event dispatcher.
//!
//! Subscribers learn about every server that becomes ready: a new subscriber is
//! first replayed the servers that are already installed, then receives live
//! dispatches. Each subscriber sees a given server at most once until that server
//! is forgotten (uninstalled).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;
use tokio::task::JoinHandle;

use crate::registry::{Server, ServerRegistry};

pub type ReadyCallback = Arc<dyn Fn(Arc<dyn Server>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchToken(u64);

/// Handle returned by [`ReadyDispatcher::register`].
pub struct Subscription {
    pub token: DispatchToken,
    /// Completes once the installed servers have been replayed to the subscriber.
    pub replay: JoinHandle<()>,
}

struct Subscriber {
    callback: ReadyCallback,
    delivered: Mutex<HashSet<String>>,
}

impl Subscriber {
    fn deliver(&self, server: Arc<dyn Server>) {
        let fresh = match self.delivered.lock() {
            Ok(mut delivered) => delivered.insert(server.name().to_string()),
            Err(poisoned) => poisoned.into_inner().insert(server.name().to_string()),
        };
        // Lock is released before the callback runs so it may call back into the dispatcher
        if fresh {
            (self.callback)(server);
        }
    }

    fn forget(&self, name: Option<&str>) {
        let mut delivered = match self.delivered.lock() {
            Ok(delivered) => delivered,
            Err(poisoned) => poisoned.into_inner(),
        };
        match name {
            Some(name) => {
                delivered.remove(name);
            }
            None => delivered.clear(),
        }
    }
}

pub struct ReadyDispatcher {
    registry: Arc<dyn ServerRegistry>,
    subscribers: RwLock<HashMap<DispatchToken, Arc<Subscriber>>>,
    next_token: AtomicU64,
}

impl ReadyDispatcher {
    pub fn new(registry: Arc<dyn ServerRegistry>) -> Self {
        Self {
            registry,
            subscribers: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        match self.subscribers.read() {
            Ok(subscribers) => subscribers.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Add a subscriber. Installed servers are replayed on a separate task,
    /// never inline, so this returns before the callback first runs.
    ///
    /// Must be called from within a Tokio runtime; the replay task is spawned
    /// with `tokio::spawn`, which panics outside one.
    pub fn register<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<dyn Server>) + Send + Sync + 'static,
    {
        let token = DispatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            callback: Arc::new(callback),
            delivered: Mutex::new(HashSet::new()),
        });

        match self.subscribers.write() {
            Ok(mut subscribers) => subscribers.insert(token, Arc::clone(&subscriber)),
            Err(poisoned) => poisoned.into_inner().insert(token, Arc::clone(&subscriber)),
        };
        debug!("Registered ready subscriber {:?}", token);

        let registry = Arc::clone(&self.registry);
        let replay = tokio::spawn(async move {
            for server in registry.installed_servers() {
                subscriber.deliver(server);
            }
        });

        Subscription { token, replay }
    }

    /// Tell every subscriber that `server` is ready.
    pub fn dispatch(&self, server: Arc<dyn Server>) {
        debug!("Dispatching ready event for {}", server.name());
        for subscriber in self.snapshot() {
            subscriber.deliver(Arc::clone(&server));
        }
    }

    /// Forget that `name` was delivered, so a reinstall is announced again.
    pub fn forget(&self, name: &str) {
        for subscriber in self.snapshot() {
            subscriber.forget(Some(name));
        }
    }

    pub fn forget_all(&self) {
        for subscriber in self.snapshot() {
            subscriber.forget(None);
        }
    }
}
