//! Process-boundary behavior of the hosting application.

use std::sync::atomic::{AtomicI32, Ordering};

use log::error;

const NO_EXIT: i32 = 0;

/// Tracks whether the process should exit with an error once all work has drained.
#[derive(Debug, Default)]
pub struct Host {
    headless: bool,
    exit_code: AtomicI32,
}

impl Host {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            exit_code: AtomicI32::new(NO_EXIT),
        }
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Log a fatal error and hand it back for propagation. When headless, also
    /// schedule a non-zero exit; nothing terminates here so pending logging and
    /// cleanup still run.
    pub fn fatal(&self, err: impl Into<anyhow::Error>) -> anyhow::Error {
        let err = err.into();
        error!("{:#}", err);
        if self.headless {
            self.schedule_exit(1);
        }
        err
    }

    pub fn schedule_exit(&self, code: i32) {
        // First request wins
        let _ = self
            .exit_code
            .compare_exchange(NO_EXIT, code, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn requested_exit(&self) -> Option<i32> {
        match self.exit_code.load(Ordering::SeqCst) {
            NO_EXIT => None,
            code => Some(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_schedules_exit_only_when_headless() {
        let host = Host::new(false);
        let err = host.fatal(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(host.requested_exit(), None);

        let host = Host::new(true);
        let _ = host.fatal(anyhow::anyhow!("boom"));
        assert_eq!(host.requested_exit(), Some(1));
    }

    #[test]
    fn test_first_exit_code_wins() {
        let host = Host::new(true);
        host.schedule_exit(2);
        host.schedule_exit(1);
        assert_eq!(host.requested_exit(), Some(2));
    }
}
