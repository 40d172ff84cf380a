//! Pipeline lifecycle: Running -> Stopping -> Stopped
//!
//! The coordinator is the single writer. Every task gets a [`LifecycleHandle`]
//! at construction and observes state changes through it.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::mailbox::SharedMailbox;

/// Pipeline lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Stopping,
    Stopped,
}

/// Owns the lifecycle state and closes mailboxes on shutdown
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: watch::Sender<PipelineState>,
    mailboxes: Mutex<Vec<SharedMailbox>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PipelineState::Running);
        Self {
            state,
            mailboxes: Mutex::new(Vec::new()),
        }
    }

    /// Read-only handle for a task
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            rx: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Register a mailbox to be closed on shutdown
    ///
    /// A mailbox registered after shutdown began is closed immediately.
    pub fn register(&self, mailbox: SharedMailbox) {
        // State is read under the registry lock so begin_shutdown cannot
        // slip between the check and the push.
        let mut mailboxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state() != PipelineState::Running {
            mailbox.close();
        }
        mailboxes.push(mailbox);
    }

    /// Move Running -> Stopping and close every registered mailbox
    ///
    /// Returns false if shutdown had already begun.
    pub fn begin_shutdown(&self) -> bool {
        let mailboxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        let transitioned = self.state.send_if_modified(|state| {
            if *state == PipelineState::Running {
                *state = PipelineState::Stopping;
                true
            } else {
                false
            }
        });

        if transitioned {
            for mailbox in mailboxes.iter() {
                mailbox.close();
            }
            info!(mailboxes = mailboxes.len(), "Shutdown initiated");
        }

        transitioned
    }

    /// Enter the terminal Stopped state
    pub fn mark_stopped(&self) {
        self.begin_shutdown();
        self.state.send_if_modified(|state| {
            if *state == PipelineState::Stopped {
                false
            } else {
                *state = PipelineState::Stopped;
                true
            }
        });
        debug!("Pipeline stopped");
    }
}

/// Read-only view of the pipeline state
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    rx: watch::Receiver<PipelineState>,
}

impl LifecycleHandle {
    pub fn state(&self) -> PipelineState {
        *self.rx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Resolve once the pipeline leaves Running
    ///
    /// Also resolves if the coordinator is dropped.
    pub async fn stopping(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|state| *state != PipelineState::Running).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::ResultMailbox;
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_shutdown_closes_mailboxes() {
        let coordinator = ShutdownCoordinator::new();
        let mailbox: SharedMailbox = Arc::new(ResultMailbox::new());
        coordinator.register(Arc::clone(&mailbox));

        assert!(!mailbox.is_closed());
        assert!(coordinator.begin_shutdown());
        assert!(mailbox.is_closed());
        assert_eq!(coordinator.state(), PipelineState::Stopping);
    }

    #[tokio::test]
    async fn test_begin_shutdown_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        assert!(coordinator.begin_shutdown());
        assert!(!coordinator.begin_shutdown());
        assert_eq!(coordinator.state(), PipelineState::Stopping);
    }

    #[tokio::test]
    async fn test_register_after_shutdown_closes() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.begin_shutdown();

        let mailbox: SharedMailbox = Arc::new(ResultMailbox::new());
        coordinator.register(Arc::clone(&mailbox));
        assert!(mailbox.is_closed());
    }

    #[tokio::test]
    async fn test_handle_observes_transitions() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let handle = coordinator.handle();
        assert!(handle.is_running());

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.stopping().await })
        };

        coordinator.begin_shutdown();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stopping resolved")
            .unwrap();
        assert_eq!(handle.state(), PipelineState::Stopping);

        coordinator.mark_stopped();
        assert_eq!(handle.state(), PipelineState::Stopped);
        assert!(!handle.is_running());
    }

    #[test]
    fn test_concurrent_register_never_misses_shutdown() {
        for _ in 0..50 {
            let coordinator = ShutdownCoordinator::new();
            let mailboxes: Vec<SharedMailbox> =
                (0..8).map(|_| Arc::new(ResultMailbox::new())).collect();

            std::thread::scope(|scope| {
                for mailbox in &mailboxes {
                    let coordinator = &coordinator;
                    scope.spawn(move || coordinator.register(Arc::clone(mailbox)));
                }
                scope.spawn(|| coordinator.begin_shutdown());
            });

            assert!(mailboxes.iter().all(|mailbox| mailbox.is_closed()));
        }
    }

    #[tokio::test]
    async fn test_stopped_is_terminal() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.mark_stopped();

        assert!(!coordinator.begin_shutdown());
        assert_eq!(coordinator.state(), PipelineState::Stopped);
    }
}
