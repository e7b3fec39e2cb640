//! Module event bus
//!
//! Workers never touch module state. They construct [`ModuleEvent`] values and
//! send them over one bounded channel; the single consumer folds them into the
//! aggregate state. A full channel blocks the sender, so a fast worker cannot
//! run arbitrarily far ahead of the consumer.

use crossbeam::channel::{Receiver, Sender, bounded};

use super::catalog::AffectedAsset;

/// Default number of in-flight events before senders block
pub const EVENT_BUFFER: usize = 64;

/// Everything a module worker can report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEvent {
    /// Counter update; a zero `checked` or `total` leaves known values untouched
    Progress {
        module: String,
        checked: usize,
        total: usize,
        status: String,
    },
    Complete {
        module: String,
    },
    Error {
        module: String,
        message: String,
    },
    Debug {
        message: String,
    },
    AffectedAssetFound {
        module: String,
        asset: AffectedAsset,
    },
}

impl ModuleEvent {
    /// Name of the module the event belongs to, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            ModuleEvent::Progress { module, .. }
            | ModuleEvent::Complete { module }
            | ModuleEvent::Error { module, .. }
            | ModuleEvent::AffectedAssetFound { module, .. } => Some(module),
            ModuleEvent::Debug { .. } => None,
        }
    }
}

/// Creates the sender/receiver pair shared by a run
pub struct EventBus;

impl EventBus {
    pub fn channel(capacity: usize) -> (EventSender, Receiver<ModuleEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (EventSender { tx }, rx)
    }
}

/// Producer half handed to workers
///
/// Sends block while the buffer is full. Once the consumer is gone every send
/// is a no-op and reports `false`, letting workers wind down.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<ModuleEvent>,
}

impl EventSender {
    pub fn send(&self, event: ModuleEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!("Event dropped, consumer is gone: {:?}", e.into_inner());
                false
            }
        }
    }

    pub fn progress(
        &self,
        module: &str,
        checked: usize,
        total: usize,
        status: impl Into<String>,
    ) -> bool {
        self.send(ModuleEvent::Progress {
            module: module.to_string(),
            checked,
            total,
            status: status.into(),
        })
    }

    pub fn complete(&self, module: &str) -> bool {
        self.send(ModuleEvent::Complete {
            module: module.to_string(),
        })
    }

    pub fn error(&self, module: &str, message: impl Into<String>) -> bool {
        self.send(ModuleEvent::Error {
            module: module.to_string(),
            message: message.into(),
        })
    }

    pub fn debug(&self, message: impl Into<String>) -> bool {
        self.send(ModuleEvent::Debug {
            message: message.into(),
        })
    }

    pub fn affected(&self, module: &str, asset: AffectedAsset) -> bool {
        self.send(ModuleEvent::AffectedAssetFound {
            module: module.to_string(),
            asset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_after_consumer_dropped() {
        let (tx, rx) = EventBus::channel(1);
        drop(rx);
        assert!(!tx.debug("nobody listening"));
    }

    #[test]
    fn test_fast_and_slow_producers_are_both_drained() {
        let (tx, rx) = EventBus::channel(1);

        let fast = {
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 1..=100 {
                    tx.progress("fast", i, 100, "");
                    thread::sleep(Duration::from_millis(1));
                }
                tx.complete("fast");
            })
        };
        let slow = {
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 1..=3 {
                    thread::sleep(Duration::from_millis(40));
                    tx.progress("slow", i, 3, "");
                }
                tx.complete("slow");
            })
        };
        drop(tx);

        let events: Vec<ModuleEvent> = rx.iter().collect();
        fast.join().unwrap();
        slow.join().unwrap();

        let count = |name: &str| events.iter().filter(|e| e.module() == Some(name)).count();
        assert_eq!(count("fast"), 101);
        assert_eq!(count("slow"), 4);

        // Each module's completion arrives after all of its progress
        for name in ["fast", "slow"] {
            let last = events.iter().rev().find(|e| e.module() == Some(name)).unwrap();
            assert!(matches!(last, ModuleEvent::Complete { .. }));
        }
    }
}
