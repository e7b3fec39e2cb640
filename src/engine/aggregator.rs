//! Single-consumer fold of module events into run state

use std::collections::VecDeque;

use serde::Serialize;

use super::catalog::{Module, ModuleCatalog};
use super::events::ModuleEvent;

/// Number of debug messages kept for display
pub const DEBUG_HISTORY: usize = 200;

/// Sums of the per-module counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateProgress {
    pub done: usize,
    pub total: usize,
}

impl AggregateProgress {
    /// Completed share in `0.0..=1.0`; 0 while no total is known
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done as f64 / self.total as f64).min(1.0)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    catalog: ModuleCatalog,
    progress: AggregateProgress,
    all_done: bool,
    debug_log: VecDeque<String>,
}

impl Aggregator {
    pub fn new(catalog: ModuleCatalog) -> Self {
        let mut aggregator = Self {
            catalog,
            progress: AggregateProgress::default(),
            all_done: false,
            debug_log: VecDeque::with_capacity(DEBUG_HISTORY),
        };
        aggregator.recompute();
        aggregator
    }

    /// Reset module results for a fresh run of the current selection
    pub fn start_run(&mut self) {
        self.catalog.reset_for_run();
        self.debug_log.clear();
        self.recompute();
    }

    /// Fold one event into the state; false when it named an unknown module
    pub fn apply(&mut self, event: ModuleEvent) -> bool {
        match event {
            ModuleEvent::Debug { message } => {
                self.push_debug(message);
                true
            }
            ModuleEvent::Progress {
                module,
                checked,
                total,
                status,
            } => self.update(&module, |m| {
                // Counters only grow; an incoming checked never passes the total
                if total > 0 {
                    m.total = m.total.max(total);
                }
                if checked > 0 {
                    let checked = if m.total > 0 { checked.min(m.total) } else { checked };
                    m.checked = m.checked.max(checked);
                }
                // An error message stays visible for the rest of the run
                if !status.is_empty() && !m.errored {
                    m.status = status;
                }
            }),
            ModuleEvent::Complete { module } => self.update(&module, |m| m.complete = true),
            ModuleEvent::Error { module, message } => self.update(&module, |m| {
                tracing::debug!("{} reported an error: {}", m.name, message);
                m.errored = true;
                m.status = message;
            }),
            ModuleEvent::AffectedAssetFound { module, asset } => {
                self.update(&module, |m| m.affected_assets.push(asset))
            }
        }
    }

    fn update(&mut self, name: &str, change: impl FnOnce(&mut Module)) -> bool {
        let Some(module) = self.catalog.get_mut(name) else {
            tracing::warn!("Event for unknown module: {}", name);
            return false;
        };
        change(module);
        self.recompute();
        true
    }

    fn recompute(&mut self) {
        let (done, total) = self
            .catalog
            .iter()
            .fold((0, 0), |(done, total), m| (done + m.checked, total + m.total));
        self.progress = AggregateProgress { done, total };
        self.all_done = self.catalog.iter().all(|m| m.complete);
    }

    fn push_debug(&mut self, message: String) {
        if self.debug_log.len() == DEBUG_HISTORY {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(message);
    }

    pub fn progress(&self) -> AggregateProgress {
        self.progress
    }

    /// True once every module, selected or not, is complete
    pub fn all_done(&self) -> bool {
        self.all_done
    }

    /// Counters are final and every module has finished
    pub fn is_settled(&self) -> bool {
        self.all_done && self.progress.done == self.progress.total
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Most recent debug messages, oldest first
    pub fn debug_log(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.debug_log.iter().map(String::as_str)
    }
}
