//! Module execution and progress aggregation
//!
//! Architecture:
//! - Catalog: static module definitions plus per-run module state
//! - Runner: one OS thread per selected module, fed by report discovery
//! - Events: one bounded channel carrying every worker message
//! - Aggregator: the single consumer folding events into counters

pub mod aggregator;
pub mod catalog;
pub mod events;
pub mod extractor;
pub mod runner;
pub mod trace;

pub use aggregator::{AggregateProgress, Aggregator};
pub use catalog::{AffectedAsset, Module, ModuleCatalog, ModuleDefinition, builtin_modules};
pub use events::{EVENT_BUFFER, EventBus, EventSender, ModuleEvent};
pub use runner::ModuleRunner;
pub use trace::ProgressTrace;
