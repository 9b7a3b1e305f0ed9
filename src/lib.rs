//! weft - graph workflow execution engine
//!
//! weft turns a stored graph definition into an ordered, branch-aware,
//! queue-driven run: typed nodes process streams of JSON items, branching
//! nodes route items across named ports, and a coordinator walks the
//! graph with breakpoints, timeouts, and error routing.
//!
//! ## Example
//!
//! ```yaml
//! id: order-alerts
//! name: Order alerts
//!
//! nodes:
//!   - id: start
//!     type: trigger
//!
//!   - id: only-paid
//!     type: filter
//!     config:
//!       conditions:
//!         - field: status
//!           operator: equals
//!           value: paid
//!
//!   - id: done
//!     type: workflow_output
//!
//! connections:
//!   - source: start
//!     target: only-paid
//!   - source: only-paid
//!     target: done
//! ```
//!
//! Runs are driven either directly through [`engine::Coordinator`] or by
//! queueing [`engine::JobPayload`]s for an [`engine::JobRunner`].

pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod item;
pub mod metrics;
pub mod nodes;
pub mod shutdown;
pub mod storage;
pub mod workflow;

pub use error::{Error, Result};
pub use item::ExecutionItem;
