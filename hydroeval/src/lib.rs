//! hydroeval is a metric evaluation core for scoring hydrologic (and other
//! time-series) model output against observations.
//!
//! It computes per-threshold scaled scores from paired observed/predicted
//! series, aggregates them into weighted grades, and attaches bootstrap
//! confidence intervals — without caring where the series came from or how
//! they get persisted, served, or authenticated. Those concerns live in
//! whatever calls into this crate.
//!
//! # What's here
//!
//! - [`temporal`]: calendar-aware date arithmetic (`ClockworkDate`) and
//!   ISO-8601 relative durations (`RelativeDuration`), built on a small
//!   circular-group primitive (`temporal::group`).
//! - [`expression`]: a sandboxed `{{% variable %}}`/`<% 'a' op 'b' %>`
//!   substitution engine for configuration trees represented as
//!   [`serde_json::Value`].
//! - [`events`]: a signature-checked event router supporting synchronous,
//!   deferred, and async handlers.
//! - [`communicator`]: bounded, verbosity-gated message queues for
//!   surfacing scoring progress and diagnostics.
//! - [`scoring`]: thresholds, the `Metric` contract, scaling, bootstrap
//!   confidence intervals, and aggregation into scores/grades.
//! - [`distributor`]: sequential or concurrent dispatch of per-metric work,
//!   always returning results in input order.
//! - [`restorable`]: transport-safe packaging of a callable/value
//!   reference, restored against a build-time registry.
//! - [`settings`]: documented, environment-overridable configuration
//!   structs (`#[settings]`-derived).
//! - [`telemetry`]: the engine's own operational logging.

#![warn(missing_docs)]

pub mod communicator;
pub mod distributor;
pub mod error;
pub mod events;
pub mod expression;
pub mod restorable;
pub mod scoring;
pub mod settings;
pub mod telemetry;
pub mod temporal;

pub use error::{Error, Result};

pub use communicator::{Communicator, CommunicatorGroup, Verbosity};
pub use distributor::Distributor;
pub use events::{Event, EventRouter};
pub use scoring::{Metric, MetricMeta, MetricResults, Pairs, Score, Scores, ScoringScheme, Threshold};
pub use temporal::{ClockworkDate, RelativeDuration};
