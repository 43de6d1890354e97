//! Tally analytics engine.
//!
//! Turns raw timestamped vote and payment records into immutable analytics
//! snapshots: time-bucketed aggregates, confidence-bounded proportions,
//! anomaly flags, and short-horizon forecasts.
//!
//! The engine is on-demand and read-only. It talks to the platform's data
//! store exclusively through the [`store::DataStore`] trait, injected into
//! the [`report::ReportAssembler`] so tests and embedders can substitute
//! fakes. Independent sub-aggregations fan out on scoped threads; a failed
//! sub-aggregation defaults its report section and is logged, never
//! propagated. The whole computation runs under a caller-supplied budget.

pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod logging;
pub mod report;
pub mod store;

pub use aggregate::Aggregator;
pub use anomaly::AnomalyDetector;
pub use config::EngineConfig;
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use report::{ReportAssembler, ReportRequest};
pub use store::{DataStore, MemoryStore};

pub use tally_common::{
    AnalyticsSnapshot, AnomalyRecord, DateRange, DomainPayload, Error, ForecastPoint,
    Granularity, ReportDomain, Result, Scope, SnapshotStatus, TimeSeries,
};
