//! Prometheus backend for metricreg.
//!
//! Binds the registry's family factory and family traits to the `prometheus`
//! crate. Each family is a labeled metric vector registered once with a
//! shared [`prometheus::Registry`]; each instance is one child of that vector.
//!
//! ```ignore
//! use metricreg_prometheus::PrometheusMetrics;
//!
//! let metrics = PrometheusMetrics::new(prometheus::Registry::new());
//! metrics.increment_counter("requests_total", 1, [("method", "GET")])?;
//! metrics.observe_histogram("latency_seconds", 0.042, [("method", "GET")])?;
//! ```

mod error;
pub mod factory;
pub mod family;
pub mod metrics;

pub use factory::{exposition_name, CounterFactory, FamilyOptions, GaugeFactory, HistogramFactory};
pub use family::{LabeledVec, PrometheusFamily};
pub use metrics::{
    CounterRegistry, GaugeRegistry, HistogramRegistry, PrometheusConfig, PrometheusMetrics,
};
