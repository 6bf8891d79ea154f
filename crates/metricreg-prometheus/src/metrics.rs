//! One-stop facade over counter, gauge and histogram registries.

use std::fmt;
use std::sync::Arc;

use metricreg_core::{MetricsRegistry, RegistryConfig, Result, SymbolTable};
use prometheus::{Histogram, IntCounter, IntGauge, Registry};

use crate::factory::{CounterFactory, FamilyOptions, GaugeFactory, HistogramFactory};

/// Counter registry over a prometheus backend.
pub type CounterRegistry = MetricsRegistry<CounterFactory, Registry>;
/// Gauge registry over a prometheus backend.
pub type GaugeRegistry = MetricsRegistry<GaugeFactory, Registry>;
/// Histogram registry over a prometheus backend.
pub type HistogramRegistry = MetricsRegistry<HistogramFactory, Registry>;

/// Configuration for [`PrometheusMetrics`].
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Naming options shared by all metric kinds.
    pub options: FamilyOptions,
    /// Default histogram buckets.
    pub buckets: Vec<f64>,
    /// Cache configuration applied to each per-kind registry.
    pub registry: RegistryConfig,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            options: FamilyOptions::default(),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
            registry: RegistryConfig::default(),
        }
    }
}

impl PrometheusConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options = self.options.with_namespace(namespace);
        self
    }

    /// Set help text for a metric.
    pub fn with_help(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.options = self.options.with_help(name, help);
        self
    }

    /// Set the default histogram buckets.
    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    /// Set the cache configuration.
    pub fn with_registry_config(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

/// Counter, gauge and histogram registries sharing one prometheus registry.
///
/// A name belongs to exactly one kind: asking for a gauge under a name already
/// used by a counter fails with a registration conflict.
pub struct PrometheusMetrics {
    registry: Arc<Registry>,
    counters: CounterRegistry,
    gauges: GaugeRegistry,
    histograms: HistogramRegistry,
}

impl PrometheusMetrics {
    /// Create a facade over `registry` with the default configuration.
    pub fn new(registry: Registry) -> Self {
        let registry = Arc::new(registry);
        let options = FamilyOptions::default();
        Self {
            counters: MetricsRegistry::new(
                Arc::clone(&registry),
                CounterFactory::new(options.clone()),
            ),
            gauges: MetricsRegistry::new(Arc::clone(&registry), GaugeFactory::new(options.clone())),
            histograms: MetricsRegistry::new(
                Arc::clone(&registry),
                HistogramFactory::new(options),
            ),
            registry,
        }
    }

    /// Create a facade over `registry` with an explicit configuration.
    pub fn with_config(registry: Registry, config: PrometheusConfig) -> Result<Self> {
        let registry = Arc::new(registry);
        let PrometheusConfig {
            options,
            buckets,
            registry: cache,
        } = config;

        Ok(Self {
            counters: MetricsRegistry::with_config(
                Arc::clone(&registry),
                CounterFactory::new(options.clone()),
                cache.clone(),
            )?,
            gauges: MetricsRegistry::with_config(
                Arc::clone(&registry),
                GaugeFactory::new(options.clone()),
                cache.clone(),
            )?,
            histograms: MetricsRegistry::with_config(
                Arc::clone(&registry),
                HistogramFactory::new(options).with_buckets(buckets),
                cache,
            )?,
            registry,
        })
    }

    /// Canonicalize names of every metric kind with `symbols`.
    pub fn with_symbols(self, symbols: Arc<dyn SymbolTable>) -> Self {
        Self {
            counters: self.counters.with_symbols(Arc::clone(&symbols)),
            gauges: self.gauges.with_symbols(Arc::clone(&symbols)),
            histograms: self.histograms.with_symbols(symbols),
            registry: self.registry,
        }
    }

    /// Get or create a counter.
    pub fn counter<L, K, V>(&self, name: &str, labels: L) -> Result<Arc<IntCounter>>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.counters.get(name, labels, ())
    }

    /// Get or create a gauge.
    pub fn gauge<L, K, V>(&self, name: &str, labels: L) -> Result<Arc<IntGauge>>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.gauges.get(name, labels, ())
    }

    /// Get or create a histogram.
    pub fn histogram<L, K, V>(&self, name: &str, labels: L) -> Result<Arc<Histogram>>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.histograms.get(name, labels, ())
    }

    /// Add `by` to a counter.
    pub fn increment_counter<L, K, V>(&self, name: &str, by: u64, labels: L) -> Result<()>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.counter(name, labels)?.inc_by(by);
        Ok(())
    }

    /// Set a gauge.
    pub fn set_gauge<L, K, V>(&self, name: &str, value: i64, labels: L) -> Result<()>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.gauge(name, labels)?.set(value);
        Ok(())
    }

    /// Add `by` to a gauge.
    pub fn increment_gauge<L, K, V>(&self, name: &str, by: i64, labels: L) -> Result<()>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.gauge(name, labels)?.add(by);
        Ok(())
    }

    /// Subtract `by` from a gauge.
    pub fn decrement_gauge<L, K, V>(&self, name: &str, by: i64, labels: L) -> Result<()>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.gauge(name, labels)?.sub(by);
        Ok(())
    }

    /// Record an observation in a histogram.
    pub fn observe_histogram<L, K, V>(&self, name: &str, value: f64, labels: L) -> Result<()>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.histogram(name, labels)?.observe(value);
        Ok(())
    }

    /// The shared prometheus registry, for whoever exposes it.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Counter registry.
    pub fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    /// Gauge registry.
    pub fn gauges(&self) -> &GaugeRegistry {
        &self.gauges
    }

    /// Histogram registry.
    pub fn histograms(&self) -> &HistogramRegistry {
        &self.histograms
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusMetrics")
            .field("counters", &self.counters)
            .field("gauges", &self.gauges)
            .field("histograms", &self.histograms)
            .finish_non_exhaustive()
    }
}
