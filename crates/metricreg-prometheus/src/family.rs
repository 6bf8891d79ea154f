//! Prometheus metric vectors as registry families.

use std::fmt;

use metricreg_core::{LabelSet, MetricFamily, Result};
use prometheus::core::Collector;
use prometheus::{
    CounterVec, GaugeVec, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec,
};

use crate::error::instance_error;

/// A prometheus metric vector that yields one child per label-value tuple.
pub trait LabeledVec: Collector + Clone + Send + Sync + 'static {
    /// Child metric type.
    type Metric: Clone + Send + Sync + 'static;

    /// Child for the given label values, in declaration order.
    fn metric_with_values(&self, values: &[&str]) -> prometheus::Result<Self::Metric>;
}

macro_rules! impl_labeled_vec {
    ($($vec:ty => $metric:ty),* $(,)?) => {
        $(
            impl LabeledVec for $vec {
                type Metric = $metric;

                fn metric_with_values(&self, values: &[&str]) -> prometheus::Result<$metric> {
                    self.get_metric_with_label_values(values)
                }
            }
        )*
    };
}

impl_labeled_vec! {
    IntCounterVec => IntCounter,
    CounterVec => prometheus::Counter,
    IntGaugeVec => IntGauge,
    GaugeVec => prometheus::Gauge,
    HistogramVec => Histogram,
}

/// A registered prometheus vector together with its declared label names.
#[derive(Clone)]
pub struct PrometheusFamily<V> {
    name: String,
    label_names: Vec<String>,
    vec: V,
}

impl<V: LabeledVec> PrometheusFamily<V> {
    pub(crate) fn new(name: String, label_names: Vec<String>, vec: V) -> Self {
        Self {
            name,
            label_names,
            vec,
        }
    }

    /// Canonical family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical label names the family was declared with.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// The underlying prometheus vector.
    pub fn vec(&self) -> &V {
        &self.vec
    }
}

impl<V> fmt::Debug for PrometheusFamily<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusFamily")
            .field("name", &self.name)
            .field("label_names", &self.label_names)
            .finish_non_exhaustive()
    }
}

impl<V: LabeledVec> MetricFamily for PrometheusFamily<V> {
    type Metric = V::Metric;
    type Args = ();

    fn add(&self, labels: &LabelSet, _args: ()) -> Result<V::Metric> {
        let found: Vec<String> = labels.names().map(str::to_owned).collect();
        if found != self.label_names {
            return Err(metricreg_core::Error::LabelMismatch {
                name: self.name.clone(),
                expected: self.label_names.clone(),
                found,
            });
        }

        let values: Vec<&str> = labels.values().collect();
        self.vec
            .metric_with_values(&values)
            .map_err(|err| instance_error(&self.name, &self.label_names, &found, err))
    }
}
