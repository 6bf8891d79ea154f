//! Family factories for prometheus counters, gauges and histograms.
//!
//! Canonical names built from symbol identifiers are plain decimal strings,
//! which prometheus does not accept as metric or label names. Such names are
//! exposed with a leading underscore (`7` becomes `_7`). Free-form names of
//! that shape (`_7`) are therefore reserved and rejected.

use std::borrow::Cow;
use std::collections::HashMap;

use metricreg_core::{Error, FamilyDescriptor, FamilyFactory, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use tracing::debug;

use crate::error::registration_error;
use crate::family::{LabeledVec, PrometheusFamily};

/// Exposition-safe form of a canonical name.
pub fn exposition_name(name: &str) -> Cow<'_, str> {
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        Cow::Owned(format!("_{name}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Whether `name` has the shape [`exposition_name`] gives numeric names.
fn is_reserved(name: &str) -> bool {
    match name.strip_prefix('_') {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Reject a free-form name that would shadow an exposed numeric name.
fn check_reserved(family: &str, name: &str) -> Result<()> {
    if is_reserved(name) {
        return Err(Error::Backend {
            name: family.to_owned(),
            message: format!(
                "`{name}` is reserved for exposing canonical name `{}`",
                &name[1..]
            ),
        });
    }
    Ok(())
}

/// Naming options shared by every factory.
#[derive(Debug, Clone, Default)]
pub struct FamilyOptions {
    /// Prefix applied to every metric name.
    pub namespace: Option<String>,
    /// Help text keyed by raw or canonical metric name.
    pub help: HashMap<String, String>,
}

impl FamilyOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set help text for a metric.
    pub fn with_help(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.help.insert(name.into(), help.into());
        self
    }

    /// Help text for a family. Falls back to the raw name, since prometheus
    /// rejects empty help.
    fn help_for(&self, descriptor: &FamilyDescriptor) -> String {
        self.help
            .get(&descriptor.raw_name)
            .or_else(|| self.help.get(&descriptor.name))
            .cloned()
            .unwrap_or_else(|| descriptor.raw_name.clone())
    }

    fn opts(&self, descriptor: &FamilyDescriptor) -> Result<Opts> {
        let help = self.help_for(descriptor);
        match &self.namespace {
            Some(namespace) => {
                Ok(Opts::new(descriptor.name.clone(), help).namespace(namespace.clone()))
            }
            None => {
                check_reserved(&descriptor.name, &descriptor.name)?;
                Ok(Opts::new(exposition_name(&descriptor.name).into_owned(), help))
            }
        }
    }
}

fn exposition_labels(descriptor: &FamilyDescriptor) -> Result<Vec<String>> {
    descriptor
        .label_names
        .iter()
        .map(|name| {
            check_reserved(&descriptor.name, name)?;
            Ok(exposition_name(name).into_owned())
        })
        .collect()
}

fn register_vec<V, C>(
    registry: &Registry,
    descriptor: &FamilyDescriptor,
    create: C,
) -> Result<PrometheusFamily<V>>
where
    V: LabeledVec,
    C: FnOnce(&[&str]) -> prometheus::Result<V>,
{
    let labels = exposition_labels(descriptor)?;
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();

    let vec = create(&label_refs).map_err(|err| registration_error(&descriptor.name, err))?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|err| registration_error(&descriptor.name, err))?;

    debug!(
        canonical = %descriptor.name,
        labels = ?labels,
        "registered prometheus collector"
    );
    Ok(PrometheusFamily::new(
        descriptor.name.clone(),
        descriptor.label_names.clone(),
        vec,
    ))
}

/// Builds integer counter families.
#[derive(Debug, Clone, Default)]
pub struct CounterFactory {
    options: FamilyOptions,
}

impl CounterFactory {
    /// Create a counter factory.
    pub fn new(options: FamilyOptions) -> Self {
        Self { options }
    }
}

impl FamilyFactory<Registry> for CounterFactory {
    type Family = PrometheusFamily<IntCounterVec>;

    fn register(
        &self,
        registry: &Registry,
        descriptor: &FamilyDescriptor,
    ) -> Result<Self::Family> {
        let opts = self.options.opts(descriptor)?;
        register_vec(registry, descriptor, |labels| IntCounterVec::new(opts, labels))
    }
}

/// Builds integer gauge families.
#[derive(Debug, Clone, Default)]
pub struct GaugeFactory {
    options: FamilyOptions,
}

impl GaugeFactory {
    /// Create a gauge factory.
    pub fn new(options: FamilyOptions) -> Self {
        Self { options }
    }
}

impl FamilyFactory<Registry> for GaugeFactory {
    type Family = PrometheusFamily<IntGaugeVec>;

    fn register(
        &self,
        registry: &Registry,
        descriptor: &FamilyDescriptor,
    ) -> Result<Self::Family> {
        let opts = self.options.opts(descriptor)?;
        register_vec(registry, descriptor, |labels| IntGaugeVec::new(opts, labels))
    }
}

/// Builds histogram families.
///
/// Buckets are fixed per family; prometheus does not allow per-child buckets.
#[derive(Debug, Clone)]
pub struct HistogramFactory {
    options: FamilyOptions,
    buckets: Vec<f64>,
    buckets_by_name: HashMap<String, Vec<f64>>,
}

impl HistogramFactory {
    /// Create a histogram factory using prometheus' default buckets.
    pub fn new(options: FamilyOptions) -> Self {
        Self {
            options,
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
            buckets_by_name: HashMap::new(),
        }
    }

    /// Set the buckets used when no per-metric buckets are configured.
    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    /// Set buckets for one metric, keyed by raw or canonical name.
    pub fn with_buckets_for(mut self, name: impl Into<String>, buckets: Vec<f64>) -> Self {
        self.buckets_by_name.insert(name.into(), buckets);
        self
    }

    fn buckets_for(&self, descriptor: &FamilyDescriptor) -> Vec<f64> {
        self.buckets_by_name
            .get(&descriptor.raw_name)
            .or_else(|| self.buckets_by_name.get(&descriptor.name))
            .unwrap_or(&self.buckets)
            .clone()
    }
}

impl Default for HistogramFactory {
    fn default() -> Self {
        Self::new(FamilyOptions::default())
    }
}

impl FamilyFactory<Registry> for HistogramFactory {
    type Family = PrometheusFamily<HistogramVec>;

    fn register(
        &self,
        registry: &Registry,
        descriptor: &FamilyDescriptor,
    ) -> Result<Self::Family> {
        let opts = HistogramOpts::from(self.options.opts(descriptor)?)
            .buckets(self.buckets_for(descriptor));
        register_vec(registry, descriptor, |labels| HistogramVec::new(opts, labels))
    }
}
