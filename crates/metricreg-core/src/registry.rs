//! Family and instance registry.
//!
//! The registry guarantees one backend family per canonical metric name and
//! one backend instance per canonical (name, labels) pair, however many call
//! sites ask for them and from however many threads.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::backend::{FamilyDescriptor, FamilyFactory, MetricFamily};
use crate::canonical::Canonicalizer;
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::key::InstanceKey;
use crate::symbols::SymbolTable;

type FamilyOf<F, B> = <F as FamilyFactory<B>>::Family;
type MetricOf<F, B> = <FamilyOf<F, B> as MetricFamily>::Metric;
type ArgsOf<F, B> = <FamilyOf<F, B> as MetricFamily>::Args;

/// Deduplicating registry of metric families and instances.
///
/// `F` builds families in the backend, `B` is the backend-wide registry the
/// families are registered with. Construction of a family or an instance
/// happens inside the cache's shard lock, so racing first requests for the
/// same key still build exactly one object.
pub struct MetricsRegistry<F, B: ?Sized>
where
    F: FamilyFactory<B>,
{
    backend: Arc<B>,
    factory: F,
    canonicalizer: Canonicalizer,
    /// Canonical metric name -> family.
    families: DashMap<String, Arc<FamilyOf<F, B>>>,
    /// Canonical (name, labels) -> instance.
    instances: DashMap<InstanceKey, Arc<MetricOf<F, B>>>,
}

impl<F, B> MetricsRegistry<F, B>
where
    F: FamilyFactory<B>,
    B: ?Sized,
{
    /// Create a registry with the default configuration and no symbols.
    pub fn new(backend: Arc<B>, factory: F) -> Self {
        Self {
            backend,
            factory,
            canonicalizer: Canonicalizer::default(),
            families: DashMap::new(),
            instances: DashMap::new(),
        }
    }

    /// Create a registry with an explicit configuration.
    pub fn with_config(backend: Arc<B>, factory: F, config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let (families, instances) = match config.shard_amount {
            Some(shards) => (
                DashMap::with_capacity_and_shard_amount(config.family_capacity, shards),
                DashMap::with_capacity_and_shard_amount(config.instance_capacity, shards),
            ),
            None => (
                DashMap::with_capacity(config.family_capacity),
                DashMap::with_capacity(config.instance_capacity),
            ),
        };

        Ok(Self {
            backend,
            factory,
            canonicalizer: Canonicalizer::default(),
            families,
            instances,
        })
    }

    /// Use `symbols` to canonicalize metric and label names.
    pub fn with_symbols(mut self, symbols: Arc<dyn SymbolTable>) -> Self {
        self.canonicalizer = Canonicalizer::new(symbols);
        self
    }

    /// Get or create the instance for `name` and `labels`.
    ///
    /// `args` is forwarded to the family only when the instance is created;
    /// on a cache hit it is dropped.
    pub fn get<L, K, V>(
        &self,
        name: &str,
        labels: L,
        args: ArgsOf<F, B>,
    ) -> Result<Arc<MetricOf<F, B>>>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let key = self.canonicalizer.instance_key(name, labels)?;

        let hit = self.instances.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(metric) = hit {
            return Ok(metric);
        }

        let family = self.family_for(name, &key)?;

        match self.instances.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let metric = match family.add(entry.key().labels(), args) {
                    Ok(metric) => Arc::new(metric),
                    Err(err) => {
                        warn!(
                            metric = name,
                            key = %entry.key(),
                            error = %err,
                            "failed to create metric instance"
                        );
                        return Err(err);
                    }
                };
                debug!(metric = name, key = %entry.key(), "created metric instance");
                entry.insert(Arc::clone(&metric));
                Ok(metric)
            }
        }
    }

    fn family_for(&self, raw_name: &str, key: &InstanceKey) -> Result<Arc<FamilyOf<F, B>>> {
        let hit = self
            .families
            .get(key.name())
            .map(|entry| Arc::clone(entry.value()));
        if let Some(family) = hit {
            return Ok(family);
        }

        match self.families.entry(key.name().to_owned()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let descriptor = FamilyDescriptor {
                    name: key.name().to_owned(),
                    raw_name: raw_name.to_owned(),
                    label_names: key.labels().names().map(str::to_owned).collect(),
                };

                let family = match self.factory.register(self.backend.as_ref(), &descriptor) {
                    Ok(family) => Arc::new(family),
                    Err(err) => {
                        warn!(
                            metric = raw_name,
                            canonical = %descriptor.name,
                            error = %err,
                            "failed to register metric family"
                        );
                        return Err(err);
                    }
                };
                debug!(
                    metric = raw_name,
                    canonical = %descriptor.name,
                    labels = ?descriptor.label_names,
                    "registered metric family"
                );
                entry.insert(Arc::clone(&family));
                Ok(family)
            }
        }
    }

    /// Look up the family for `name` without creating it.
    pub fn family(&self, name: &str) -> Option<Arc<FamilyOf<F, B>>> {
        let canonical = self.canonicalizer.metric_name(name);
        self.families
            .get(canonical.as_ref())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Canonical names of all cached families, sorted.
    pub fn family_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of distinct families.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Number of distinct instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The backend registry families are registered with.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The family factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The symbol table used for canonicalization.
    pub fn symbols(&self) -> &Arc<dyn SymbolTable> {
        self.canonicalizer.symbols()
    }

    /// The canonicalizer in use.
    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }
}

impl<F, B> fmt::Debug for MetricsRegistry<F, B>
where
    F: FamilyFactory<B>,
    B: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("families", &self.families.len())
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::key::LabelSet;
    use crate::symbols::SymbolMap;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        names: Mutex<HashSet<String>>,
    }

    struct FakeFactory;

    impl FamilyFactory<FakeBackend> for FakeFactory {
        type Family = FakeFamily;

        fn register(
            &self,
            backend: &FakeBackend,
            descriptor: &FamilyDescriptor,
        ) -> Result<FakeFamily> {
            if !backend.names.lock().insert(descriptor.name.clone()) {
                return Err(Error::AlreadyRegistered {
                    name: descriptor.name.clone(),
                });
            }
            Ok(FakeFamily {
                descriptor: descriptor.clone(),
                adds: AtomicUsize::new(0),
            })
        }
    }

    struct FakeFamily {
        descriptor: FamilyDescriptor,
        adds: AtomicUsize,
    }

    #[derive(Debug)]
    struct FakeMetric {
        labels: LabelSet,
        bucket_count: u32,
    }

    impl MetricFamily for FakeFamily {
        type Metric = FakeMetric;
        type Args = u32;

        fn add(&self, labels: &LabelSet, bucket_count: u32) -> Result<FakeMetric> {
            let found: Vec<String> = labels.names().map(str::to_owned).collect();
            if found != self.descriptor.label_names {
                return Err(Error::LabelMismatch {
                    name: self.descriptor.name.clone(),
                    expected: self.descriptor.label_names.clone(),
                    found,
                });
            }
            self.adds.fetch_add(1, Ordering::SeqCst);
            Ok(FakeMetric {
                labels: labels.clone(),
                bucket_count,
            })
        }
    }

    fn registry() -> MetricsRegistry<FakeFactory, FakeBackend> {
        MetricsRegistry::new(Arc::new(FakeBackend::default()), FakeFactory)
    }

    #[test]
    fn test_same_request_returns_same_instance() {
        let registry = registry();

        let first = registry.get("requests_total", [("method", "GET")], 0).unwrap();
        let second = registry.get("requests_total", [("method", "GET")], 0).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.family_count(), 1);
        assert_eq!(registry.instance_count(), 1);

        let post = registry.get("requests_total", [("method", "POST")], 0).unwrap();
        assert!(!Arc::ptr_eq(&first, &post));
        assert_eq!(registry.family_count(), 1);
        assert_eq!(registry.instance_count(), 2);

        let family = registry.family("requests_total").unwrap();
        assert_eq!(family.adds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_family_is_shared_across_label_sets() {
        let registry = registry();
        registry.get("latency", [("op", "read")], 0).unwrap();
        let before = registry.family("latency").unwrap();
        registry.get("latency", [("op", "write")], 0).unwrap();
        let after = registry.family("latency").unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(registry.backend().names.lock().len(), 1);
    }

    #[test]
    fn test_label_order_is_irrelevant() {
        let registry = registry();

        let mut forward = BTreeMap::new();
        forward.insert("code", "200");
        forward.insert("method", "GET");
        let a = registry.get("requests_total", &forward, 0).unwrap();
        let b = registry
            .get("requests_total", [("method", "GET"), ("code", "200")], 0)
            .unwrap();
        let mut hashed = HashMap::new();
        hashed.insert("method".to_string(), "GET".to_string());
        hashed.insert("code".to_string(), "200".to_string());
        let c = registry.get("requests_total", &hashed, 0).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn test_distinct_keys_yield_distinct_instances() {
        let registry = registry();

        let a = registry.get("a", [("x", "1")], 0).unwrap();
        let b = registry.get("b", [("x", "1")], 0).unwrap();
        let c = registry.get("a", [("x", "2")], 0).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(!Arc::ptr_eq(&b, &c));
        assert_eq!(registry.family_count(), 2);
        assert_eq!(registry.instance_count(), 3);
        assert_eq!(registry.family_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_symbolic_and_numeric_spellings_share_instance() {
        let symbols = SymbolMap::new()
            .with_metric_name("requests_total", 7)
            .with_label_name("method", 2);
        let registry = registry().with_symbols(Arc::new(symbols));

        let by_symbol = registry.get("requests_total", [("method", "GET")], 0).unwrap();
        let by_number = registry.get("7", [("2", "GET")], 0).unwrap();
        let mixed = registry.get("requests_total", [("2", "GET")], 0).unwrap();

        assert!(Arc::ptr_eq(&by_symbol, &by_number));
        assert!(Arc::ptr_eq(&by_symbol, &mixed));
        assert_eq!(registry.family_count(), 1);
        assert_eq!(registry.instance_count(), 1);
        assert_eq!(registry.family_names(), vec!["7".to_string()]);
        assert_eq!(by_symbol.labels.get("2"), Some("GET"));

        let family = registry.family("7").unwrap();
        assert_eq!(family.descriptor.name, "7");
        assert_eq!(family.descriptor.raw_name, "requests_total");
        assert_eq!(family.descriptor.label_names, vec!["2".to_string()]);
    }

    #[test]
    fn test_args_only_used_on_creation() {
        let registry = registry();

        let first = registry.get("latency", [("op", "read")], 12).unwrap();
        let second = registry.get("latency", [("op", "read")], 99).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.bucket_count, 12);
    }

    #[test]
    fn test_label_shape_mismatch_surfaces() {
        let registry = registry();
        registry.get("requests_total", [("method", "GET")], 0).unwrap();

        let err = registry
            .get("requests_total", [("method", "GET"), ("code", "200")], 0)
            .unwrap_err();
        match err {
            Error::LabelMismatch {
                name,
                expected,
                found,
            } => {
                assert_eq!(name, "requests_total");
                assert_eq!(expected, vec!["method".to_string()]);
                assert_eq!(found, vec!["code".to_string(), "method".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(registry.family_count(), 1);
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn test_registration_conflict_surfaces_and_is_not_cached() {
        let backend = Arc::new(FakeBackend::default());
        backend.names.lock().insert("requests_total".to_string());
        let registry = MetricsRegistry::new(Arc::clone(&backend), FakeFactory);

        for _ in 0..2 {
            let err = registry.get("requests_total", [("method", "GET")], 0).unwrap_err();
            assert!(matches!(
                err,
                Error::AlreadyRegistered { ref name } if name == "requests_total"
            ));
        }
        assert_eq!(registry.family_count(), 0);
        assert_eq!(registry.instance_count(), 0);

        // Unrelated names are unaffected.
        registry.get("errors_total", [("method", "GET")], 0).unwrap();
        assert_eq!(registry.family_count(), 1);
    }

    #[test]
    fn test_duplicate_canonical_label_rejected() {
        let registry =
            registry().with_symbols(Arc::new(SymbolMap::new().with_label_name("method", 2)));

        let err = registry
            .get("requests_total", [("method", "GET"), ("2", "POST")], 0)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { .. }));
        assert_eq!(registry.family_count(), 0);
    }

    #[test]
    fn test_unlabeled_metric() {
        let registry = registry();
        let empty: [(&str, &str); 0] = [];

        let a = registry.get("uptime_seconds", empty, 0).unwrap();
        let b = registry.get("uptime_seconds", Vec::<(String, String)>::new(), 0).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.labels.is_empty());
    }

    #[test]
    fn test_with_config() {
        let config = RegistryConfig::new()
            .with_shard_amount(4)
            .with_family_capacity(8)
            .with_instance_capacity(64);
        let registry =
            MetricsRegistry::with_config(Arc::new(FakeBackend::default()), FakeFactory, config)
                .unwrap();
        registry.get("requests_total", [("method", "GET")], 0).unwrap();
        assert_eq!(registry.instance_count(), 1);

        let err = MetricsRegistry::with_config(
            Arc::new(FakeBackend::default()),
            FakeFactory,
            RegistryConfig::new().with_shard_amount(3),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_symbols_accessor() {
        let registry = registry();
        assert_eq!(registry.symbols().parse_metric_name("requests_total"), None);

        let registry = registry.with_symbols(Arc::new(
            SymbolMap::new().with_metric_name("requests_total", 7),
        ));
        assert_eq!(registry.symbols().parse_metric_name("requests_total"), Some(7));
    }

    #[test]
    fn test_family_lookup_does_not_create() {
        let registry = registry();
        assert!(registry.family("requests_total").is_none());
        assert_eq!(registry.family_count(), 0);
    }
}
