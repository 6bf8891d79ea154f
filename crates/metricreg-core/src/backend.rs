//! Backend capability traits.
//!
//! The registry owns no metric storage. It asks a [`FamilyFactory`] to build
//! and register a family in the backend, then asks the [`MetricFamily`] to
//! materialize instances for concrete label sets.

use crate::error::Result;
use crate::key::LabelSet;

/// Everything a backend needs to build a family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyDescriptor {
    /// Canonical metric name.
    pub name: String,
    /// Metric name as the first caller spelled it.
    pub raw_name: String,
    /// Canonical label names, sorted.
    pub label_names: Vec<String>,
}

/// A registered family that hands out per-label-set instances.
pub trait MetricFamily: Send + Sync + 'static {
    /// Concrete metric instance type.
    type Metric: Send + Sync + 'static;

    /// Extra construction arguments forwarded from the caller.
    type Args;

    /// Build the instance bound to `labels`.
    fn add(&self, labels: &LabelSet, args: Self::Args) -> Result<Self::Metric>;
}

/// Builds families and registers them with a backend registry of type `B`.
pub trait FamilyFactory<B: ?Sized>: Send + Sync {
    /// Family type produced by this factory.
    type Family: MetricFamily;

    /// Build the family described by `descriptor` and register it with `backend`.
    ///
    /// Must fail with [`Error::AlreadyRegistered`](crate::Error::AlreadyRegistered)
    /// if the backend already holds a collector under the same name.
    fn register(&self, backend: &B, descriptor: &FamilyDescriptor) -> Result<Self::Family>;
}
