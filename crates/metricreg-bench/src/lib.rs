//! Benchmark harness for metricreg.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a tracing subscriber controlled by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metricreg_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// A pre-generated request: metric name plus label pairs.
#[derive(Debug, Clone)]
pub struct Request {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

/// Generate `count` requests spread over `names` metrics and `values`
/// distinct values per label.
pub fn requests(count: usize, names: usize, values: usize, seed: u64) -> Vec<Request> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Request {
            name: format!("metric_{}", rng.gen_range(0..names)),
            labels: vec![
                ("method".to_string(), format!("m{}", rng.gen_range(0..values))),
                ("code".to_string(), format!("{}", 200 + rng.gen_range(0..values))),
            ],
        })
        .collect()
}
