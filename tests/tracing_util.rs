use tracing_subscriber::EnvFilter;

/// Per-test tracing guard. Installs a fmt subscriber scoped to the current
/// thread so `RUST_LOG=dais=debug cargo test` shows engine internals
/// without cross-test interleaving.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        Self { _guard: guard }
    }
}
