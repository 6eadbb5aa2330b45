use kestrel_core::DType;

// RuntimeConfig — Knobs for a Session
//
// Built with consuming `with_*` setters:
//
//   let config = RuntimeConfig::default()
//       .with_dtype(DType::F64)
//       .with_verbose(true);

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Dtype for placeholders declared through the session (default: F32).
    pub default_dtype: DType,
    /// Log every executed operator at `info` level.
    pub verbose: bool,
    /// Check every floating-point output for NaN/Inf and fail on the first one.
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_dtype: DType::F32,
            verbose: false,
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Set default dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.default_dtype = dtype;
        self
    }

    /// Enable or disable per-op logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable NaN/Inf output checks.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
