use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Hyperparameters of a ListRank-MF run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of latent features per user and item vector.
    pub latent_dim: usize,
    pub learning_rate: f64,
    /// L2 regularization strength.
    pub lambda: f64,
    /// Minimum loss improvement required to keep iterating.
    pub eps: f64,
    /// Upper bound on loss evaluations; 0 means run until convergence.
    pub max_iterations: usize,
    /// Draw starting features from uniform [0, 1) instead of keeping them.
    pub initialize: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            latent_dim: 10,
            learning_rate: 0.1,
            lambda: 0.01,
            eps: 1e-4,
            max_iterations: 1000,
            initialize: true,
            seed: 42,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TrainingConfig {
    pub fn with_latent_dim(mut self, latent_dim: usize) -> Self {
        self.latent_dim = latent_dim;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_initialize(mut self, initialize: bool) -> Self {
        self.initialize = initialize;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Config {
    /// Loads a config file and overlays `LISTRANK_*` environment variables,
    /// e.g. `LISTRANK_TRAINING__LEARNING_RATE=0.05`.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("LISTRANK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
