use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use listrank_mf::dataset::{read_ratings, write_predictions};
use listrank_mf::{init_tracing, Config, ListRankMf};
use tracing::info;

/// Trains ListRank-MF on `item:rating` lines from stdin and prints predicted
/// scores for every user and item to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long)]
    log_level: Option<String>,

    #[arg(short = 'd', long)]
    latent_dim: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    lambda: Option<f64>,

    #[arg(long)]
    eps: Option<f64>,

    /// 0 runs until the loss stops improving
    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Keep all-zero starting features instead of random ones
    #[arg(long)]
    no_init: bool,

    /// Print the training report as JSON on stderr
    #[arg(long)]
    report: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        let training = &mut config.training;

        if let Some(latent_dim) = self.latent_dim {
            training.latent_dim = latent_dim;
        }
        if let Some(learning_rate) = self.learning_rate {
            training.learning_rate = learning_rate;
        }
        if let Some(lambda) = self.lambda {
            training.lambda = lambda;
        }
        if let Some(eps) = self.eps {
            training.eps = eps;
        }
        if let Some(max_iterations) = self.max_iterations {
            training.max_iterations = max_iterations;
        }
        if let Some(seed) = self.seed {
            training.seed = seed;
        }
        if self.no_init {
            training.initialize = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_found = std::path::Path::new(&args.config).exists();
    let mut config = if config_found {
        Config::from_file(&args.config)
            .with_context(|| format!("failed to load config from {}", args.config))?
    } else {
        Config::default()
    };
    args.apply(&mut config);

    init_tracing(&config.logging.level);

    if !config_found {
        info!("Config file not found, using default configuration");
    }

    let stdin = io::stdin();
    let (ratings, items) = read_ratings(stdin.lock()).context("failed to read ratings")?;

    let mut trainer = ListRankMf::new(config.training)?;
    info!("Training configuration loaded: {:?}", trainer.config());

    let (model, report) = trainer.fit(&ratings)?;

    if args.report {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }

    let stdout = io::stdout();
    write_predictions(BufWriter::new(stdout.lock()), &model, &items)
        .context("failed to write predictions")?;

    Ok(())
}
