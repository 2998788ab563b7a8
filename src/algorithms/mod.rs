pub mod gradient;
pub mod initializer;
pub mod loss;
pub mod optimizer;
pub mod trainer;

pub use gradient::{compute_gradient_ui, compute_gradient_vj};
pub use loss::compute_loss;
pub use trainer::{train, ListRankMf, TerminationReason, TrainingReport};

/// Predicted preference of a user for an item: the dot product of their
/// latent vectors over the shorter of the two lengths.
pub fn predict(user_features: &[f64], item_features: &[f64]) -> f64 {
    user_features
        .iter()
        .zip(item_features.iter())
        .map(|(u, v)| u * v)
        .sum()
}
