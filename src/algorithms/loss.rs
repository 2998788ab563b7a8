//! The ListRank-MF objective.
//!
//! For every user, the ratings and the predicted scores each induce a top-1
//! probability distribution over that user's rated items (a softmax). The loss
//! is the cross-entropy between the two, summed over users, plus an L2 penalty
//! on every feature component.

use crate::error::TrainError;
use crate::models::{FeatureMatrix, RatingMatrix};
use crate::utils::validation::validate_coverage;

use super::predict;

pub fn compute_loss(
    users: &FeatureMatrix,
    items: &FeatureMatrix,
    ratings: &RatingMatrix,
    lambda: f64,
) -> Result<f64, TrainError> {
    validate_coverage(ratings, users, items)?;

    let mut loss = 0.0;

    for (user, entries) in ratings.iter().enumerate() {
        if entries.is_empty() {
            return Err(TrainError::EmptyRatingSet { user });
        }

        let user_features = users
            .row(user)
            .ok_or_else(|| TrainError::user_out_of_range(user, users.len()))?
            .as_slice();

        let mut predicted_denominator = 0.0;
        let mut rating_denominator = 0.0;

        for entry in entries {
            let item_features = item_row(items, entry.item)?;
            predicted_denominator += predict(user_features, item_features).exp();
            rating_denominator += entry.rating.exp();
        }

        for entry in entries {
            let item_features = item_row(items, entry.item)?;
            let score = predict(user_features, item_features);
            loss -= entry.rating.exp() / rating_denominator
                * (score.exp() / predicted_denominator).ln();
        }
    }

    loss += regularization(users, items, lambda);

    Ok(loss)
}

/// `(lambda / 2) * ||U||² + (lambda / 2) * ||V||²`
pub fn regularization(users: &FeatureMatrix, items: &FeatureMatrix, lambda: f64) -> f64 {
    lambda / 2.0 * (users.squared_norm() + items.squared_norm())
}

fn item_row(items: &FeatureMatrix, item: usize) -> Result<&[f64], TrainError> {
    items
        .row(item)
        .map(|row| row.as_slice())
        .ok_or_else(|| TrainError::item_out_of_range(item, items.len()))
}
