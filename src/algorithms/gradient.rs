//! Per-user and per-item gradients of the ListRank-MF objective.
//!
//! Both sides measure the predicted distribution through `exp(sigmoid(score))`
//! rather than the `exp(score)` used by [`compute_loss`](super::compute_loss).

use nalgebra::DVector;

use crate::error::TrainError;
use crate::models::{FeatureMatrix, RatingEntry, RatingMatrix, RatingMatrixTranspose};
use crate::utils::{sigmoid, sigmoid_prime};

use super::predict;

/// Softmax normalisers of one user's rated items.
#[derive(Debug, Clone, Copy)]
struct Denominators {
    predicted: f64,
    rating: f64,
}

impl Denominators {
    fn compute(
        user_features: &[f64],
        items: &FeatureMatrix,
        entries: &[RatingEntry],
    ) -> Result<Self, TrainError> {
        let mut predicted = 0.0;
        let mut rating = 0.0;

        for entry in entries {
            let score = predict(user_features, item_row(items, entry.item)?);
            predicted += sigmoid(score).exp();
            rating += entry.rating.exp();
        }

        Ok(Self { predicted, rating })
    }

    /// Scale applied to the partner vector for one (user, item) rating.
    fn multiplier(&self, score: f64, rating: f64) -> f64 {
        sigmoid_prime(score)
            * (sigmoid(score).exp() / self.predicted - rating.exp() / self.rating)
    }
}

/// Writes the gradient of the objective with respect to `users[user]` into
/// `gradient`, overwriting its previous contents.
pub fn compute_gradient_ui(
    users: &FeatureMatrix,
    items: &FeatureMatrix,
    gradient: &mut DVector<f64>,
    user: usize,
    ratings: &RatingMatrix,
    lambda: f64,
) -> Result<(), TrainError> {
    let entries = ratings
        .user(user)
        .ok_or_else(|| TrainError::user_out_of_range(user, ratings.num_users()))?;
    if entries.is_empty() {
        return Err(TrainError::EmptyRatingSet { user });
    }

    let user_features = user_row(users, user)?;
    let denominators = Denominators::compute(user_features.as_slice(), items, entries)?;

    gradient.fill(0.0);

    for entry in entries {
        let item_features = items
            .row(entry.item)
            .ok_or_else(|| TrainError::item_out_of_range(entry.item, items.len()))?;
        let score = predict(user_features.as_slice(), item_features.as_slice());
        let multiplier = denominators.multiplier(score, entry.rating);

        gradient.axpy(multiplier, item_features, 1.0);
    }

    gradient.axpy(lambda, user_features, 1.0);

    Ok(())
}

/// Writes the gradient of the objective with respect to `items[item]` into
/// `gradient`, overwriting its previous contents.
///
/// Each rater's denominators span all of that rater's items and are
/// recomputed here, using the current (already swept) user vectors.
pub fn compute_gradient_vj(
    users: &FeatureMatrix,
    items: &FeatureMatrix,
    gradient: &mut DVector<f64>,
    item: usize,
    ratings: &RatingMatrix,
    transpose: &RatingMatrixTranspose,
    lambda: f64,
) -> Result<(), TrainError> {
    let raters = transpose
        .item(item)
        .ok_or_else(|| TrainError::item_out_of_range(item, transpose.num_items()))?;
    let item_features = items
        .row(item)
        .ok_or_else(|| TrainError::item_out_of_range(item, items.len()))?;

    gradient.fill(0.0);

    for rater in raters {
        let entries = ratings
            .user(rater.user)
            .ok_or_else(|| TrainError::user_out_of_range(rater.user, ratings.num_users()))?;
        let user_features = user_row(users, rater.user)?;

        let denominators = Denominators::compute(user_features.as_slice(), items, entries)?;
        let score = predict(user_features.as_slice(), item_features.as_slice());
        let multiplier = denominators.multiplier(score, rater.rating);

        gradient.axpy(multiplier, user_features, 1.0);
    }

    gradient.axpy(lambda, item_features, 1.0);

    Ok(())
}

fn user_row(users: &FeatureMatrix, user: usize) -> Result<&DVector<f64>, TrainError> {
    users
        .row(user)
        .ok_or_else(|| TrainError::user_out_of_range(user, users.len()))
}

fn item_row(items: &FeatureMatrix, item: usize) -> Result<&[f64], TrainError> {
    items
        .row(item)
        .map(|row| row.as_slice())
        .ok_or_else(|| TrainError::item_out_of_range(item, items.len()))
}
