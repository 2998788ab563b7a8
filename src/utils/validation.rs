use crate::config::TrainingConfig;
use crate::error::TrainError;
use crate::models::{FeatureMatrix, RatingMatrix};

pub fn validate_training_config(config: &TrainingConfig) -> Result<(), TrainError> {
    if config.latent_dim == 0 {
        return Err(TrainError::invalid_configuration(
            "latent_dim must be greater than 0",
        ));
    }

    if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
        return Err(TrainError::invalid_configuration(format!(
            "learning_rate must be a positive finite number, got {}",
            config.learning_rate
        )));
    }

    if !config.lambda.is_finite() || config.lambda < 0.0 {
        return Err(TrainError::invalid_configuration(format!(
            "lambda must be a non-negative finite number, got {}",
            config.lambda
        )));
    }

    if !config.eps.is_finite() {
        return Err(TrainError::invalid_configuration(format!(
            "eps must be finite, got {}",
            config.eps
        )));
    }

    // Without an iteration cap the loss gate is the only way out.
    if config.max_iterations == 0 && config.eps <= 0.0 {
        return Err(TrainError::invalid_configuration(
            "eps must be positive when max_iterations is 0",
        ));
    }

    Ok(())
}

/// Every user needs at least one rating and every rating must be finite.
pub fn validate_ratings(ratings: &RatingMatrix) -> Result<(), TrainError> {
    for (user, entries) in ratings.iter().enumerate() {
        if entries.is_empty() {
            return Err(TrainError::EmptyRatingSet { user });
        }

        if let Some(entry) = entries.iter().find(|entry| entry.item == usize::MAX) {
            return Err(TrainError::item_out_of_range(entry.item, usize::MAX));
        }

        if let Some(entry) = entries.iter().find(|entry| !entry.rating.is_finite()) {
            return Err(TrainError::NonFiniteRating {
                user,
                item: entry.item,
            });
        }
    }

    Ok(())
}

/// Checks that `users` and `items` cover every index referenced by `ratings`.
pub fn validate_coverage(
    ratings: &RatingMatrix,
    users: &FeatureMatrix,
    items: &FeatureMatrix,
) -> Result<(), TrainError> {
    if ratings.num_users() > users.len() {
        return Err(TrainError::user_out_of_range(
            ratings.num_users() - 1,
            users.len(),
        ));
    }

    let needed = ratings.num_items();
    if needed > items.len() {
        return Err(TrainError::item_out_of_range(needed - 1, items.len()));
    }

    Ok(())
}
