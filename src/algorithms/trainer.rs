//! Convergence-gated gradient descent for ListRank-MF.
//!
//! Every iteration first evaluates the loss on the current features and only
//! then decides whether to apply a sweep. A sweep updates every user vector in
//! index order and afterwards every item vector in index order, so item
//! gradients already see the user vectors of the same sweep.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TrainingConfig;
use crate::error::TrainError;
use crate::models::{FeatureMatrix, RatingMatrix, RatingMatrixTranspose, TrainedModel};
use crate::utils::validation::{validate_ratings, validate_training_config};

use super::gradient::{compute_gradient_ui, compute_gradient_vj};
use super::initializer::randomly_initialize;
use super::loss::compute_loss;
use super::optimizer::{Optimizer, SGD};

/// Why a training run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// The loss failed to improve by at least `eps`.
    Converged,
    /// `max_iterations` loss evaluations were spent.
    MaxIterations,
    /// The rating matrix had no users, so nothing was trained.
    NoRatings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Sweeps actually applied to the features.
    pub iterations: usize,
    pub loss_evaluations: usize,
    /// Loss of the last evaluation that passed the gate.
    pub accepted_loss: f64,
    /// Loss of the last evaluation, whether it passed or not.
    pub final_loss: f64,
    pub termination: TerminationReason,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ListRankMf {
    config: TrainingConfig,
    optimizer: SGD,
}

impl ListRankMf {
    pub fn new(config: TrainingConfig) -> Result<Self, TrainError> {
        validate_training_config(&config)?;

        Ok(Self {
            optimizer: SGD::new(config.learning_rate),
            config,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains from freshly allocated features, seeding the initializer with
    /// `config.seed`.
    pub fn fit(
        &mut self,
        ratings: &RatingMatrix,
    ) -> Result<(TrainedModel, TrainingReport), TrainError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.fit_with_rng(ratings, &mut rng)
    }

    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        ratings: &RatingMatrix,
        rng: &mut R,
    ) -> Result<(TrainedModel, TrainingReport), TrainError> {
        self.fit_from(ratings, FeatureMatrix::default(), FeatureMatrix::default(), rng)
    }

    /// Trains starting from caller-supplied features.
    ///
    /// The matrices are reshaped to `num_users x latent_dim` and
    /// `num_items x latent_dim`, keeping whatever values already fit. They are
    /// overwritten with random values only when `config.initialize` is set.
    pub fn fit_from<R: Rng + ?Sized>(
        &mut self,
        ratings: &RatingMatrix,
        mut users: FeatureMatrix,
        mut items: FeatureMatrix,
        rng: &mut R,
    ) -> Result<(TrainedModel, TrainingReport), TrainError> {
        let started = Instant::now();
        let d = self.config.latent_dim;

        validate_ratings(ratings)?;
        self.optimizer.reset();

        let transpose = ratings.transpose();
        let number_of_users = ratings.num_users();
        let number_of_items = transpose.num_items();

        users.resize(number_of_users, d);
        items.resize(number_of_items, d);

        if self.config.initialize {
            randomly_initialize(&mut users, rng);
            randomly_initialize(&mut items, rng);
        }

        info!(
            users = number_of_users,
            items = number_of_items,
            ratings = ratings.num_ratings(),
            latent_dim = d,
            "Starting ListRank-MF training"
        );

        let mut report = TrainingReport {
            iterations: 0,
            loss_evaluations: 0,
            accepted_loss: f64::INFINITY,
            final_loss: f64::INFINITY,
            termination: TerminationReason::NoRatings,
            elapsed: Duration::ZERO,
        };

        if number_of_users == 0 {
            report.elapsed = started.elapsed();
            info!("No ratings to train on");
            return Ok((TrainedModel { users, items }, report));
        }

        let mut user_gradients = FeatureMatrix::zeros(number_of_users, d);
        let mut item_gradients = FeatureMatrix::zeros(number_of_items, d);

        report.termination = loop {
            let iteration = report.loss_evaluations;
            if self.config.max_iterations != 0 && iteration >= self.config.max_iterations {
                break TerminationReason::MaxIterations;
            }

            let loss = compute_loss(&users, &items, ratings, self.config.lambda)?;
            report.loss_evaluations += 1;
            report.final_loss = loss;

            if !loss.is_finite() {
                warn!(iteration, loss, "Loss is not finite");
                return Err(TrainError::NumericDivergence { iteration, loss });
            }

            if loss > report.accepted_loss - self.config.eps {
                break TerminationReason::Converged;
            }
            report.accepted_loss = loss;

            self.sweep_users(&mut users, &items, &mut user_gradients, ratings)?;
            self.sweep_items(&users, &mut items, &mut item_gradients, ratings, &transpose)?;
            report.iterations += 1;

            if !users.is_finite() || !items.is_finite() {
                warn!(iteration, loss, "Features are not finite after sweep");
                return Err(TrainError::NumericDivergence { iteration, loss });
            }

            debug!(iteration, loss, "Applied gradient sweep");
        };

        report.elapsed = started.elapsed();
        info!(
            iterations = report.iterations,
            loss = report.accepted_loss,
            termination = ?report.termination,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Finished ListRank-MF training"
        );

        Ok((TrainedModel { users, items }, report))
    }

    fn sweep_users(
        &mut self,
        users: &mut FeatureMatrix,
        items: &FeatureMatrix,
        gradients: &mut FeatureMatrix,
        ratings: &RatingMatrix,
    ) -> Result<(), TrainError> {
        let len = users.len();
        for user in 0..len {
            let gradient = gradients
                .row_mut(user)
                .ok_or_else(|| TrainError::user_out_of_range(user, len))?;
            compute_gradient_ui(users, items, gradient, user, ratings, self.config.lambda)?;

            let params = users
                .row_mut(user)
                .ok_or_else(|| TrainError::user_out_of_range(user, len))?;
            self.optimizer.update(params, gradient);
        }

        Ok(())
    }

    fn sweep_items(
        &mut self,
        users: &FeatureMatrix,
        items: &mut FeatureMatrix,
        gradients: &mut FeatureMatrix,
        ratings: &RatingMatrix,
        transpose: &RatingMatrixTranspose,
    ) -> Result<(), TrainError> {
        let len = items.len();
        for item in 0..len {
            let gradient = gradients
                .row_mut(item)
                .ok_or_else(|| TrainError::item_out_of_range(item, len))?;
            compute_gradient_vj(
                users,
                items,
                gradient,
                item,
                ratings,
                transpose,
                self.config.lambda,
            )?;

            let params = items
                .row_mut(item)
                .ok_or_else(|| TrainError::item_out_of_range(item, len))?;
            self.optimizer.update(params, gradient);
        }

        Ok(())
    }
}

/// One-call training entry point mirroring the classic ListRank-MF signature.
///
/// Returns the user and item feature matrices.
#[allow(clippy::too_many_arguments)]
pub fn train<R: Rng + ?Sized>(
    ratings: &RatingMatrix,
    d: usize,
    learning_rate: f64,
    lambda: f64,
    eps: f64,
    max_iterations: usize,
    initialize: bool,
    rng: &mut R,
) -> Result<(FeatureMatrix, FeatureMatrix), TrainError> {
    let config = TrainingConfig {
        latent_dim: d,
        learning_rate,
        lambda,
        eps,
        max_iterations,
        initialize,
        ..TrainingConfig::default()
    };

    let (model, _) = ListRankMf::new(config)?.fit_with_rng(ratings, rng)?;
    Ok((model.users, model.items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::predict;

    fn config() -> TrainingConfig {
        TrainingConfig::default()
            .with_latent_dim(2)
            .with_learning_rate(0.5)
            .with_lambda(0.01)
            .with_eps(1e-6)
            .with_max_iterations(1000)
            .with_initialize(false)
    }

    fn opposite_tastes() -> RatingMatrix {
        RatingMatrix::from(vec![
            vec![(0, 5.0), (1, 1.0)],
            vec![(1, 5.0), (0, 1.0)],
        ])
    }

    fn starting_features() -> (FeatureMatrix, FeatureMatrix) {
        (
            FeatureMatrix::from_rows(vec![vec![0.3, 0.1], vec![0.2, 0.4]]),
            FeatureMatrix::from_rows(vec![vec![0.1, 0.3], vec![0.4, 0.2]]),
        )
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn test_recovers_preference_order() {
        let (users, items) = starting_features();
        let mut trainer = ListRankMf::new(config()).unwrap();
        let (model, report) = trainer
            .fit_from(&opposite_tastes(), users, items, &mut rng())
            .unwrap();

        assert_eq!(report.termination, TerminationReason::Converged);
        assert!(model.score(0, 0).unwrap() > model.score(0, 1).unwrap());
        assert!(model.score(1, 1).unwrap() > model.score(1, 0).unwrap());
    }

    #[test]
    fn test_first_iteration_always_updates() {
        let (users, items) = starting_features();
        let mut trainer = ListRankMf::new(config().with_max_iterations(1)).unwrap();
        let (model, report) = trainer
            .fit_from(&opposite_tastes(), users.clone(), items.clone(), &mut rng())
            .unwrap();

        assert_eq!(report.iterations, 1);
        assert_eq!(report.loss_evaluations, 1);
        assert_eq!(report.termination, TerminationReason::MaxIterations);
        assert_ne!(model.users, users);
        assert_ne!(model.items, items);
    }

    #[test]
    fn test_one_iteration_matches_manual_sweep() {
        let ratings = opposite_tastes();
        let transpose = ratings.transpose();
        let (mut users, mut items) = starting_features();

        let mut trainer = ListRankMf::new(config().with_max_iterations(1)).unwrap();
        let (model, _) = trainer
            .fit_from(&ratings, users.clone(), items.clone(), &mut rng())
            .unwrap();

        let mut sgd = SGD::new(0.5);
        let mut gradient = nalgebra::DVector::zeros(2);
        for user in 0..2 {
            compute_gradient_ui(&users, &items, &mut gradient, user, &ratings, 0.01).unwrap();
            sgd.update(users.row_mut(user).unwrap(), &gradient);
        }
        for item in 0..2 {
            compute_gradient_vj(&users, &items, &mut gradient, item, &ratings, &transpose, 0.01)
                .unwrap();
            sgd.update(items.row_mut(item).unwrap(), &gradient);
        }

        assert_eq!(model.users, users);
        assert_eq!(model.items, items);
    }

    #[test]
    fn test_no_update_after_stop() {
        let (users, items) = starting_features();
        let ratings = opposite_tastes();

        let (converged, report) = ListRankMf::new(config().with_max_iterations(0))
            .unwrap()
            .fit_from(&ratings, users.clone(), items.clone(), &mut rng())
            .unwrap();
        assert_eq!(report.termination, TerminationReason::Converged);
        assert_eq!(report.loss_evaluations, report.iterations + 1);
        assert!(report.final_loss > report.accepted_loss - 1e-6);

        let capped_config = config().with_max_iterations(report.iterations);
        let (capped, capped_report) = ListRankMf::new(capped_config)
            .unwrap()
            .fit_from(&ratings, users, items, &mut rng())
            .unwrap();
        assert_eq!(capped_report.iterations, report.iterations);
        assert_eq!(capped, converged);
    }

    #[test]
    fn test_single_rating_stops_after_two_evaluations() {
        let ratings = RatingMatrix::from(vec![vec![(0, 4.0)]]);
        let users = FeatureMatrix::from_rows(vec![vec![0.2, 0.9]]);
        let items = FeatureMatrix::from_rows(vec![vec![0.7, 0.3]]);
        let config = config().with_lambda(0.0).with_max_iterations(0);

        let (model, report) = ListRankMf::new(config)
            .unwrap()
            .fit_from(&ratings, users.clone(), items.clone(), &mut rng())
            .unwrap();

        assert_eq!(report.loss_evaluations, 2);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.accepted_loss, 0.0);
        assert_eq!(report.final_loss, 0.0);
        assert_eq!(model.users, users);
        assert_eq!(model.items, items);
    }

    #[test]
    fn test_empty_input() {
        let (model, report) = ListRankMf::new(config())
            .unwrap()
            .fit(&RatingMatrix::new())
            .unwrap();

        assert!(model.users.is_empty());
        assert!(model.items.is_empty());
        assert_eq!(report.loss_evaluations, 0);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.termination, TerminationReason::NoRatings);
    }

    #[test]
    fn test_deterministic_without_initialization() {
        let ratings = RatingMatrix::from(vec![
            vec![(0, 3.0), (2, 1.0), (3, 4.0)],
            vec![(1, 2.0), (2, 5.0)],
            vec![(0, 1.0), (3, 2.0)],
        ]);
        let users = FeatureMatrix::from_rows(vec![
            vec![0.1, 0.5, 0.3],
            vec![0.7, 0.2, 0.9],
            vec![0.4, 0.4, 0.1],
        ]);
        let items = FeatureMatrix::from_rows(vec![
            vec![0.6, 0.1, 0.2],
            vec![0.3, 0.8, 0.5],
            vec![0.9, 0.2, 0.4],
            vec![0.5, 0.5, 0.5],
        ]);
        let config = config().with_latent_dim(3).with_max_iterations(25);

        let first = ListRankMf::new(config.clone())
            .unwrap()
            .fit_from(&ratings, users.clone(), items.clone(), &mut StdRng::seed_from_u64(1))
            .unwrap()
            .0;
        let second = ListRankMf::new(config)
            .unwrap()
            .fit_from(&ratings, users, items, &mut StdRng::seed_from_u64(2))
            .unwrap()
            .0;

        assert_eq!(first, second);
    }

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let ratings = opposite_tastes();
        let config = config().with_initialize(true).with_max_iterations(3).with_seed(9);

        let (a, _) = ListRankMf::new(config.clone()).unwrap().fit(&ratings).unwrap();
        let (b, _) = ListRankMf::new(config).unwrap().fit(&ratings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_allocates_rows_for_gaps_in_item_ids() {
        let ratings = RatingMatrix::from(vec![vec![(0, 2.0), (4, 1.0)]]);
        let (model, _) = ListRankMf::new(config().with_latent_dim(3).with_initialize(true))
            .unwrap()
            .fit(&ratings)
            .unwrap();

        assert_eq!(model.users.len(), 1);
        assert_eq!(model.items.len(), 5);
        assert!(model.items.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            ListRankMf::new(config().with_latent_dim(0)),
            Err(TrainError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            ListRankMf::new(config().with_learning_rate(0.0)),
            Err(TrainError::InvalidConfiguration { .. })
        ));

        let ratings = RatingMatrix::from(vec![vec![(0, 1.0)], vec![]]);
        assert_eq!(
            ListRankMf::new(config()).unwrap().fit(&ratings).unwrap_err(),
            TrainError::EmptyRatingSet { user: 1 }
        );
    }

    #[test]
    fn test_divergence_is_fatal() {
        let ratings = RatingMatrix::from(vec![vec![(0, 800.0), (1, 1.0)]]);
        let result = ListRankMf::new(config().with_initialize(true)).unwrap().fit(&ratings);
        assert!(matches!(result, Err(TrainError::NumericDivergence { .. })));
    }

    #[test]
    fn test_train_free_function() {
        let (users, items) = train(
            &opposite_tastes(),
            2,
            0.5,
            0.01,
            1e-6,
            1000,
            true,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

        let user0 = users.row(0).unwrap().as_slice();
        let user1 = users.row(1).unwrap().as_slice();
        let item0 = items.row(0).unwrap().as_slice();
        let item1 = items.row(1).unwrap().as_slice();
        assert!(predict(user0, item0) > predict(user0, item1));
        assert!(predict(user1, item1) > predict(user1, item0));
    }
}
