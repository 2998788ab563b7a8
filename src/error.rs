//! Error types for training and for the ratings text format.

use thiserror::Error;

/// Errors that abort a training run.
///
/// All of these are reported straight to the caller of
/// [`ListRankMf::fit`](crate::algorithms::trainer::ListRankMf::fit); nothing is
/// retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    /// A user has no rated items, which leaves both softmax denominators at zero.
    #[error("user {user} has no rated items")]
    EmptyRatingSet {
        /// Dense index of the offending user
        user: usize,
    },

    /// A rating or feature lookup points past the allocated feature rows.
    #[error("{kind} index {index} is out of range for {len} feature rows")]
    IndexOutOfRange {
        /// Either `"user"` or `"item"`
        kind: &'static str,
        /// The requested index
        index: usize,
        /// Number of rows actually allocated
        len: usize,
    },

    /// Hyperparameters that cannot produce a meaningful run.
    #[error("invalid training configuration: {reason}")]
    InvalidConfiguration {
        /// Which parameter was rejected and why
        reason: String,
    },

    /// A rating value is NaN or infinite.
    #[error("rating of item {item} by user {user} is not finite")]
    NonFiniteRating {
        /// Dense user index
        user: usize,
        /// Dense item index
        item: usize,
    },

    /// The loss or the features stopped being finite during training.
    #[error("training diverged at iteration {iteration} (loss = {loss})")]
    NumericDivergence {
        /// Zero-based iteration in which the non-finite value showed up
        iteration: usize,
        /// Loss observed in that iteration
        loss: f64,
    },
}

impl TrainError {
    pub fn invalid_configuration<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn user_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            kind: "user",
            index,
            len,
        }
    }

    pub fn item_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            kind: "item",
            index,
            len,
        }
    }
}

/// Errors produced while reading `item:rating` lines.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: malformed rating token `{token}`")]
    MalformedToken { line: usize, token: String },

    #[error("failed to read ratings: {0}")]
    Io(#[from] std::io::Error),
}
