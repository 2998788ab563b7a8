use serde::{Deserialize, Serialize};

pub mod features;

pub use features::{FeatureMatrix, TrainedModel};

/// A single rating given by a user, keyed by the dense item index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub item: usize,
    pub rating: f64,
}

/// A single rating of an item, keyed by the dense user index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    pub user: usize,
    pub rating: f64,
}

/// Per-user lists of ratings. Row `u` holds every rating user `u` gave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingMatrix {
    rows: Vec<Vec<RatingEntry>>,
}

/// Per-item lists of ratings, the exact mirror of a [`RatingMatrix`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingMatrixTranspose {
    columns: Vec<Vec<UserRating>>,
}

impl RatingEntry {
    pub fn new(item: usize, rating: f64) -> Self {
        Self { item, rating }
    }
}

impl RatingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<RatingEntry>>) -> Self {
        Self { rows }
    }

    /// Appends a user and returns its dense index.
    pub fn push_user(&mut self, ratings: Vec<RatingEntry>) -> usize {
        self.rows.push(ratings);
        self.rows.len() - 1
    }

    pub fn num_users(&self) -> usize {
        self.rows.len()
    }

    /// `1 + max item index`, or 0 when there are no ratings at all.
    ///
    /// Saturates at `usize::MAX`; training rejects that index before
    /// allocating item rows.
    pub fn num_items(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .map(|entry| entry.item.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    pub fn num_ratings(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn user(&self, user: usize) -> Option<&[RatingEntry]> {
        self.rows.get(user).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[RatingEntry]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Builds the item-major mirror of this matrix.
    ///
    /// Users are visited in index order, so every item column lists its raters
    /// by ascending user index.
    pub fn transpose(&self) -> RatingMatrixTranspose {
        let mut columns: Vec<Vec<UserRating>> = vec![Vec::new(); self.num_items()];

        for (user, ratings) in self.rows.iter().enumerate() {
            for entry in ratings {
                columns[entry.item].push(UserRating {
                    user,
                    rating: entry.rating,
                });
            }
        }

        RatingMatrixTranspose { columns }
    }
}

impl From<Vec<Vec<(usize, f64)>>> for RatingMatrix {
    fn from(rows: Vec<Vec<(usize, f64)>>) -> Self {
        Self::from_rows(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(item, rating)| RatingEntry::new(item, rating))
                        .collect()
                })
                .collect(),
        )
    }
}

impl RatingMatrixTranspose {
    pub fn num_items(&self) -> usize {
        self.columns.len()
    }

    pub fn item(&self, item: usize) -> Option<&[UserRating]> {
        self.columns.get(item).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[UserRating]> {
        self.columns.iter().map(Vec::as_slice)
    }
}
