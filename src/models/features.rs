use nalgebra::DVector;

/// Dense table of latent vectors, one row per user or per item.
///
/// Every row has exactly `dim` components. Rows are addressed by dense index
/// and are never reallocated during training; the trainer mutates them in
/// place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<DVector<f64>>,
    dim: usize,
}

/// Output of a training run: the learned user and item tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub users: FeatureMatrix,
    pub items: FeatureMatrix,
}

impl FeatureMatrix {
    /// All-zero matrix of `rows` vectors with `dim` components each.
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            rows: vec![DVector::zeros(dim); rows],
            dim,
        }
    }

    /// Builds a matrix from explicit rows. Shorter rows are zero-padded to the
    /// length of the longest one.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let dim = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut matrix = Self {
            rows: rows.into_iter().map(DVector::from_vec).collect(),
            dim: 0,
        };
        let len = matrix.len();
        matrix.resize(len, dim);
        matrix
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, index: usize) -> Option<&DVector<f64>> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut DVector<f64>> {
        self.rows.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DVector<f64>> {
        self.rows.iter_mut()
    }

    /// Reshapes to `rows x dim`, keeping existing values and zero-filling the
    /// rest. Extra rows and trailing components are dropped.
    pub fn resize(&mut self, rows: usize, dim: usize) {
        self.rows.resize(rows, DVector::zeros(dim));

        if dim != self.dim {
            for row in self.rows.iter_mut() {
                if row.len() != dim {
                    let padded = DVector::from_iterator(
                        dim,
                        row.iter().copied().chain(std::iter::repeat(0.0)).take(dim),
                    );
                    *row = padded;
                }
            }
        }

        self.dim = dim;
    }

    /// Sum of squares of every component in every row.
    pub fn squared_norm(&self) -> f64 {
        self.rows.iter().map(|row| row.norm_squared()).sum()
    }

    pub fn is_finite(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|x| x.is_finite()))
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| row.as_slice().to_vec()).collect()
    }
}

impl TrainedModel {
    /// Score of `item` for `user`, or `None` if either index is unknown.
    pub fn score(&self, user: usize, item: usize) -> Option<f64> {
        let user = self.users.row(user)?;
        let item = self.items.row(item)?;
        Some(crate::algorithms::predict(user.as_slice(), item.as_slice()))
    }
}
