//! Text format for ratings and predictions.
//!
//! Input is one line per user holding whitespace-separated `item:rating`
//! tokens, where `item` is an external numeric id. External ids are mapped to
//! dense indices in first-seen order. Output mirrors that layout with
//! predicted scores for every known item.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::debug;

use crate::algorithms::predict;
use crate::error::ParseError;
use crate::models::{RatingEntry, RatingMatrix, TrainedModel};

/// Bidirectional mapping between external item ids and dense indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemIdTable {
    ids: Vec<u64>,
    indices: HashMap<u64, usize>,
}

impl ItemIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dense index for `id`, assigning the next free one if the id
    /// has not been seen yet.
    pub fn intern(&mut self, id: u64) -> usize {
        if let Some(&index) = self.indices.get(&id) {
            return index;
        }

        let index = self.ids.len();
        self.ids.push(id);
        self.indices.insert(id, index);
        index
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    pub fn external_id(&self, index: usize) -> Option<u64> {
        self.ids.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

/// Reads every line of `input` as one user.
pub fn read_ratings<R: BufRead>(input: R) -> Result<(RatingMatrix, ItemIdTable), ParseError> {
    let mut ratings = RatingMatrix::new();
    let mut items = ItemIdTable::new();

    for (line_number, line) in input.lines().enumerate() {
        let line = line?;
        let mut entries = Vec::new();

        for token in line.split_whitespace() {
            let (id, rating) = parse_token(token).ok_or_else(|| ParseError::MalformedToken {
                line: line_number + 1,
                token: token.to_string(),
            })?;
            entries.push(RatingEntry::new(items.intern(id), rating));
        }

        ratings.push_user(entries);
    }

    debug!(
        users = ratings.num_users(),
        items = items.len(),
        ratings = ratings.num_ratings(),
        "Read rating matrix"
    );

    Ok((ratings, items))
}

fn parse_token(token: &str) -> Option<(u64, f64)> {
    let (id, rating) = token.split_once(':')?;
    let id = id.parse::<u64>().ok()?;
    let rating = rating.parse::<f64>().ok()?;
    Some((id, rating))
}

/// Writes one line per user with `external_id:score` for every item, in
/// dense index order.
pub fn write_predictions<W: Write>(
    mut output: W,
    model: &TrainedModel,
    items: &ItemIdTable,
) -> std::io::Result<()> {
    for user in model.users.iter() {
        let mut first = true;

        for (index, item) in model.items.iter().enumerate() {
            let id = items.external_id(index).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no external id for item index {}", index),
                )
            })?;

            if !first {
                output.write_all(b" ")?;
            }
            first = false;

            write!(output, "{}:{}", id, predict(user.as_slice(), item.as_slice()))?;
        }

        output.write_all(b"\n")?;
    }

    output.flush()
}
