use rand::Rng;

use crate::models::FeatureMatrix;

/// Overwrites every component of every row with an independent draw from
/// uniform [0, 1).
pub fn randomly_initialize<R: Rng + ?Sized>(features: &mut FeatureMatrix, rng: &mut R) {
    uniform(features, 0.0, 1.0, rng);
}

pub fn uniform<R: Rng + ?Sized>(features: &mut FeatureMatrix, low: f64, high: f64, rng: &mut R) {
    for row in features.iter_mut() {
        for value in row.iter_mut() {
            *value = rng.gen_range(low..high);
        }
    }
}
