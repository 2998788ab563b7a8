use nalgebra::DVector;

pub trait Optimizer: Send + Sync {
    fn update(&mut self, params: &mut DVector<f64>, gradients: &DVector<f64>);
    fn reset(&mut self);
}

/// Plain gradient descent: `params -= learning_rate * gradients`.
#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f64,
}

impl SGD {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, params: &mut DVector<f64>, gradients: &DVector<f64>) {
        params.axpy(-self.learning_rate, gradients, 1.0);
    }

    fn reset(&mut self) {
        // SGD doesn't maintain state
    }
}
