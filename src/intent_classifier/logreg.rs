use ndarray::prelude::*;

use crate::errors::*;

/// One-vs-rest logistic regression
///
/// Each class gets its own sigmoid score. A single weight column stands for a binary
/// classifier, whose score is the one of the second class.
pub struct MulticlassLogisticRegression {
    intercept: Array1<f32>,
    /// shape (nb_features, nb_columns)
    weights: Array2<f32>,
}

impl MulticlassLogisticRegression {
    pub fn new(intercept: Array1<f32>, weights: Array2<f32>) -> Result<Self> {
        let (_, nb_columns) = weights.dim();
        if intercept.len() != nb_columns {
            return Err(NluError::CorruptModel(format!(
                "logistic regression has {} intercepts but {} weight columns",
                intercept.len(),
                nb_columns
            ))
            .into());
        }
        Ok(Self { intercept, weights })
    }

    pub fn nb_features(&self) -> usize {
        self.weights.nrows()
    }

    pub fn nb_classes(&self) -> usize {
        match self.weights.ncols() {
            1 => 2,
            nb_columns => nb_columns,
        }
    }

    /// Computes one probability per class
    ///
    /// Classes listed in `filtered_out_indexes` get a null probability and the remaining ones
    /// are renormalized so that they sum to one.
    pub fn run(
        &self,
        features: &ArrayView1<f32>,
        filtered_out_indexes: Option<&[usize]>,
    ) -> Result<Array1<f32>> {
        if features.len() != self.nb_features() {
            return Err(NluError::InternalError(format!(
                "expected {} features but got {}",
                self.nb_features(),
                features.len()
            ))
            .into());
        }
        let scores = (features.dot(&self.weights) + &self.intercept).mapv(sigmoid);
        let mut probabilities = match scores.len() {
            1 => array![1.0 - scores[0], scores[0]],
            _ => scores,
        };
        let filtered_out = filtered_out_indexes.unwrap_or(&[]);
        if filtered_out.is_empty() {
            return Ok(probabilities);
        }
        for &index in filtered_out {
            probabilities[index] = 0.0;
        }
        let total = probabilities.sum();
        if total > 0.0 {
            probabilities /= total;
        }
        Ok(probabilities)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
