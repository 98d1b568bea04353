use pecluster::{param_guard::TransformGuard, Float, ParamGuard};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::UmapError;

/// A verified hyper-parameter set ready for projection
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct UmapValidParams<F, R> {
    pub(crate) n_components: usize,
    pub(crate) n_neighbors: usize,
    pub(crate) min_dist: F,
    pub(crate) spread: F,
    pub(crate) n_epochs: Option<usize>,
    pub(crate) learning_rate: F,
    pub(crate) negative_sample_rate: usize,
    pub(crate) rng: R,
}

impl<F: Float, R> UmapValidParams<F, R> {
    /// Dimensionality of the embedding
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Size of the local neighborhood, the observation itself included
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Minimum distance between embedded points
    pub fn min_dist(&self) -> F {
        self.min_dist
    }

    /// Scale of the embedded points
    pub fn spread(&self) -> F {
        self.spread
    }

    /// Number of optimization epochs, `None` picks 500 for small and 200 for large datasets
    pub fn n_epochs(&self) -> Option<usize> {
        self.n_epochs
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    /// Number of negative samples per positive sample
    pub fn negative_sample_rate(&self) -> usize {
        self.negative_sample_rate
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

/// Helper struct for building a set of [UMAP hyperparameters](UmapValidParams)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct UmapParams<F, R>(UmapValidParams<F, R>);

impl<F: Float> UmapParams<F, Xoshiro256Plus> {
    /// Create a UMAP param set with given embedding size
    ///
    /// # Defaults to:
    ///  * `n_neighbors`: 15
    ///  * `min_dist`: 0.1
    ///  * `spread`: 1.0
    ///  * `n_epochs`: 500 up to 10000 observations, 200 above
    ///  * `learning_rate`: 1.0
    ///  * `negative_sample_rate`: 5
    ///  * `rng`: Xoshiro256Plus with seed 42
    pub fn new(n_components: usize) -> UmapParams<F, Xoshiro256Plus> {
        Self::new_with_rng(n_components, Xoshiro256Plus::seed_from_u64(42))
    }
}

impl<F: Float, R: Rng + Clone> UmapParams<F, R> {
    /// Create a UMAP param set with given embedding size and random number generator
    pub fn new_with_rng(n_components: usize, rng: R) -> UmapParams<F, R> {
        Self(UmapValidParams {
            n_components,
            n_neighbors: 15,
            min_dist: F::cast(0.1),
            spread: F::cast(1.0),
            n_epochs: None,
            learning_rate: F::cast(1.0),
            negative_sample_rate: 5,
            rng,
        })
    }

    /// Set the size of the local neighborhood
    ///
    /// Larger values capture more of the global structure at the cost of local detail. The
    /// observation itself counts as one of its neighbors.
    pub fn n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.0.n_neighbors = n_neighbors;
        self
    }

    /// Set the minimum distance between embedded points
    ///
    /// Small values pack neighbors tightly together, which suits clustering of the embedding.
    pub fn min_dist(mut self, min_dist: F) -> Self {
        self.0.min_dist = min_dist;
        self
    }

    /// Set the effective scale of embedded points
    pub fn spread(mut self, spread: F) -> Self {
        self.0.spread = spread;
        self
    }

    /// Set the number of optimization epochs
    pub fn n_epochs(mut self, n_epochs: usize) -> Self {
        self.0.n_epochs = Some(n_epochs);
        self
    }

    /// Set the initial learning rate of the layout optimization
    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    /// Set the number of negative samples drawn per positive sample
    pub fn negative_sample_rate(mut self, rate: usize) -> Self {
        self.0.negative_sample_rate = rate;
        self
    }

    /// Change the random number generator, the embedding is reproducible for a given seed
    pub fn with_rng<R2: Rng + Clone>(self, rng: R2) -> UmapParams<F, R2> {
        let p = self.0;
        UmapParams(UmapValidParams {
            n_components: p.n_components,
            n_neighbors: p.n_neighbors,
            min_dist: p.min_dist,
            spread: p.spread,
            n_epochs: p.n_epochs,
            learning_rate: p.learning_rate,
            negative_sample_rate: p.negative_sample_rate,
            rng,
        })
    }
}

impl<F: Float, R> ParamGuard for UmapParams<F, R> {
    type Checked = UmapValidParams<F, R>;
    type Error = UmapError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.n_neighbors < 2 {
            Err(UmapError::TooFewNeighbors(p.n_neighbors))
        } else if p.n_components == 0 {
            Err(UmapError::NoComponents)
        } else if p.spread <= F::zero() {
            Err(UmapError::NonPositiveSpread)
        } else if p.min_dist < F::zero() || p.min_dist > p.spread {
            Err(UmapError::InvalidMinDist)
        } else if p.learning_rate <= F::zero() {
            Err(UmapError::NonPositiveLearningRate)
        } else if p.n_epochs == Some(0) {
            Err(UmapError::NoEpochs)
        } else if p.negative_sample_rate == 0 {
            Err(UmapError::NoNegativeSamples)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
impl<F: Float, R> TransformGuard for UmapParams<F, R> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_at_least_2() {
        let res = UmapParams::<f64, _>::new(2).n_neighbors(1).check();
        assert!(matches!(res, Err(UmapError::TooFewNeighbors(1))));
    }

    #[test]
    fn components_not_zero() {
        let res = UmapParams::<f64, _>::new(0).check();
        assert!(matches!(res, Err(UmapError::NoComponents)));
    }

    #[test]
    fn min_dist_within_spread() {
        let res = UmapParams::new(2).min_dist(-0.1).check();
        assert!(matches!(res, Err(UmapError::InvalidMinDist)));

        let res = UmapParams::new(2).min_dist(1.5).spread(1.0).check();
        assert!(matches!(res, Err(UmapError::InvalidMinDist)));

        assert!(UmapParams::new(2).min_dist(0.0f64).check().is_ok());
    }

    #[test]
    fn epochs_and_rates_positive() {
        let res = UmapParams::<f32, _>::new(2).n_epochs(0).check();
        assert!(matches!(res, Err(UmapError::NoEpochs)));

        let res = UmapParams::new(2).learning_rate(0.0f32).check();
        assert!(matches!(res, Err(UmapError::NonPositiveLearningRate)));

        let res = UmapParams::<f32, _>::new(2).negative_sample_rate(0).check();
        assert!(matches!(res, Err(UmapError::NoNegativeSamples)));
    }
}
