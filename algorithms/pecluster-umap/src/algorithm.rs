use std::cmp::Ordering;
use std::collections::BTreeMap;

use linfa_nn::{distance::L2Dist, CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use pecluster::{traits::Transformer, Float};
use rand::Rng;

use crate::error::{Result, UmapError};
use crate::hyperparams::{UmapParams, UmapValidParams};
use rand_xoshiro::Xoshiro256Plus;

/// Tolerance of the bandwidth search
const SMOOTH_K_TOLERANCE: f64 = 1e-5;
/// Lower bound of the bandwidth relative to the mean neighbor distance
const MIN_K_DIST_SCALE: f64 = 1e-3;
const BANDWIDTH_ITERATIONS: usize = 64;
/// Coordinates of the initial layout are drawn from `[-INIT_RANGE, INIT_RANGE]`
const INIT_RANGE: f64 = 10.0;
const GRADIENT_CLIP: f64 = 4.0;

/// Uniform Manifold Approximation and Projection
///
/// Observations are embedded by building a fuzzy graph of their nearest neighbors and laying it
/// out in `n_components` dimensions with stochastic gradient descent. See [`UmapParams`] for the
/// available settings.
///
/// # Example
///
/// ```
/// use ndarray::Array2;
/// use pecluster::traits::Transformer;
/// use pecluster_umap::Umap;
///
/// let observations = Array2::from_shape_fn((20, 4), |(i, j)| {
///     ((i % 2) * 10 + j) as f64 + i as f64 * 0.1
/// });
/// let embedding = Umap::params(2)
///     .n_neighbors(5)
///     .n_epochs(20)
///     .transform(&observations)
///     .unwrap();
/// assert_eq!(embedding.nrows(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Umap;

impl Umap {
    /// Parameters embedding into `n_components` dimensions, see [`UmapParams::new`] for the
    /// defaults
    pub fn params<F: Float>(n_components: usize) -> UmapParams<F, Xoshiro256Plus> {
        UmapParams::new(n_components)
    }
}

/// Weighted edge of the fuzzy neighborhood graph
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge<F> {
    head: usize,
    tail: usize,
    weight: F,
}

impl<F: Float, R: Rng + Clone, D: Data<Elem = F>> Transformer<&ArrayBase<D, Ix2>, Result<Array2<F>>>
    for UmapValidParams<F, R>
{
    /// Embed the observations into `n_components` dimensions
    ///
    /// The random number generator is cloned, so the same parameters always produce the same
    /// embedding for the same observations.
    fn transform(&self, x: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            return Err(UmapError::NotEnoughSamples(n_samples));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(UmapError::NonFinite);
        }
        if x.ncols() == 0 {
            return Err(UmapError::NoFeatures);
        }

        let n_epochs = self
            .n_epochs()
            .unwrap_or(if n_samples <= 10_000 { 500 } else { 200 });
        // the neighborhood counts the observation itself
        let k = (self.n_neighbors() - 1).min(n_samples - 1);

        let (indices, distances) = nearest_neighbors(x, k)?;
        let (sigmas, rhos) = smooth_knn_dist(&distances);
        let edges = fuzzy_simplicial_set(&indices, &distances, &sigmas, &rhos, n_epochs);

        let (a, b) = find_ab_params(
            self.spread().to_f64().unwrap_or(1.0),
            self.min_dist().to_f64().unwrap_or(0.0),
        );

        let mut rng = self.rng().clone();
        let range = F::cast(INIT_RANGE);
        let mut embedding = Array2::from_shape_simple_fn((n_samples, self.n_components()), || {
            rng.gen_range(-range..range)
        });

        optimize_layout(
            &mut embedding,
            &edges,
            n_epochs,
            F::cast(a),
            F::cast(b),
            self.learning_rate(),
            self.negative_sample_rate(),
            &mut rng,
        );

        Ok(embedding)
    }
}

fn squared_distance<F: Float>(a: impl Iterator<Item = F>, b: impl Iterator<Item = F>) -> F {
    a.zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Exact `k` nearest neighbors of every observation, excluding the observation itself
///
/// Candidates come from a kd-tree over the observations. Neighbors are ordered by distance,
/// ties are broken by the index.
fn nearest_neighbors<F: Float, D: Data<Elem = F>>(
    x: &ArrayBase<D, Ix2>,
    k: usize,
) -> Result<(Vec<Vec<usize>>, Vec<Vec<F>>)> {
    let n_samples = x.nrows();
    let points = x.mapv(|v| v.to_f64().unwrap_or(f64::NAN));
    let index = CommonNearestNeighbour::KdTree.from_batch(&points, L2Dist)?;

    let mut indices = Vec::with_capacity(n_samples);
    let mut distances = Vec::with_capacity(n_samples);

    for (i, row) in points.outer_iter().enumerate() {
        // one extra candidate makes up for the observation itself
        let mut candidates = index
            .k_nearest(row, (k + 1).min(n_samples))?
            .into_iter()
            .filter(|(_, j)| *j != i)
            .map(|(_, j)| {
                let dist =
                    squared_distance(x.row(i).iter().copied(), x.row(j).iter().copied()).sqrt();
                (dist, j)
            })
            .collect::<Vec<_>>();

        candidates.sort_unstable_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        candidates.truncate(k);

        let (dist, idx): (Vec<F>, Vec<usize>) = candidates.into_iter().unzip();
        indices.push(idx);
        distances.push(dist);
    }

    Ok((indices, distances))
}

/// Per-observation bandwidth `sigma` and distance to the closest neighbor `rho`
///
/// The bandwidth is chosen such that the membership strengths of the neighbors sum up to
/// `log2(k + 1)`.
fn smooth_knn_dist<F: Float>(distances: &[Vec<F>]) -> (Vec<F>, Vec<F>) {
    let n_samples = distances.len();
    let n_distances = distances.iter().map(|d| d.len()).sum::<usize>();
    let mean_distance = if n_distances > 0 {
        distances.iter().flatten().copied().sum::<F>() / F::cast(n_distances)
    } else {
        F::zero()
    };
    let min_scale = F::cast(MIN_K_DIST_SCALE);
    let tolerance = F::cast(SMOOTH_K_TOLERANCE);

    let mut sigmas = Vec::with_capacity(n_samples);
    let mut rhos = Vec::with_capacity(n_samples);

    for dists in distances {
        let target = F::cast(dists.len() + 1).log2();
        let rho = dists
            .iter()
            .copied()
            .find(|d| *d > F::zero())
            .unwrap_or_else(F::zero);

        let (mut lo, mut hi, mut mid) = (F::zero(), F::infinity(), F::one());
        for _ in 0..BANDWIDTH_ITERATIONS {
            let psum = dists
                .iter()
                .map(|d| {
                    let d = *d - rho;
                    if d > F::zero() {
                        (-d / mid).exp()
                    } else {
                        F::one()
                    }
                })
                .sum::<F>();

            if (psum - target).abs() < tolerance {
                break;
            }
            if psum > target {
                hi = mid;
                mid = (lo + hi) / F::cast(2);
            } else {
                lo = mid;
                if hi.is_infinite() {
                    mid *= F::cast(2);
                } else {
                    mid = (lo + hi) / F::cast(2);
                }
            }
        }

        let floor = if rho > F::zero() {
            let local_mean = dists.iter().copied().sum::<F>() / F::cast(dists.len().max(1));
            min_scale * local_mean
        } else {
            min_scale * mean_distance
        };
        sigmas.push(mid.max(floor));
        rhos.push(rho);
    }

    (sigmas, rhos)
}

/// Symmetric fuzzy neighborhood graph
///
/// Directed memberships are combined with the probabilistic union `w + w' - w * w'`. Both
/// directions of an edge are returned, edges too weak to be sampled within `n_epochs` are
/// dropped.
fn fuzzy_simplicial_set<F: Float>(
    indices: &[Vec<usize>],
    distances: &[Vec<F>],
    sigmas: &[F],
    rhos: &[F],
    n_epochs: usize,
) -> Vec<Edge<F>> {
    let mut directed = BTreeMap::new();
    for (i, (idx, dists)) in indices.iter().zip(distances).enumerate() {
        for (j, d) in idx.iter().zip(dists) {
            let d = *d - rhos[i];
            let weight = if d <= F::zero() || sigmas[i] == F::zero() {
                F::one()
            } else {
                (-d / sigmas[i]).exp()
            };
            directed.insert((i, *j), weight);
        }
    }

    let mut symmetric = BTreeMap::new();
    for &(i, j) in directed.keys() {
        let key = (i.min(j), i.max(j));
        if symmetric.contains_key(&key) {
            continue;
        }
        let w = directed.get(&(i, j)).copied().unwrap_or_else(F::zero);
        let wt = directed.get(&(j, i)).copied().unwrap_or_else(F::zero);
        symmetric.insert(key, w + wt - w * wt);
    }

    let max_weight = symmetric.values().copied().fold(F::zero(), F::max);
    let threshold = max_weight / F::cast(n_epochs);

    symmetric
        .into_iter()
        .filter(|(_, weight)| *weight >= threshold && *weight > F::zero())
        .flat_map(|((i, j), weight)| {
            vec![
                Edge {
                    head: i,
                    tail: j,
                    weight,
                },
                Edge {
                    head: j,
                    tail: i,
                    weight,
                },
            ]
        })
        .collect()
}

fn curve(x: f64, a: f64, b: f64) -> f64 {
    1.0 / (1.0 + a * x.powf(2.0 * b))
}

/// Fit the low dimensional membership curve `1 / (1 + a * x^(2b))` to the offset exponential
/// defined by `min_dist` and `spread`
///
/// The least squares problem is solved with Levenberg-Marquardt steps starting at `a = b = 1`.
pub(crate) fn find_ab_params(spread: f64, min_dist: f64) -> (f64, f64) {
    let n_points = 300;
    let xs = (0..n_points)
        .map(|i| 3.0 * spread * i as f64 / (n_points - 1) as f64)
        .collect::<Vec<_>>();
    let ys = xs
        .iter()
        .map(|x| {
            if *x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect::<Vec<_>>();

    let cost = |a: f64, b: f64| {
        xs.iter()
            .zip(&ys)
            .map(|(x, y)| (curve(*x, a, b) - y).powi(2))
            .sum::<f64>()
    };

    let (mut a, mut b) = (1.0, 1.0);
    let mut current = cost(a, b);
    let mut lambda = 1e-3;

    for _ in 0..500 {
        // normal equations of the linearized problem
        let (mut jaa, mut jab, mut jbb, mut ga, mut gb) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (x, y) in xs.iter().zip(&ys) {
            if *x <= 0.0 {
                continue;
            }
            let u = x.powf(2.0 * b);
            let denom = (1.0 + a * u).powi(2);
            let da = -u / denom;
            let db = -2.0 * a * u * x.ln() / denom;
            let r = curve(*x, a, b) - y;

            jaa += da * da;
            jab += da * db;
            jbb += db * db;
            ga += da * r;
            gb += db * r;
        }

        let (maa, mbb) = (jaa * (1.0 + lambda), jbb * (1.0 + lambda));
        let det = maa * mbb - jab * jab;
        if det.abs() < f64::EPSILON {
            break;
        }
        let step_a = -(mbb * ga - jab * gb) / det;
        let step_b = -(maa * gb - jab * ga) / det;

        let (next_a, next_b) = (a + step_a, b + step_b);
        let next = if next_a > 0.0 && next_b > 0.0 {
            cost(next_a, next_b)
        } else {
            f64::INFINITY
        };

        if next < current {
            let converged = (current - next) < 1e-15 * current.max(1e-300)
                || (step_a.abs() < 1e-12 && step_b.abs() < 1e-12);
            a = next_a;
            b = next_b;
            current = next;
            lambda = (lambda / 10.0).max(1e-12);
            if converged {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    (a, b)
}

/// Stochastic gradient descent on the cross entropy between the neighborhood graph and the
/// layout
///
/// Edges are sampled proportionally to their weight, every sampled edge pulls both endpoints
/// together and pushes the head away from `negative_sample_rate` random observations.
#[allow(clippy::too_many_arguments)]
fn optimize_layout<F: Float, R: Rng>(
    embedding: &mut Array2<F>,
    edges: &[Edge<F>],
    n_epochs: usize,
    a: F,
    b: F,
    learning_rate: F,
    negative_sample_rate: usize,
    rng: &mut R,
) {
    let n_samples = embedding.nrows();
    let dim = embedding.ncols();
    let two = F::cast(2.0);
    let clip = F::cast(GRADIENT_CLIP);
    let clamp = |g: F| g.max(-clip).min(clip);

    let max_weight = edges.iter().map(|e| e.weight).fold(F::zero(), F::max);
    let epochs_per_sample = edges
        .iter()
        .map(|e| max_weight / e.weight)
        .collect::<Vec<_>>();
    let epochs_per_negative_sample = epochs_per_sample
        .iter()
        .map(|e| *e / F::cast(negative_sample_rate))
        .collect::<Vec<_>>();
    let mut next_sample = epochs_per_sample.clone();
    let mut next_negative_sample = epochs_per_negative_sample.clone();

    let mut current = vec![F::zero(); dim];
    let mut alpha = learning_rate;

    for epoch in 0..n_epochs {
        let n = F::cast(epoch);
        for (idx, edge) in edges.iter().enumerate() {
            if next_sample[idx] > n {
                continue;
            }
            let (j, k) = (edge.head, edge.tail);

            for d in 0..dim {
                current[d] = embedding[(j, d)];
            }
            let dist = squared_distance(current.iter().copied(), embedding.row(k).iter().copied());
            let coeff = if dist > F::zero() {
                -two * a * b * dist.powf(b - F::one()) / (a * dist.powf(b) + F::one())
            } else {
                F::zero()
            };
            for d in 0..dim {
                let grad = clamp(coeff * (current[d] - embedding[(k, d)]));
                current[d] += grad * alpha;
                embedding[(k, d)] -= grad * alpha;
            }
            next_sample[idx] += epochs_per_sample[idx];

            let n_negative = ((n - next_negative_sample[idx]) / epochs_per_negative_sample[idx])
                .max(F::zero())
                .to_usize()
                .unwrap_or(0);
            for _ in 0..n_negative {
                let k = rng.gen_range(0..n_samples);
                if k == j {
                    continue;
                }
                let dist =
                    squared_distance(current.iter().copied(), embedding.row(k).iter().copied());
                if dist <= F::zero() {
                    continue;
                }
                let coeff =
                    two * b / ((F::cast(0.001) + dist) * (a * dist.powf(b) + F::one()));
                for d in 0..dim {
                    let cur_d = current[d];
                    current[d] += clamp(coeff * (cur_d - embedding[(k, d)])) * alpha;
                }
            }
            next_negative_sample[idx] += F::cast(n_negative) * epochs_per_negative_sample[idx];

            for d in 0..dim {
                embedding[(j, d)] = current[d];
            }
        }

        alpha = learning_rate * (F::one() - F::cast(epoch + 1) / F::cast(n_epochs));
    }
}
