#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weight normalization, noise injection and exact integer apportionment.
//!
//! Every allocation level funnels through the same three steps: perturb the
//! raw weights with an optional [`NoiseSource`], renormalize them into a
//! probability vector, and split an integer total across the slots with
//! [`allocate_integers`], which never gains or loses a unit.

use std::cmp::Ordering;

use order_profile_core::{DistributionError, NoiseSpec, WeightScope};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::{debug, warn};

/// Renormalization divisor collapsed to zero.
///
/// Allocation systems recover from this by substituting a uniform
/// distribution; it never reaches callers of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("cannot renormalize {len} weights without positive mass")]
pub struct DivisionDegeneracy {
    len: usize,
}

impl DivisionDegeneracy {
    /// Number of slots in the degenerate scope.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the degenerate scope had no slots at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Divides each weight by the vector's sum.
///
/// Fails when the vector is empty, holds a negative or non-finite entry, or
/// sums to zero.
pub fn normalize(scope: WeightScope, weights: &[f64]) -> Result<Vec<f64>, DistributionError> {
    let sum: f64 = weights.iter().sum();
    let invalid_entry = weights
        .iter()
        .any(|weight| !weight.is_finite() || *weight < 0.0);
    if weights.is_empty() || invalid_entry || !sum.is_finite() || sum <= 0.0 {
        return Err(DistributionError::InvalidWeight {
            scope,
            len: weights.len(),
            sum,
        });
    }
    Ok(weights.iter().map(|weight| weight / sum).collect())
}

/// Rescales non-negative weights so they sum to one.
///
/// Negative and non-finite entries count as zero.
pub fn renormalize(weights: &[f64]) -> Result<Vec<f64>, DivisionDegeneracy> {
    let sum: f64 = weights.iter().copied().map(positive_or_zero).sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(DivisionDegeneracy { len: weights.len() });
    }
    Ok(weights
        .iter()
        .map(|weight| positive_or_zero(*weight) / sum)
        .collect())
}

/// Rescales weights to sum to one, substituting a uniform distribution when
/// no weight carries positive mass.
#[must_use]
pub fn renormalize_or_uniform(weights: &[f64]) -> Vec<f64> {
    match renormalize(weights) {
        Ok(probabilities) => probabilities,
        Err(degeneracy) => {
            debug!(slots = degeneracy.len(), "weights collapsed, using uniform");
            uniform(weights.len())
        }
    }
}

/// Equal probability for each of `len` slots.
#[must_use]
pub fn uniform(len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    vec![1.0 / len as f64; len]
}

/// Source of multiplicative perturbations applied to weight vectors.
///
/// Implementations return one value per input weight; no ordering or sum
/// guarantee is expected of them.
pub trait NoiseSource {
    /// Returns a perturbed copy of `weights` using the given spread.
    fn perturb(&mut self, weights: &[f64], std_dev: f64) -> Vec<f64>;
}

/// Multiplies each weight by an independent draw from `Normal(1, std_dev)`.
#[derive(Debug)]
pub struct GaussianNoise<R> {
    rng: R,
}

impl<R: Rng> GaussianNoise<R> {
    /// Wraps an existing random number generator.
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl GaussianNoise<ChaCha8Rng> {
    /// Reproducible noise source derived from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Noise source seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> NoiseSource for GaussianNoise<R> {
    fn perturb(&mut self, weights: &[f64], std_dev: f64) -> Vec<f64> {
        let normal = match Normal::new(1.0, std_dev) {
            Ok(normal) => normal,
            Err(error) => {
                warn!(%error, std_dev, "noise spread rejected, weights left unperturbed");
                return weights.to_vec();
            }
        };
        weights
            .iter()
            .map(|weight| weight * normal.sample(&mut self.rng))
            .collect()
    }
}

/// Perturbs `weights` when a noise spec is present.
///
/// Returns the weights untouched when `noise` is `None`. Perturbed values
/// below zero are clamped to zero; the caller renormalizes.
pub fn apply_noise(
    weights: &[f64],
    noise: Option<NoiseSpec>,
    source: &mut dyn NoiseSource,
) -> Vec<f64> {
    let Some(noise) = noise else {
        return weights.to_vec();
    };

    let perturbed = source.perturb(weights, noise.std_dev());
    if perturbed.len() != weights.len() {
        warn!(
            expected = weights.len(),
            actual = perturbed.len(),
            "noise source changed vector length, ignoring perturbation"
        );
        return weights.to_vec();
    }
    perturbed.into_iter().map(positive_or_zero).collect()
}

/// Applies optional noise and renormalizes, falling back to uniform.
pub fn noisy_distribution(
    weights: &[f64],
    noise: Option<NoiseSpec>,
    source: &mut dyn NoiseSource,
) -> Vec<f64> {
    renormalize_or_uniform(&apply_noise(weights, noise, source))
}

/// Splits `total` across slots in proportion to `probabilities` using the
/// largest-remainder method.
///
/// Each slot first receives the floor of its share. The units left over go
/// one at a time to the slots with the largest fractional remainders, ties
/// broken by ascending index. The returned counts always sum to `total` for
/// a non-empty vector; an empty vector yields an empty allocation.
#[must_use]
pub fn allocate_integers(probabilities: &[f64], total: u64) -> Vec<u64> {
    if probabilities.is_empty() {
        return Vec::new();
    }

    let scale = total as f64;
    let mut counts = Vec::with_capacity(probabilities.len());
    let mut remainders = Vec::with_capacity(probabilities.len());
    for (index, probability) in probabilities.iter().enumerate() {
        let raw = positive_or_zero(*probability) * scale;
        let floor = raw.floor();
        counts.push((floor as u64).min(total));
        remainders.push((index, raw - floor));
    }
    remainders.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

    // Widened so the floors of large totals cannot wrap.
    let assigned: u128 = counts.iter().map(|count| u128::from(*count)).sum();
    let target = u128::from(total);
    match assigned.cmp(&target) {
        Ordering::Less => {
            let shortfall = total - assigned as u64;
            let slots = counts.len() as u64;
            let rounds = shortfall / slots;
            let extra = (shortfall % slots) as usize;
            for (position, (index, _)) in remainders.iter().enumerate() {
                counts[*index] += rounds + u64::from(position < extra);
            }
        }
        Ordering::Greater => {
            let mut surplus = assigned - target;
            while surplus > 0 {
                let holders = counts.iter().filter(|count| **count > 0).count() as u128;
                let share = (surplus / holders).max(1);
                for (index, _) in remainders.iter().rev() {
                    if surplus == 0 {
                        break;
                    }
                    let taken = u128::from(counts[*index]).min(share).min(surplus);
                    counts[*index] -= taken as u64;
                    surplus -= taken;
                }
            }
        }
        Ordering::Equal => {}
    }

    counts
}

fn positive_or_zero(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
