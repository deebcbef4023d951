#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hour-level allocation of each day's resolved orders.

use order_profile_core::{DistributionError, HourShape, NoiseSpec, ResolvedDay, ResolvedHour};
use order_profile_system_apportion::{
    allocate_integers, apply_noise, renormalize_or_uniform, NoiseSource,
};
use tracing::debug;

/// Pure system that splits resolved days across their 24 hours.
///
/// The hourly shape is perturbed once per allocation and shared by every
/// day, so all days of one run follow the same intraday curve.
#[derive(Clone, Copy, Debug, Default)]
pub struct HourAllocator {
    shape: HourShape,
    noise: Option<NoiseSpec>,
}

impl HourAllocator {
    /// Creates an allocator from a validated hourly shape.
    #[must_use]
    pub const fn new(shape: HourShape, noise: Option<NoiseSpec>) -> Self {
        Self { shape, noise }
    }

    /// Validates twenty-four raw hour weights before creating the allocator.
    pub fn try_new(shape: &[f64], noise: Option<NoiseSpec>) -> Result<Self, DistributionError> {
        Ok(Self::new(HourShape::new(shape)?, noise))
    }

    /// Resolves 24 nodes per entry of `days` into `out`.
    pub fn allocate(
        &self,
        days: &[ResolvedDay],
        source: &mut dyn NoiseSource,
        out: &mut Vec<ResolvedHour>,
    ) {
        out.clear();
        if days.is_empty() {
            return;
        }

        // Drawn once and shared by every day of the allocation.
        let probabilities =
            renormalize_or_uniform(&apply_noise(self.shape.as_slice(), self.noise, source));
        out.reserve(days.len() * probabilities.len());

        for day in days {
            let counts = allocate_integers(&probabilities, day.orders());
            for ((hour, probability), orders) in
                day.period().hours().zip(&probabilities).zip(counts)
            {
                out.push(ResolvedHour::new(
                    hour,
                    *probability,
                    day.cumulative() * probability,
                    orders,
                ));
            }
        }
        debug!(days = days.len(), "resolved hours");
    }
}
