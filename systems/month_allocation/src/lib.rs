#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Month-level allocation of each year's resolved orders.
//!
//! Month weights are applied cyclically by month number and prorated by the
//! share of each calendar month the range covers, which only differs from 1
//! for the first and last month of the range. Weights are then perturbed and
//! renormalized within each year, and the year's already-rounded integer
//! total is split across its months.

use std::collections::HashMap;

use order_profile_calendar::Calendar;
use order_profile_core::{
    DistributionError, MonthWeights, NoiseSpec, ResolvedMonth, ResolvedYear, YearPeriod,
};
use order_profile_system_apportion::{allocate_integers, noisy_distribution, NoiseSource};
use tracing::{debug, warn};

/// Pure system that splits resolved years across their months.
#[derive(Clone, Copy, Debug)]
pub struct MonthAllocator {
    weights: MonthWeights,
    noise: Option<NoiseSpec>,
}

impl MonthAllocator {
    /// Creates an allocator from validated month weights.
    #[must_use]
    pub const fn new(weights: MonthWeights, noise: Option<NoiseSpec>) -> Self {
        Self { weights, noise }
    }

    /// Validates twelve raw month weights before creating the allocator.
    pub fn try_new(weights: &[f64], noise: Option<NoiseSpec>) -> Result<Self, DistributionError> {
        Ok(Self::new(MonthWeights::new(weights)?, noise))
    }

    /// Resolves one node per month of `calendar` into `out`.
    ///
    /// `years` must hold the resolved years of the same calendar; months of a
    /// year without a resolved parent are skipped.
    pub fn allocate(
        &self,
        calendar: &Calendar,
        years: &[ResolvedYear],
        source: &mut dyn NoiseSource,
        out: &mut Vec<ResolvedMonth>,
    ) {
        out.clear();
        let parents: HashMap<YearPeriod, &ResolvedYear> =
            years.iter().map(|year| (*year.period(), year)).collect();

        for (year, months) in calendar.months_by_year() {
            let Some(parent) = parents.get(&year) else {
                warn!(year = year.year(), "no resolved total for year, months skipped");
                continue;
            };

            let weights: Vec<f64> = months
                .iter()
                .map(|month| self.weights.weight(month.month()) * calendar.month_coverage(*month))
                .collect();
            let probabilities = noisy_distribution(&weights, self.noise, source);
            let counts = allocate_integers(&probabilities, parent.orders());

            for ((month, probability), orders) in months.iter().zip(&probabilities).zip(counts) {
                out.push(ResolvedMonth::new(
                    *month,
                    *probability,
                    parent.cumulative() * probability,
                    orders,
                ));
            }
            debug!(
                year = year.year(),
                months = months.len(),
                orders = parent.orders(),
                "resolved months"
            );
        }
    }
}
