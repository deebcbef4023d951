#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Day-level allocation of each month's resolved orders.
//!
//! Every day of the range starts from the same base weight. Noise is drawn
//! once for the whole range, after which each day's base is scaled by its
//! weekday and day-of-month factors and renormalized within its month.

use std::collections::HashMap;

use order_profile_calendar::Calendar;
use order_profile_core::{
    DayFactors, DistributionError, MonthPeriod, NoiseSpec, ResolvedDay, ResolvedMonth,
};
use order_profile_system_apportion::{
    allocate_integers, noisy_distribution, renormalize_or_uniform, uniform, NoiseSource,
};
use tracing::{debug, warn};

/// Pure system that splits resolved months across their days.
#[derive(Clone, Copy, Debug, Default)]
pub struct DayAllocator {
    factors: DayFactors,
    noise: Option<NoiseSpec>,
}

impl DayAllocator {
    /// Creates an allocator from validated day factors.
    #[must_use]
    pub const fn new(factors: DayFactors, noise: Option<NoiseSpec>) -> Self {
        Self { factors, noise }
    }

    /// Validates seven weekday and thirty-one day-of-month factors before
    /// creating the allocator.
    pub fn try_new(
        weekday: &[f64],
        day_of_month: &[f64],
        noise: Option<NoiseSpec>,
    ) -> Result<Self, DistributionError> {
        Ok(Self::new(DayFactors::from_slices(weekday, day_of_month)?, noise))
    }

    /// Resolves one node per day of `calendar` into `out`.
    ///
    /// `months` must hold the resolved months of the same calendar; days of a
    /// month without a resolved parent are skipped.
    pub fn allocate(
        &self,
        calendar: &Calendar,
        months: &[ResolvedMonth],
        source: &mut dyn NoiseSource,
        out: &mut Vec<ResolvedDay>,
    ) {
        out.clear();
        let days = calendar.days();
        if days.is_empty() {
            return;
        }

        let base = noisy_distribution(&uniform(days.len()), self.noise, source);
        let parents: HashMap<MonthPeriod, &ResolvedMonth> =
            months.iter().map(|month| (*month.period(), month)).collect();

        let mut offset = 0;
        for (month, month_days) in calendar.days_by_month() {
            let month_base = &base[offset..offset + month_days.len()];
            offset += month_days.len();

            let Some(parent) = parents.get(&month) else {
                warn!(
                    year = month.year(),
                    month = month.month(),
                    "no resolved total for month, days skipped"
                );
                continue;
            };

            let weights: Vec<f64> = month_days
                .iter()
                .zip(month_base)
                .map(|(day, weight)| weight * self.factors.factor_for(day))
                .collect();
            let probabilities = renormalize_or_uniform(&weights);
            let counts = allocate_integers(&probabilities, parent.orders());

            for ((day, probability), orders) in month_days.iter().zip(&probabilities).zip(counts)
            {
                out.push(ResolvedDay::new(
                    *day,
                    *probability,
                    parent.cumulative() * probability,
                    orders,
                ));
            }
            debug!(
                year = month.year(),
                month = month.month(),
                days = month_days.len(),
                orders = parent.orders(),
                "resolved days"
            );
        }
    }
}
