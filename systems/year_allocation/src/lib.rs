#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Year-level allocation of the global order total.

use order_profile_calendar::Calendar;
use order_profile_core::{NoiseSpec, ResolvedYear};
use order_profile_system_apportion::{allocate_integers, noisy_distribution, NoiseSource};
use tracing::debug;

/// Pure system that splits the global total across the years of a range.
///
/// A year's weight is the share of the range's days that fall inside it, so
/// the weights already sum to one before any noise is applied.
#[derive(Clone, Copy, Debug, Default)]
pub struct YearAllocator {
    noise: Option<NoiseSpec>,
}

impl YearAllocator {
    /// Creates an allocator perturbing year weights with `noise`, if any.
    #[must_use]
    pub const fn new(noise: Option<NoiseSpec>) -> Self {
        Self { noise }
    }

    /// Resolves one node per year of `calendar` into `out`.
    pub fn allocate(
        &self,
        calendar: &Calendar,
        total: u64,
        source: &mut dyn NoiseSource,
        out: &mut Vec<ResolvedYear>,
    ) {
        out.clear();
        let years = calendar.years();
        if years.is_empty() {
            return;
        }

        let day_count = f64::from(calendar.day_count());
        let weights: Vec<f64> = years
            .iter()
            .map(|year| f64::from(calendar.days_within_year(*year)) / day_count)
            .collect();
        let probabilities = noisy_distribution(&weights, self.noise, source);
        let counts = allocate_integers(&probabilities, total);

        for ((year, probability), orders) in years.iter().zip(&probabilities).zip(counts) {
            debug!(year = year.year(), probability, orders, "resolved year");
            out.push(ResolvedYear::new(*year, *probability, *probability, orders));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use order_profile_core::{DateRange, YearPeriod};
    use order_profile_system_apportion::GaussianNoise;

    fn calendar(start: (i32, u32, u32), end: (i32, u32, u32)) -> Calendar {
        let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2).expect("start");
        let end = NaiveDate::from_ymd_opt(end.0, end.1, end.2).expect("end");
        Calendar::new(DateRange::new(start, end).expect("range"))
    }

    #[test]
    fn years_are_weighted_by_covered_days() {
        let calendar = calendar((2023, 12, 1), (2024, 1, 31));
        let mut years = Vec::new();
        YearAllocator::new(None).allocate(&calendar, 101, &mut GaussianNoise::seeded(1), &mut years);

        assert_eq!(years.len(), 2);
        assert_eq!(*years[0].period(), YearPeriod::new(2023));
        assert!((years[0].conditional() - 0.5).abs() < 1e-12);
        assert_eq!(years[0].orders(), 51);
        assert_eq!(years[1].orders(), 50);
    }

    #[test]
    fn uneven_coverage_follows_day_share() {
        let calendar = calendar((2022, 7, 1), (2024, 3, 31));
        let mut years = Vec::new();
        YearAllocator::new(None).allocate(
            &calendar,
            1_000,
            &mut GaussianNoise::seeded(1),
            &mut years,
        );

        let day_count = f64::from(calendar.day_count());
        let expected = [184.0 / day_count, 365.0 / day_count, 91.0 / day_count];
        for (year, expected) in years.iter().zip(expected) {
            assert!((year.conditional() - expected).abs() < 1e-12);
            assert!((year.cumulative() - year.conditional()).abs() < f64::EPSILON);
        }
        assert_eq!(years.iter().map(ResolvedYear::orders).sum::<u64>(), 1_000);
    }

    #[test]
    fn single_year_takes_everything_despite_noise() {
        let calendar = calendar((2024, 3, 1), (2024, 9, 30));
        let noise = Some(NoiseSpec::new(0.8).expect("noise"));
        let mut source = GaussianNoise::seeded(99);
        let mut years = Vec::new();

        for _ in 0..20 {
            YearAllocator::new(noise).allocate(&calendar, 4_321, &mut source, &mut years);
            assert_eq!(years.len(), 1);
            assert_eq!(years[0].orders(), 4_321);
            assert!((years[0].conditional() - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn noisy_years_still_conserve_total() {
        let calendar = calendar((2019, 5, 5), (2024, 2, 2));
        let noise = Some(NoiseSpec::new(0.3).expect("noise"));
        let mut years = Vec::new();
        YearAllocator::new(noise).allocate(
            &calendar,
            77_777,
            &mut GaussianNoise::seeded(5),
            &mut years,
        );

        assert_eq!(years.len(), 6);
        assert_eq!(years.iter().map(ResolvedYear::orders).sum::<u64>(), 77_777);
        let probability: f64 = years.iter().map(ResolvedYear::conditional).sum();
        assert!((probability - 1.0).abs() < 1e-9);
    }
}
