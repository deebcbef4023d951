#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cascading resolution of an order profile from years down to hours.
//!
//! [`resolve`] validates a [`ProfileRequest`] for the requested depth, builds
//! the calendar once, and runs each allocation system exactly once, handing
//! every level the already-resolved nodes of the level above. Because each
//! level rounds against its parent's integer total, the orders of every
//! level sum to the global total without leakage.

use order_profile_calendar::Calendar;
use order_profile_core::{
    DateRange, DayFactors, DistributionError, Granularity, HourShape, MonthWeights, NoiseSpec,
    ResolvedDay, ResolvedHour, ResolvedMonth, ResolvedNode, ResolvedYear, WeightScope,
};
use order_profile_system_apportion::NoiseSource;
use order_profile_system_day_allocation::DayAllocator;
use order_profile_system_hour_allocation::HourAllocator;
use order_profile_system_month_allocation::MonthAllocator;
use order_profile_system_year_allocation::YearAllocator;
use serde::Serialize;
use tracing::{debug_span, info};

/// Inputs describing the profile to synthesize.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileRequest {
    range: DateRange,
    total: u64,
    month_weights: Option<MonthWeights>,
    day_factors: DayFactors,
    hour_shape: Option<HourShape>,
    noise: Option<NoiseSpec>,
}

impl ProfileRequest {
    /// Creates a request distributing `total` orders over `range`.
    ///
    /// Day factors default to 1.0; month weights and the hour shape must be
    /// supplied before resolving the granularities that need them.
    #[must_use]
    pub fn new(range: DateRange, total: u64) -> Self {
        Self {
            range,
            total,
            month_weights: None,
            day_factors: DayFactors::default(),
            hour_shape: None,
            noise: None,
        }
    }

    /// Creates a request from a signed total, rejecting negative values.
    pub fn from_signed_total(range: DateRange, total: i64) -> Result<Self, DistributionError> {
        let total = u64::try_from(total).map_err(|_| DistributionError::NegativeTotal { total })?;
        Ok(Self::new(range, total))
    }

    /// Sets the month-of-year distribution.
    #[must_use]
    pub fn with_month_weights(mut self, weights: MonthWeights) -> Self {
        self.month_weights = Some(weights);
        self
    }

    /// Sets the weekday and day-of-month factors.
    #[must_use]
    pub fn with_day_factors(mut self, factors: DayFactors) -> Self {
        self.day_factors = factors;
        self
    }

    /// Sets the hour-of-day shape.
    #[must_use]
    pub fn with_hour_shape(mut self, shape: HourShape) -> Self {
        self.hour_shape = Some(shape);
        self
    }

    /// Sets the noise applied to every level, or disables it with `None`.
    #[must_use]
    pub fn with_noise(mut self, noise: Option<NoiseSpec>) -> Self {
        self.noise = noise;
        self
    }

    /// Range to distribute over.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Global number of orders.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Noise applied to every level, if any.
    #[must_use]
    pub const fn noise(&self) -> Option<NoiseSpec> {
        self.noise
    }

    fn required_month_weights(
        &self,
        granularity: Granularity,
    ) -> Result<Option<MonthWeights>, DistributionError> {
        if granularity < Granularity::Month {
            return Ok(None);
        }
        self.month_weights
            .map(Some)
            .ok_or(DistributionError::MissingWeights {
                scope: WeightScope::Month,
                granularity,
            })
    }

    fn required_hour_shape(
        &self,
        granularity: Granularity,
    ) -> Result<Option<HourShape>, DistributionError> {
        if granularity < Granularity::Hour {
            return Ok(None);
        }
        self.hour_shape
            .map(Some)
            .ok_or(DistributionError::MissingWeights {
                scope: WeightScope::Hour,
                granularity,
            })
    }
}

/// Resolved node tree of one engine invocation.
///
/// Levels below the requested granularity are left empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderProfile {
    granularity: Granularity,
    range: DateRange,
    total: u64,
    years: Vec<ResolvedYear>,
    months: Vec<ResolvedMonth>,
    days: Vec<ResolvedDay>,
    hours: Vec<ResolvedHour>,
}

impl OrderProfile {
    fn empty(granularity: Granularity, range: DateRange, total: u64) -> Self {
        Self {
            granularity,
            range,
            total,
            years: Vec::new(),
            months: Vec::new(),
            days: Vec::new(),
            hours: Vec::new(),
        }
    }

    /// Deepest level that was resolved.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Range the profile covers.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Global number of orders distributed.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Resolved years in chronological order.
    #[must_use]
    pub fn years(&self) -> &[ResolvedYear] {
        &self.years
    }

    /// Resolved months in chronological order.
    #[must_use]
    pub fn months(&self) -> &[ResolvedMonth] {
        &self.months
    }

    /// Resolved days in chronological order.
    #[must_use]
    pub fn days(&self) -> &[ResolvedDay] {
        &self.days
    }

    /// Resolved hours in chronological order.
    #[must_use]
    pub fn hours(&self) -> &[ResolvedHour] {
        &self.hours
    }

    /// Nodes of the deepest resolved level.
    #[must_use]
    pub fn nodes(&self) -> Vec<ResolvedNode> {
        match self.granularity {
            Granularity::Year => self.years.iter().copied().map(ResolvedNode::Year).collect(),
            Granularity::Month => self.months.iter().copied().map(ResolvedNode::Month).collect(),
            Granularity::Day => self.days.iter().copied().map(ResolvedNode::Day).collect(),
            Granularity::Hour => self.hours.iter().copied().map(ResolvedNode::Hour).collect(),
        }
    }
}

/// Resolves `request` down to `granularity`.
///
/// All inputs are validated before `source` is asked for any noise. Each
/// level is computed once and its nodes are passed explicitly to the level
/// below.
pub fn resolve(
    request: &ProfileRequest,
    granularity: Granularity,
    source: &mut dyn NoiseSource,
) -> Result<OrderProfile, DistributionError> {
    let month_weights = request.required_month_weights(granularity)?;
    let hour_shape = request.required_hour_shape(granularity)?;

    let calendar = Calendar::new(request.range);
    let span = debug_span!(
        "resolve",
        %granularity,
        total = request.total,
        days = calendar.day_count()
    );
    let _entered = span.enter();

    let noise = request.noise;
    let mut profile = OrderProfile::empty(granularity, request.range, request.total);

    YearAllocator::new(noise).allocate(&calendar, request.total, source, &mut profile.years);
    if let Some(weights) = month_weights {
        MonthAllocator::new(weights, noise).allocate(
            &calendar,
            &profile.years,
            source,
            &mut profile.months,
        );
    }
    if granularity >= Granularity::Day {
        DayAllocator::new(request.day_factors, noise).allocate(
            &calendar,
            &profile.months,
            source,
            &mut profile.days,
        );
    }
    if let Some(shape) = hour_shape {
        HourAllocator::new(shape, noise).allocate(&profile.days, source, &mut profile.hours);
    }

    info!(
        %granularity,
        total = request.total,
        nodes = profile.nodes().len(),
        "order profile resolved"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use order_profile_system_apportion::GaussianNoise;

    fn range() -> DateRange {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).expect("start");
        let end = NaiveDate::from_ymd_opt(2024, 5, 3).expect("end");
        DateRange::new(start, end).expect("range")
    }

    #[test]
    fn negative_total_is_rejected() {
        assert_eq!(
            ProfileRequest::from_signed_total(range(), -5),
            Err(DistributionError::NegativeTotal { total: -5 })
        );
        assert_eq!(
            ProfileRequest::from_signed_total(range(), 5).map(|request| request.total()),
            Ok(5)
        );
    }

    #[test]
    fn builder_keeps_range_and_noise() {
        let noise = Some(NoiseSpec::new(0.2).expect("noise"));
        let request = ProfileRequest::new(range(), 12).with_noise(noise);

        assert_eq!(request.range(), range());
        assert_eq!(request.noise(), noise);
        assert_eq!(request.with_noise(None).noise(), None);
    }

    #[test]
    fn shallow_levels_stay_empty() {
        let request = ProfileRequest::new(range(), 90).with_month_weights(MonthWeights::uniform());
        let profile =
            resolve(&request, Granularity::Month, &mut GaussianNoise::seeded(1)).expect("profile");

        assert_eq!(profile.years().len(), 1);
        assert_eq!(profile.months().len(), 1);
        assert!(profile.days().is_empty());
        assert!(profile.hours().is_empty());
        assert_eq!(profile.nodes().len(), 1);
        assert_eq!(profile.nodes()[0].granularity(), Granularity::Month);
    }

    #[test]
    fn year_granularity_needs_no_weights() {
        let request = ProfileRequest::new(range(), 90);
        let profile =
            resolve(&request, Granularity::Year, &mut GaussianNoise::seeded(1)).expect("profile");
        assert_eq!(profile.years()[0].orders(), 90);
        assert!(profile.months().is_empty());
    }
}
