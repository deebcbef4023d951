#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the order profile engine.
//!
//! This crate defines the vocabulary connecting the calendar enumerator, the
//! pure allocation systems, and adapters. Callers describe a [`DateRange`], a
//! total order count and validated weight vectors; allocation systems answer
//! with ordered [`ResolvedPeriod`] values, one per calendar period, carrying
//! the period's conditional probability, its cumulative probability and the
//! exact integer number of orders assigned to it.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum distance from 1.0 tolerated for a probability distribution.
pub const DISTRIBUTION_TOLERANCE: f64 = 0.001;
/// Number of month slots in a year.
pub const MONTHS_PER_YEAR: usize = 12;
/// Number of weekday slots in a week.
pub const DAYS_PER_WEEK: usize = 7;
/// Number of day-of-month slots, sized for the longest calendar month.
pub const MAX_DAYS_PER_MONTH: usize = 31;
/// Number of hour slots in a day.
pub const HOURS_PER_DAY: usize = 24;

/// Level of the temporal hierarchy.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar years.
    Year,
    /// Calendar months.
    Month,
    /// Calendar days.
    Day,
    /// Hours of the day.
    Hour,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
        };
        f.write_str(label)
    }
}

/// Identifies which weight vector an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScope {
    /// Year shares derived from range coverage.
    Year,
    /// Month-of-year distribution.
    Month,
    /// Day-of-week factors.
    Weekday,
    /// Day-of-month factors.
    DayOfMonth,
    /// Per-day base weights.
    Day,
    /// Hour-of-day shape.
    Hour,
}

impl fmt::Display for WeightScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Weekday => "weekday",
            Self::DayOfMonth => "day-of-month",
            Self::Day => "day",
            Self::Hour => "hour",
        };
        f.write_str(label)
    }
}

/// Errors raised while validating profile inputs.
///
/// Every variant is produced before any allocation runs, so callers never
/// observe partial results.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DistributionError {
    /// A weight vector is empty, holds a negative or non-finite entry, or a
    /// distribution does not sum to one.
    #[error("invalid {scope} weights: {len} entries summing to {sum}")]
    InvalidWeight {
        /// Weight vector that failed validation.
        scope: WeightScope,
        /// Number of entries supplied.
        len: usize,
        /// Sum of the supplied entries.
        sum: f64,
    },
    /// A fixed-length vector was supplied with the wrong number of slots.
    #[error("{scope} weights expect {expected} entries, got {actual}")]
    InvalidFactorLength {
        /// Weight vector that failed validation.
        scope: WeightScope,
        /// Number of slots required for the scope.
        expected: usize,
        /// Number of slots supplied.
        actual: usize,
    },
    /// The range ends before it starts.
    #[error("range end {end} precedes start {start}")]
    InvalidRange {
        /// First day requested.
        start: NaiveDate,
        /// Last day requested.
        end: NaiveDate,
    },
    /// The requested total order count is negative.
    #[error("total orders must be non-negative, got {total}")]
    NegativeTotal {
        /// Total supplied by the caller.
        total: i64,
    },
    /// The noise standard deviation is negative or not finite.
    #[error("noise standard deviation must be finite and non-negative, got {std_dev}")]
    InvalidNoise {
        /// Standard deviation supplied by the caller.
        std_dev: f64,
    },
    /// A distribution required by the requested granularity was not supplied.
    #[error("{scope} weights are required to resolve {granularity} granularity")]
    MissingWeights {
        /// Weight vector that is missing.
        scope: WeightScope,
        /// Granularity that needs the weights.
        granularity: Granularity,
    },
}

/// Inclusive range of calendar days.
///
/// Deserialization goes through [`DateRange::new`], so an inverted range is
/// rejected wherever it comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RangeBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RangeBounds> for DateRange {
    type Error = DistributionError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl DateRange {
    /// Creates a range covering `start` through `end`, both inclusive.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DistributionError> {
        if end < start {
            return Err(DistributionError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range covering exactly one day.
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both endpoints.
    #[must_use]
    pub fn day_count(&self) -> u32 {
        let days = (self.end - self.start).num_days() + 1;
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Reports whether the date lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Calendar year touched by a range.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct YearPeriod {
    year: i32,
}

impl YearPeriod {
    /// Creates a year descriptor.
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self { year }
    }

    /// Proleptic Gregorian year number.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Reports whether the year has a 29th of February.
    #[must_use]
    pub const fn is_leap(&self) -> bool {
        (self.year % 4 == 0 && self.year % 100 != 0) || self.year % 400 == 0
    }
}

/// Calendar month touched by a range.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    /// Creates a month descriptor; `month` counts from 1.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month containing the provided date.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Year number of the month.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1 for January.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Descriptor of the enclosing year.
    #[must_use]
    pub const fn year_period(&self) -> YearPeriod {
        YearPeriod::new(self.year)
    }

    /// Number of days in the full calendar month.
    #[must_use]
    pub const fn days_in_month(&self) -> u32 {
        match self.month {
            2 if self.year_period().is_leap() => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }
}

/// Calendar day inside a range.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DayPeriod {
    date: NaiveDate,
}

impl DayPeriod {
    /// Creates a day descriptor.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Date of the day.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Year number of the day.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Month number of the day, 1 for January.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Day of the month, starting at 1.
    #[must_use]
    pub fn day_of_month(&self) -> u32 {
        self.date.day()
    }

    /// Weekday of the day.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    /// Weekday slot, 0 for Monday through 6 for Sunday.
    #[must_use]
    pub fn weekday_index(&self) -> usize {
        self.date.weekday().num_days_from_monday() as usize
    }

    /// Descriptor of the enclosing month.
    #[must_use]
    pub fn month_period(&self) -> MonthPeriod {
        MonthPeriod::of(self.date)
    }

    /// Descriptor of the enclosing year.
    #[must_use]
    pub fn year_period(&self) -> YearPeriod {
        YearPeriod::new(self.date.year())
    }

    /// The 24 hours of the day in order.
    pub fn hours(self) -> impl Iterator<Item = HourPeriod> + Clone {
        (0..HOURS_PER_DAY as u32).map(move |hour| HourPeriod::new(self.date, hour))
    }
}

/// Hour of a day inside a range.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HourPeriod {
    date: NaiveDate,
    hour: u32,
}

impl HourPeriod {
    /// Creates an hour descriptor; `hour` ranges over 0-23.
    #[must_use]
    pub const fn new(date: NaiveDate, hour: u32) -> Self {
        Self { date, hour }
    }

    /// Date of the enclosing day.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Hour of the day, 0 through 23.
    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.hour
    }

    /// Descriptor of the enclosing day.
    #[must_use]
    pub const fn day_period(&self) -> DayPeriod {
        DayPeriod::new(self.date)
    }
}

/// Calendar period augmented with its resolved share of the orders.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPeriod<P> {
    period: P,
    conditional: f64,
    cumulative: f64,
    orders: u64,
}

impl<P> ResolvedPeriod<P> {
    /// Creates a resolved node.
    #[must_use]
    pub const fn new(period: P, conditional: f64, cumulative: f64, orders: u64) -> Self {
        Self {
            period,
            conditional,
            cumulative,
            orders,
        }
    }

    /// Calendar coordinates of the node.
    #[must_use]
    pub const fn period(&self) -> &P {
        &self.period
    }

    /// Probability relative to the enclosing period.
    #[must_use]
    pub const fn conditional(&self) -> f64 {
        self.conditional
    }

    /// Probability relative to the whole range.
    #[must_use]
    pub const fn cumulative(&self) -> f64 {
        self.cumulative
    }

    /// Integer number of orders assigned to the period.
    #[must_use]
    pub const fn orders(&self) -> u64 {
        self.orders
    }

    /// Continuous share of `total` before any rounding.
    #[must_use]
    pub fn expected_orders(&self, total: u64) -> f64 {
        self.cumulative * total as f64
    }
}

/// Resolved calendar year.
pub type ResolvedYear = ResolvedPeriod<YearPeriod>;
/// Resolved calendar month.
pub type ResolvedMonth = ResolvedPeriod<MonthPeriod>;
/// Resolved calendar day.
pub type ResolvedDay = ResolvedPeriod<DayPeriod>;
/// Resolved hour.
pub type ResolvedHour = ResolvedPeriod<HourPeriod>;

/// Resolved node of a granularity chosen at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum ResolvedNode {
    /// Year-level node.
    Year(ResolvedYear),
    /// Month-level node.
    Month(ResolvedMonth),
    /// Day-level node.
    Day(ResolvedDay),
    /// Hour-level node.
    Hour(ResolvedHour),
}

impl ResolvedNode {
    /// Granularity of the wrapped node.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        match self {
            Self::Year(_) => Granularity::Year,
            Self::Month(_) => Granularity::Month,
            Self::Day(_) => Granularity::Day,
            Self::Hour(_) => Granularity::Hour,
        }
    }

    /// Integer number of orders assigned to the node.
    #[must_use]
    pub const fn orders(&self) -> u64 {
        match self {
            Self::Year(node) => node.orders(),
            Self::Month(node) => node.orders(),
            Self::Day(node) => node.orders(),
            Self::Hour(node) => node.orders(),
        }
    }

    /// Probability relative to the enclosing period.
    #[must_use]
    pub const fn conditional(&self) -> f64 {
        match self {
            Self::Year(node) => node.conditional(),
            Self::Month(node) => node.conditional(),
            Self::Day(node) => node.conditional(),
            Self::Hour(node) => node.conditional(),
        }
    }

    /// Probability relative to the whole range.
    #[must_use]
    pub const fn cumulative(&self) -> f64 {
        match self {
            Self::Year(node) => node.cumulative(),
            Self::Month(node) => node.cumulative(),
            Self::Day(node) => node.cumulative(),
            Self::Hour(node) => node.cumulative(),
        }
    }
}

/// Month-of-year distribution applied cyclically to every year.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthWeights([f64; MONTHS_PER_YEAR]);

impl MonthWeights {
    /// Validates twelve probabilities summing to one.
    pub fn new(values: &[f64]) -> Result<Self, DistributionError> {
        fixed_distribution(WeightScope::Month, values).map(Self)
    }

    /// Equal weight for every month.
    #[must_use]
    pub const fn uniform() -> Self {
        Self([1.0 / MONTHS_PER_YEAR as f64; MONTHS_PER_YEAR])
    }

    /// Weight of the provided month number, counting from 1.
    #[must_use]
    pub fn weight(&self, month: u32) -> f64 {
        let slot = (month as usize + MONTHS_PER_YEAR - 1) % MONTHS_PER_YEAR;
        self.0[slot]
    }

    /// All twelve weights, January first.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for MonthWeights {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Hour-of-day activity distribution shared by every day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HourShape([f64; HOURS_PER_DAY]);

impl HourShape {
    /// Validates twenty-four probabilities summing to one.
    pub fn new(values: &[f64]) -> Result<Self, DistributionError> {
        fixed_distribution(WeightScope::Hour, values).map(Self)
    }

    /// Equal weight for every hour.
    #[must_use]
    pub const fn uniform() -> Self {
        Self([1.0 / HOURS_PER_DAY as f64; HOURS_PER_DAY])
    }

    /// All twenty-four weights, midnight first.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for HourShape {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Relative multipliers for each weekday, Monday first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeekdayFactors([f64; DAYS_PER_WEEK]);

impl WeekdayFactors {
    /// Validates seven non-negative factors.
    pub fn new(values: &[f64]) -> Result<Self, DistributionError> {
        fixed_factors(WeightScope::Weekday, values).map(Self)
    }

    /// Factor of the provided weekday slot, 0 for Monday.
    #[must_use]
    pub fn factor(&self, weekday: usize) -> f64 {
        self.0[weekday % DAYS_PER_WEEK]
    }

    /// All seven factors, Monday first.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for WeekdayFactors {
    fn default() -> Self {
        Self([1.0; DAYS_PER_WEEK])
    }
}

/// Relative multipliers for each day of the month, the 1st first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DayOfMonthFactors([f64; MAX_DAYS_PER_MONTH]);

impl DayOfMonthFactors {
    /// Validates thirty-one non-negative factors.
    pub fn new(values: &[f64]) -> Result<Self, DistributionError> {
        fixed_factors(WeightScope::DayOfMonth, values).map(Self)
    }

    /// Factor of the provided day of the month, counting from 1.
    #[must_use]
    pub fn factor(&self, day_of_month: u32) -> f64 {
        let slot = (day_of_month as usize + MAX_DAYS_PER_MONTH - 1) % MAX_DAYS_PER_MONTH;
        self.0[slot]
    }

    /// All thirty-one factors.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for DayOfMonthFactors {
    fn default() -> Self {
        Self([1.0; MAX_DAYS_PER_MONTH])
    }
}

/// Weekday and day-of-month multipliers applied to daily weights.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DayFactors {
    weekday: WeekdayFactors,
    day_of_month: DayOfMonthFactors,
}

impl DayFactors {
    /// Combines validated factor vectors.
    #[must_use]
    pub const fn new(weekday: WeekdayFactors, day_of_month: DayOfMonthFactors) -> Self {
        Self {
            weekday,
            day_of_month,
        }
    }

    /// Validates both factor vectors from raw slices.
    pub fn from_slices(weekday: &[f64], day_of_month: &[f64]) -> Result<Self, DistributionError> {
        Ok(Self::new(
            WeekdayFactors::new(weekday)?,
            DayOfMonthFactors::new(day_of_month)?,
        ))
    }

    /// Weekday multipliers.
    #[must_use]
    pub const fn weekday(&self) -> &WeekdayFactors {
        &self.weekday
    }

    /// Day-of-month multipliers.
    #[must_use]
    pub const fn day_of_month(&self) -> &DayOfMonthFactors {
        &self.day_of_month
    }

    /// Combined multiplier for a day.
    #[must_use]
    pub fn factor_for(&self, day: &DayPeriod) -> f64 {
        self.day_of_month.factor(day.day_of_month()) * self.weekday.factor(day.weekday_index())
    }
}

/// Spread of the multiplicative noise applied to weights.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseSpec {
    std_dev: f64,
}

impl NoiseSpec {
    /// Validates a finite, non-negative standard deviation.
    pub fn new(std_dev: f64) -> Result<Self, DistributionError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(DistributionError::InvalidNoise { std_dev });
        }
        Ok(Self { std_dev })
    }

    /// Standard deviation of the multiplicative perturbation.
    #[must_use]
    pub const fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

fn fixed_distribution<const N: usize>(
    scope: WeightScope,
    values: &[f64],
) -> Result<[f64; N], DistributionError> {
    let weights = fixed_factors(scope, values)?;
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(DistributionError::InvalidWeight {
            scope,
            len: N,
            sum,
        });
    }
    Ok(weights)
}

fn fixed_factors<const N: usize>(
    scope: WeightScope,
    values: &[f64],
) -> Result<[f64; N], DistributionError> {
    let weights: [f64; N] = values
        .try_into()
        .map_err(|_| DistributionError::InvalidFactorLength {
            scope,
            expected: N,
            actual: values.len(),
        })?;
    if weights
        .iter()
        .any(|weight| !weight.is_finite() || *weight < 0.0)
    {
        return Err(DistributionError::InvalidWeight {
            scope,
            len: N,
            sum: weights.iter().sum(),
        });
    }
    Ok(weights)
}
