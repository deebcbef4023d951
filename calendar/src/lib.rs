#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Calendar enumeration of the periods touched by a date range.
//!
//! The [`Calendar`] walks the range once and keeps the ordered year, month
//! and day descriptors together with the number of range days falling in
//! every year and month. Allocation systems read these slices; nothing here
//! knows about weights or orders.

use std::collections::BTreeMap;

use order_profile_core::{DateRange, DayPeriod, HourPeriod, MonthPeriod, YearPeriod};

/// Ordered period descriptors covering an inclusive date range.
#[derive(Clone, Debug)]
pub struct Calendar {
    range: DateRange,
    years: Vec<YearPeriod>,
    months: Vec<MonthPeriod>,
    days: Vec<DayPeriod>,
    year_days: BTreeMap<YearPeriod, u32>,
    month_days: BTreeMap<MonthPeriod, u32>,
}

impl Calendar {
    /// Enumerates every year, month and day touched by `range`.
    #[must_use]
    pub fn new(range: DateRange) -> Self {
        let capacity = range.day_count() as usize;
        let mut years = Vec::new();
        let mut months = Vec::new();
        let mut days = Vec::with_capacity(capacity);
        let mut year_days = BTreeMap::new();
        let mut month_days = BTreeMap::new();

        for date in range
            .start()
            .iter_days()
            .take_while(|date| *date <= range.end())
        {
            let day = DayPeriod::new(date);
            let month = day.month_period();
            let year = day.year_period();

            if years.last() != Some(&year) {
                years.push(year);
            }
            if months.last() != Some(&month) {
                months.push(month);
            }
            *year_days.entry(year).or_insert(0) += 1;
            *month_days.entry(month).or_insert(0) += 1;
            days.push(day);
        }

        Self {
            range,
            years,
            months,
            days,
            year_days,
            month_days,
        }
    }

    /// Range the calendar was built for.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Years touched by the range in chronological order.
    #[must_use]
    pub fn years(&self) -> &[YearPeriod] {
        &self.years
    }

    /// Months touched by the range in chronological order.
    #[must_use]
    pub fn months(&self) -> &[MonthPeriod] {
        &self.months
    }

    /// Days of the range in chronological order.
    #[must_use]
    pub fn days(&self) -> &[DayPeriod] {
        &self.days
    }

    /// Hours of the range in chronological order, 24 per day.
    pub fn hours(&self) -> impl Iterator<Item = HourPeriod> + '_ {
        self.days.iter().flat_map(|day| day.hours())
    }

    /// Months of the range grouped by year.
    pub fn months_by_year(&self) -> impl Iterator<Item = (YearPeriod, &[MonthPeriod])> + '_ {
        self.months
            .chunk_by(|left, right| left.year() == right.year())
            .map(|chunk| (chunk[0].year_period(), chunk))
    }

    /// Days of the range grouped by month.
    pub fn days_by_month(&self) -> impl Iterator<Item = (MonthPeriod, &[DayPeriod])> + '_ {
        self.days
            .chunk_by(|left, right| left.month_period() == right.month_period())
            .map(|chunk| (chunk[0].month_period(), chunk))
    }

    /// Number of days in the range.
    #[must_use]
    pub fn day_count(&self) -> u32 {
        u32::try_from(self.days.len()).unwrap_or(u32::MAX)
    }

    /// Number of range days falling in `year`.
    #[must_use]
    pub fn days_within_year(&self, year: YearPeriod) -> u32 {
        self.year_days.get(&year).copied().unwrap_or(0)
    }

    /// Number of range days falling in `month`.
    #[must_use]
    pub fn days_within_month(&self, month: MonthPeriod) -> u32 {
        self.month_days.get(&month).copied().unwrap_or(0)
    }

    /// Fraction of the calendar month covered by the range.
    ///
    /// Interior months report 1.0; the first and last month of the range
    /// report the share of their days inside the range.
    #[must_use]
    pub fn month_coverage(&self, month: MonthPeriod) -> f64 {
        f64::from(self.days_within_month(month)) / f64::from(month.days_in_month())
    }
}
