use std::{fs, path::Path};

use anyhow::{Context, Result};
use order_profile_core::{
    DayFactors, DayOfMonthFactors, HourShape, MonthWeights, NoiseSpec, WeekdayFactors,
};
use serde::Deserialize;

/// Weights and noise settings read from a TOML profile.
///
/// Every key is optional; absent distributions fall back to uniform and
/// absent factors to 1.0.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProfileFile {
    month_weights: Option<Vec<f64>>,
    hour_shape: Option<Vec<f64>>,
    weekday_factors: Option<Vec<f64>>,
    day_of_month_factors: Option<Vec<f64>>,
    noise_std_dev: Option<f64>,
    seed: Option<u64>,
}

impl ProfileFile {
    /// Reads and parses the profile stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid profile {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse profile toml contents")
    }

    pub(crate) fn month_weights(&self) -> Result<MonthWeights> {
        match self.month_weights.as_deref() {
            Some(weights) => MonthWeights::new(weights).context("invalid month_weights"),
            None => Ok(MonthWeights::uniform()),
        }
    }

    pub(crate) fn hour_shape(&self) -> Result<HourShape> {
        match self.hour_shape.as_deref() {
            Some(shape) => HourShape::new(shape).context("invalid hour_shape"),
            None => Ok(HourShape::uniform()),
        }
    }

    pub(crate) fn day_factors(&self) -> Result<DayFactors> {
        let weekday = match self.weekday_factors.as_deref() {
            Some(factors) => WeekdayFactors::new(factors).context("invalid weekday_factors")?,
            None => WeekdayFactors::default(),
        };
        let day_of_month = match self.day_of_month_factors.as_deref() {
            Some(factors) => {
                DayOfMonthFactors::new(factors).context("invalid day_of_month_factors")?
            }
            None => DayOfMonthFactors::default(),
        };
        Ok(DayFactors::new(weekday, day_of_month))
    }

    /// Noise spread, with `override_std_dev` taking precedence over the file.
    pub(crate) fn noise(&self, override_std_dev: Option<f64>) -> Result<Option<NoiseSpec>> {
        override_std_dev
            .or(self.noise_std_dev)
            .map(NoiseSpec::new)
            .transpose()
            .context("invalid noise standard deviation")
    }

    /// Seed, with `override_seed` taking precedence over the file.
    pub(crate) fn seed(&self, override_seed: Option<u64>) -> Option<u64> {
        override_seed.or(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_PROFILE: &str = include_str!("../profiles/default.toml");

    #[test]
    fn bundled_profile_is_valid() {
        let profile = ProfileFile::parse(DEFAULT_PROFILE).expect("bundled profile");

        let weights = profile.month_weights().expect("month weights");
        assert!((weights.weight(8) - 0.20).abs() < f64::EPSILON);
        let shape = profile.hour_shape().expect("hour shape");
        assert!((shape.as_slice()[18] - 0.08).abs() < f64::EPSILON);
        let factors = profile.day_factors().expect("day factors");
        assert!((factors.weekday().factor(5) - 1.3).abs() < f64::EPSILON);
        assert!((factors.day_of_month().factor(31) - 0.8).abs() < f64::EPSILON);
        assert_eq!(
            profile.noise(None).expect("noise"),
            Some(NoiseSpec::new(0.1).expect("spec"))
        );
        assert_eq!(profile.seed(None), None);
    }

    #[test]
    fn empty_profile_defaults_to_uniform() {
        let profile = ProfileFile::parse("").expect("empty profile");

        assert_eq!(profile.month_weights().expect("weights"), MonthWeights::uniform());
        assert_eq!(profile.hour_shape().expect("shape"), HourShape::uniform());
        assert_eq!(profile.day_factors().expect("factors"), DayFactors::default());
        assert_eq!(profile.noise(None).expect("noise"), None);
    }

    #[test]
    fn flags_override_file_values() {
        let profile = ProfileFile::parse("noise_std_dev = 0.2\nseed = 11\n").expect("profile");

        assert_eq!(
            profile.noise(Some(0.0)).expect("noise"),
            Some(NoiseSpec::new(0.0).expect("spec"))
        );
        assert_eq!(profile.seed(Some(12)), Some(12));
        assert_eq!(profile.seed(None), Some(11));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = ProfileFile::parse("month_wieghts = [1.0]\n").expect_err("typo");
        assert!(format!("{error:#}").contains("month_wieghts"), "{error:#}");
    }

    #[test]
    fn invalid_vectors_surface_on_use() {
        let profile = ProfileFile::parse("weekday_factors = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]\n")
            .expect("profile");
        let error = profile.day_factors().expect_err("six factors");
        assert!(format!("{error:#}").contains("weekday_factors"), "{error:#}");

        let profile = ProfileFile::parse("noise_std_dev = -1.0\n").expect("profile");
        assert!(profile.noise(None).is_err());
    }
}
