//! Climate record data structure.
//!
//! One row of the `ClimateData` table, plus the random sampling used by
//! insert tasks.

use crate::types::error::{Result, WorkloadError};
use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Temperature range in °C.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -10.0..=35.0;

/// Precipitation range in mm.
pub const PRECIPITATION_RANGE: RangeInclusive<f64> = 0.0..=50.0;

/// Relative humidity range in %.
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 20.0..=100.0;

/// How far back `record_date` may reach, in days.
pub const MAX_RECORD_AGE_DAYS: i64 = 365;

/// City a climate record was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Ottawa,
    Toronto,
    Vancouver,
    Montreal,
}

impl Location {
    /// Every location, in sampling order.
    pub const ALL: [Location; 4] = [
        Location::Ottawa,
        Location::Toronto,
        Location::Vancouver,
        Location::Montreal,
    ];

    /// Canonical name, as stored in the `location` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ottawa => "Ottawa",
            Self::Toronto => "Toronto",
            Self::Vancouver => "Vancouver",
            Self::Montreal => "Montreal",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|location| location.as_str() == s)
            .ok_or_else(|| WorkloadError::InvalidRecord(format!("unknown location '{}'", s)))
    }
}

/// One `ClimateData` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateRecord {
    /// City the reading belongs to
    pub location: Location,

    /// Day of the reading
    pub record_date: NaiveDate,

    /// Temperature in °C
    pub temperature: f64,

    /// Precipitation in mm
    pub precipitation: f64,

    /// Relative humidity in %
    pub humidity: f64,
}

impl ClimateRecord {
    /// Sample a record with uniformly distributed attributes.
    ///
    /// Numeric attributes are rounded to two decimal places. The date lies in
    /// `[today - 365 days, today]`.
    ///
    /// # Arguments
    ///
    /// * `rng` - Random source
    /// * `today` - Upper bound of `record_date`
    ///
    /// # Returns
    ///
    /// New `ClimateRecord` satisfying every range in this module
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let today = chrono::Local::now().date_naive();
    /// let record = ClimateRecord::sample(&mut rand::thread_rng(), today);
    /// assert!(record.validate(today).is_ok());
    /// ```
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> Self {
        let location = *Location::ALL
            .choose(rng)
            .unwrap_or(&Location::Ottawa);
        let age = rng.gen_range(0..=MAX_RECORD_AGE_DAYS);

        Self {
            location,
            record_date: today - Duration::days(age),
            temperature: round2(rng.gen_range(TEMPERATURE_RANGE)),
            precipitation: round2(rng.gen_range(PRECIPITATION_RANGE)),
            humidity: round2(rng.gen_range(HUMIDITY_RANGE)),
        }
    }

    /// Check every attribute against its documented range.
    ///
    /// # Arguments
    ///
    /// * `today` - Reference day for the `record_date` window
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::InvalidRecord` naming the first offending field
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        let oldest = today - Duration::days(MAX_RECORD_AGE_DAYS);
        if self.record_date < oldest || self.record_date > today {
            return Err(WorkloadError::InvalidRecord(format!(
                "record_date {} outside [{}, {}]",
                self.record_date, oldest, today
            )));
        }

        check_range("temperature", self.temperature, &TEMPERATURE_RANGE)?;
        check_range("precipitation", self.precipitation, &PRECIPITATION_RANGE)?;
        check_range("humidity", self.humidity, &HUMIDITY_RANGE)?;
        Ok(())
    }
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(WorkloadError::InvalidRecord(format!(
            "{} {} outside [{}, {}]",
            field,
            value,
            range.start(),
            range.end()
        )))
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
