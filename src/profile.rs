//! User profile — birthdate and life expectancy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lowest life expectancy the app will compute with.
pub const MIN_LIFE_EXPECTANCY: u32 = 60;

/// Hard ceiling on life expectancy.
pub const MAX_LIFE_EXPECTANCY: u32 = 100;

/// Used when no (or a non-positive) life expectancy is stored.
pub const DEFAULT_LIFE_EXPECTANCY: u32 = 90;

/// Clamp a raw life expectancy into `[60, 100]`.
///
/// Missing and non-positive values mean "unset" and yield the default.
/// Storage written by older versions may hold anything, so every read
/// goes through here too.
pub fn clamp_life_expectancy(raw: Option<i64>) -> u32 {
    match raw {
        Some(years) if years > 0 => years
            .clamp(MIN_LIFE_EXPECTANCY as i64, MAX_LIFE_EXPECTANCY as i64)
            as u32,
        _ => DEFAULT_LIFE_EXPECTANCY,
    }
}

/// A user's profile as stored and exchanged at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "crate::dates::iso_date")]
    pub birthdate: Option<NaiveDate>,
    #[serde(default = "default_life_expectancy", deserialize_with = "de_life_expectancy")]
    life_expectancy: u32,
}

fn default_life_expectancy() -> u32 {
    DEFAULT_LIFE_EXPECTANCY
}

fn de_life_expectancy<'de, D: serde::Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    // Accept floats too; some clients wrote the slider value verbatim.
    let raw: Option<f64> = Option::deserialize(d)?;
    Ok(clamp_life_expectancy(raw.map(|v| v.floor() as i64)))
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            birthdate: None,
            life_expectancy: DEFAULT_LIFE_EXPECTANCY,
        }
    }
}

impl UserProfile {
    pub fn new(name: impl Into<String>, birthdate: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            birthdate,
            ..Self::default()
        }
    }

    /// Builder: set life expectancy (clamped).
    pub fn with_life_expectancy(mut self, years: i64) -> Self {
        self.set_life_expectancy(years);
        self
    }

    /// Effective life expectancy, always within `[60, 100]`.
    pub fn life_expectancy(&self) -> u32 {
        clamp_life_expectancy(Some(self.life_expectancy as i64))
    }

    pub fn set_life_expectancy(&mut self, years: i64) {
        self.life_expectancy = clamp_life_expectancy(Some(years));
    }

    /// Onboarding is done once both a name and a birthdate are set.
    pub fn is_setup(&self) -> bool {
        !self.name.trim().is_empty() && self.birthdate.is_some()
    }
}
