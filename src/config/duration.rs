//! Human-readable `<int><unit>` durations (`30s`, `5m`, `2h`).

use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;

const SECONDS_PER_UNIT: [(char, u64); 3] = [('s', 1), ('m', 60), ('h', 3600)];

/// Convert a duration string into whole seconds.
pub fn parse_seconds(raw: &str) -> Result<u64, ConfigError> {
    let raw = raw.trim();
    let invalid = || ConfigError::InvalidDuration(raw.to_string());

    let unit = raw.chars().last().ok_or_else(invalid)?;
    let multiplier = SECONDS_PER_UNIT
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, m)| *m)
        .ok_or_else(invalid)?;

    let amount: u64 = raw[..raw.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;

    amount.checked_mul(multiplier).ok_or_else(invalid)
}

/// Duration setting deserialized straight from its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct HumanDuration(Duration);

impl HumanDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn get(self) -> Duration {
        self.0
    }
}

impl TryFrom<String> for HumanDuration {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_seconds(&value).map(Self::from_secs)
    }
}
