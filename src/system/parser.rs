//! `upsc` output parser.
//! Converts `key: value` lines into typed UPS telemetry and power source.

use tracing::debug;

use crate::ups::{PowerSource, UpsError, UpsTelemetry};

/// Parse the full `upsc <ups>` variable listing.
/// Input: "battery.charge: 100\nbattery.runtime: 1620\nups.status: OL\n..."
/// Unknown keys are ignored; an unparsable value only drops that field.
pub fn parse_telemetry(output: &str) -> UpsTelemetry {
    let mut telemetry = UpsTelemetry::default();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "ups.load" => telemetry.load_percent = number(key, value),
            "ups.realpower.nominal" => telemetry.realpower_nominal = number(key, value),
            "battery.charge" => telemetry.charge_percent = number(key, value),
            "battery.runtime" => telemetry.runtime_secs = number(key, value),
            "input.voltage" => telemetry.input_voltage = number(key, value),
            "ups.mfr" if !value.is_empty() => telemetry.manufacturer = Some(value.to_string()),
            "ups.model" if !value.is_empty() => telemetry.model = Some(value.to_string()),
            _ => {}
        }
    }

    telemetry
}

fn number(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!("Ignoring non-numeric upsc value {}={:?}", key.trim(), value);
            None
        }
    }
}

/// Parse `upsc <ups> ups.status` (space separated NUT flags such as "OL CHRG" or "OB DISCHRG LB").
pub fn parse_power_source(output: &str) -> Result<PowerSource, UpsError> {
    let status = output.lines().next().unwrap_or_default().trim();
    let mut flags = status.split_whitespace();

    if flags.clone().any(|f| f == "OL") {
        Ok(PowerSource::Grid)
    } else if flags.any(|f| f == "OB") {
        Ok(PowerSource::Battery)
    } else {
        Err(UpsError::UnknownStatus(status.to_string()))
    }
}

/// Parse `upsc <ups> battery.runtime`. NUT reports whole seconds, some
/// drivers emit a decimal point.
pub fn parse_runtime(output: &str) -> Result<u64, UpsError> {
    let raw = output.lines().next().unwrap_or_default().trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .ok_or_else(|| UpsError::Parse { key: "battery.runtime", value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
battery.charge: 87
battery.runtime: 1620
device.mfr: EATON
input.voltage: 229.5
ups.load: 23
ups.mfr: EATON
ups.model: 5P 1550
ups.realpower.nominal: 1100
ups.status: OL CHRG
";

    #[test]
    fn parses_recognised_fields() {
        let t = parse_telemetry(LISTING);
        assert_eq!(t.charge_percent, Some(87.0));
        assert_eq!(t.runtime_secs, Some(1620.0));
        assert_eq!(t.input_voltage, Some(229.5));
        assert_eq!(t.load_percent, Some(23.0));
        assert_eq!(t.realpower_nominal, Some(1100.0));
        assert_eq!(t.manufacturer.as_deref(), Some("EATON"));
        assert_eq!(t.model.as_deref(), Some("5P 1550"));
    }

    #[test]
    fn malformed_value_only_drops_its_field() {
        let t = parse_telemetry("ups.load: n/a\nbattery.charge: 55\ngarbage line\n");
        assert_eq!(t.load_percent, None);
        assert_eq!(t.charge_percent, Some(55.0));
    }

    #[test]
    fn status_flags_map_to_power_source() {
        assert_eq!(parse_power_source("OL\n").unwrap(), PowerSource::Grid);
        assert_eq!(parse_power_source("OL CHRG").unwrap(), PowerSource::Grid);
        assert_eq!(parse_power_source("OB DISCHRG").unwrap(), PowerSource::Battery);
        assert_eq!(parse_power_source("OB LB").unwrap(), PowerSource::Battery);
        assert!(matches!(parse_power_source(""), Err(UpsError::UnknownStatus(_))));
        assert!(matches!(parse_power_source("BYPASS"), Err(UpsError::UnknownStatus(_))));
    }

    #[test]
    fn runtime_accepts_integers_and_decimals() {
        assert_eq!(parse_runtime("1620\n").unwrap(), 1620);
        assert_eq!(parse_runtime("95.00").unwrap(), 95);
        assert!(parse_runtime("Error: Variable not supported by UPS").is_err());
        assert!(parse_runtime("-4").is_err());
    }
}
