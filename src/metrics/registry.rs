//! In-memory gauge store rendered in the Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;

use super::{Gauge, MetricsSink};

type LabelSet = Vec<(&'static str, String)>;

#[derive(Default)]
pub struct GaugeRegistry {
    gauges: Mutex<BTreeMap<Gauge, BTreeMap<LabelSet, f64>>>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, gauge: Gauge, labels: &[(&'static str, &str)]) -> Option<f64> {
        let gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        gauges.get(&gauge)?.get(&owned(labels)).copied()
    }

    /// Render every gauge that has at least one sample.
    pub fn render(&self) -> String {
        let gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = String::new();

        for gauge in Gauge::ALL {
            let Some(samples) = gauges.get(&gauge).filter(|s| !s.is_empty()) else {
                continue;
            };
            let _ = writeln!(out, "# HELP {} {}", gauge.name(), gauge.help());
            let _ = writeln!(out, "# TYPE {} gauge", gauge.name());
            for (labels, value) in samples {
                let _ = writeln!(out, "{}{} {}", gauge.name(), render_labels(labels), value);
            }
        }

        out
    }
}

impl MetricsSink for GaugeRegistry {
    fn set(&self, gauge: Gauge, labels: &[(&'static str, &str)], value: f64) {
        let mut gauges = self.gauges.lock().unwrap_or_else(|e| e.into_inner());
        gauges.entry(gauge).or_default().insert(owned(labels), value);
    }
}

fn owned(labels: &[(&'static str, &str)]) -> LabelSet {
    labels.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

fn render_labels(labels: &LabelSet) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::HostStatus;

    #[test]
    fn set_overwrites_per_label_set() {
        let registry = GaugeRegistry::new();
        registry.set(Gauge::HostStatus, &[("host", "nas")], HostStatus::Reachable.value());
        registry.set(Gauge::HostStatus, &[("host", "nas")], HostStatus::PoweredOff.value());
        registry.set(Gauge::HostStatus, &[("host", "dc")], HostStatus::Unreachable.value());

        assert_eq!(registry.get(Gauge::HostStatus, &[("host", "nas")]), Some(2.0));
        assert_eq!(registry.get(Gauge::HostStatus, &[("host", "dc")]), Some(0.0));
        assert_eq!(registry.get(Gauge::UpsLoad, &[]), None);
    }

    #[test]
    fn renders_exposition_format() {
        let registry = GaugeRegistry::new();
        registry.set(Gauge::UpsRuntime, &[], 1620.0);
        registry.set(Gauge::UpsModel, &[("model", "5P \"1550\"")], 1.0);

        let text = registry.render();
        assert!(text.contains("# HELP ups_runtime Estimated battery runtime in seconds\n"));
        assert!(text.contains("# TYPE ups_runtime gauge\nups_runtime 1620\n"));
        assert!(text.contains("ups_model{model=\"5P \\\"1550\\\"\"} 1\n"));
        assert!(!text.contains("ups_load"));
    }
}
