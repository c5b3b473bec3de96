//! Config file load and per-host validation.

use std::path::Path;

use serde::Deserialize;

use super::duration::parse_seconds;
use super::types::{GeneralSettings, HostEntry, DEFAULT_WINDOWS_SHUTDOWN};
use super::{Config, ConfigError};
use crate::host::{HostKind, HostRecord};

#[derive(Deserialize)]
struct Document {
    general: GeneralSettings,
    #[serde(default)]
    hosts: serde_yaml::Mapping,
}

/// Read and validate the configuration file. Only I/O and document-level
/// errors are fatal; bad host entries end up in `Config::rejected`.
pub async fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let document: Document = serde_yaml::from_str(content)?;
    validate_general(&document.general)?;

    let mut hosts = Vec::new();
    let mut rejected = Vec::new();

    // Mapping keeps document order, which is also the shedding order
    for (key, value) in document.hosts {
        let id = match key {
            serde_yaml::Value::String(s) => s,
            other => serde_yaml::to_string(&other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        };

        let result = serde_yaml::from_value::<HostEntry>(value)
            .map_err(|e| invalid(&id, e.to_string()))
            .and_then(|entry| build_host(&id, entry));

        match result {
            Ok(host) => hosts.push(host),
            Err(e) => rejected.push(e),
        }
    }

    Ok(Config { general: document.general, hosts, rejected })
}

/// Loop periods and the command timeout must be non-zero.
fn validate_general(general: &GeneralSettings) -> Result<(), ConfigError> {
    let periods = [
        ("general.host_checkup.interval", general.host_checkup.interval),
        ("general.ups_poll_interval", general.ups_poll_interval),
        ("general.command_timeout", general.command_timeout),
    ];
    for (key, value) in periods {
        if value.get().is_zero() {
            return Err(ConfigError::InvalidSetting { key, reason: "must be greater than 0s".to_string() });
        }
    }
    Ok(())
}

fn invalid(host: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidHost { host: host.to_string(), reason: reason.into() }
}

/// Turn one raw entry into a `HostRecord`, or explain why it cannot be loaded.
pub fn build_host(id: &str, entry: HostEntry) -> Result<HostRecord, ConfigError> {
    let (Some(kind), Some(limit)) = (entry.kind.as_deref(), entry.runtime_limit.as_deref()) else {
        return Err(invalid(id, "missing 'type' and/or 'runtime_limit' config values"));
    };

    let runtime_limit_secs = parse_seconds(limit).map_err(|e| invalid(id, e.to_string()))?;
    let address = entry.address.clone().unwrap_or_else(|| id.to_string());

    match kind.to_lowercase().as_str() {
        "linux" => {
            let (Some(port), Some(username), Some(commands)) =
                (entry.port, entry.username, entry.commands)
            else {
                return Err(invalid(id, "missing 'port', 'username' and/or 'commands' config values"));
            };
            if commands.is_empty() {
                return Err(invalid(id, "'commands' must list at least one shutdown command"));
            }
            Ok(HostRecord::new(id, address, HostKind::Ssh { port, username }, runtime_limit_secs, commands))
        }
        "windows" => {
            let (Some(username), Some(password)) = (entry.username, entry.password) else {
                return Err(invalid(id, "missing 'username' and/or 'password' config values"));
            };
            let commands = entry
                .commands
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_WINDOWS_SHUTDOWN.to_string()]);
            Ok(HostRecord::new(id, address, HostKind::Wmi { username, password }, runtime_limit_secs, commands))
        }
        other => Err(invalid(id, format!("'{}' is not 'linux' or 'windows'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Trigger;
    use std::time::Duration;

    const SAMPLE: &str = r#"
general:
  log_level: 1
  nut_name: eaton@localhost
  host_checkup:
    interval: 5m
  private_rsa_key: /etc/upswatch/id_rsa
  prometheus_exporter:
    enable: true
    port: 9200
  alerts:
    triggers:
      host_turned_off: true
      ups_status_change: true
    slack:
      enabled: true
      webhook_url: https://hooks.example.com/T000
hosts:
  nas01:
    type: Linux
    runtime_limit: 5m
    port: 22
    username: admin
    commands: ["sync", "poweroff"]
  win-dc:
    type: windows
    runtime_limit: 10m
    username: Administrator
    password: secret
  broken-linux:
    type: linux
    runtime_limit: 1m
    username: root
  mystery:
    type: solaris
    runtime_limit: 1m
  untimed:
    type: linux
    port: 22
    username: root
    commands: ["halt"]
  bad-limit:
    type: windows
    runtime_limit: 3 days
    username: a
    password: b
  bad-port:
    type: linux
    runtime_limit: 1m
    port: not-a-port
    username: root
    commands: ["halt"]
"#;

    #[test]
    fn loads_valid_hosts_and_rejects_the_rest() {
        let config = parse_config(SAMPLE).unwrap();

        let ids: Vec<_> = config.hosts.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["nas01", "win-dc"]);
        assert_eq!(config.rejected.len(), 5);
        assert!(config
            .rejected
            .iter()
            .all(|e| matches!(e, ConfigError::InvalidHost { .. })));

        let nas = &config.hosts[0];
        assert_eq!(nas.runtime_limit_secs, 300);
        assert_eq!(nas.kind, HostKind::Ssh { port: 22, username: "admin".into() });
        assert_eq!(nas.shutdown_commands, ["sync", "poweroff"]);
        assert_eq!(nas.address, "nas01");

        let dc = &config.hosts[1];
        assert_eq!(dc.runtime_limit_secs, 600);
        assert_eq!(dc.shutdown_commands, [DEFAULT_WINDOWS_SHUTDOWN]);
    }

    #[test]
    fn reads_general_settings_with_defaults() {
        let general = parse_config(SAMPLE).unwrap().general;

        assert_eq!(general.log_level.filter(), "warn");
        assert_eq!(general.host_checkup.interval.get(), Duration::from_secs(300));
        assert_eq!(general.ups_poll_interval.get(), Duration::from_secs(1));
        assert_eq!(general.command_timeout.get(), Duration::from_secs(30));
        assert!(general.prometheus_exporter.enable);
        assert_eq!(general.prometheus_exporter.port, 9200);
        assert_eq!(general.tools.upsc, "upsc");
        assert!(general.private_key.is_some());

        let triggers = &general.alerts.triggers;
        assert!(triggers.allows(Trigger::HostTurnedOff));
        assert!(!triggers.allows(Trigger::UnexpectedError));
        assert!(general.alerts.smtp.is_none());
        assert_eq!(general.alerts.slack.as_ref().map(|s| s.enabled), Some(true));
    }

    #[test]
    fn invalid_general_section_is_fatal() {
        let err = parse_config("general:\n  log_level: info\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let err = parse_config("general:\n  nut_name: ups\n  command_timeout: forever\n").unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn zero_periods_are_rejected() {
        for (doc, key) in [
            ("general:\n  nut_name: ups\n  host_checkup:\n    interval: 0s\n", "general.host_checkup.interval"),
            ("general:\n  nut_name: ups\n  ups_poll_interval: 0m\n", "general.ups_poll_interval"),
            ("general:\n  nut_name: ups\n  command_timeout: 0h\n", "general.command_timeout"),
        ] {
            let err = parse_config(doc).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSetting { key: k, .. } if k == key), "{doc:?}");
        }
    }

    #[test]
    fn hosts_section_is_optional() {
        let config = parse_config("general:\n  nut_name: ups\n").unwrap();
        assert!(config.hosts.is_empty());
        assert!(config.rejected.is_empty());
    }

    #[test]
    fn address_overrides_host_id() {
        let entry = HostEntry {
            kind: Some("linux".into()),
            runtime_limit: Some("2h".into()),
            address: Some("192.168.1.20".into()),
            port: Some(2222),
            username: Some("root".into()),
            commands: Some(vec!["poweroff".into()]),
            ..HostEntry::default()
        };
        let host = build_host("esxi", entry).unwrap();
        assert_eq!(host.address, "192.168.1.20");
        assert_eq!(host.runtime_limit_secs, 7200);
    }

    #[tokio::test]
    async fn load_config_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upswatch.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.hosts.len(), 2);

        let missing = load_config(&dir.path().join("nope.yaml")).await.unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
