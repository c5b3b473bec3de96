//! Tracing subscriber setup and the `YYYY-MM-DD HH:MM:SS [LEVEL] message` formatter.

use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::types::level_filter;

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
fn write_timestamp(w: &mut Writer<'_>) -> fmt::Result {
    #[cfg(unix)]
    {
        // SAFETY: localtime_r only writes into the zeroed `tm` we own
        let tm = unsafe {
            let now = libc::time(std::ptr::null_mut());
            let mut tm: libc::tm = std::mem::zeroed();
            libc::localtime_r(&now, &mut tm);
            tm
        };
        write!(
            w,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            tm.tm_year + 1900,
            tm.tm_mon + 1,
            tm.tm_mday,
            tm.tm_hour,
            tm.tm_min,
            tm.tm_sec
        )
    }

    #[cfg(not(unix))]
    {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "\x1b[2m",
        Level::DEBUG => "\x1b[34m",
        Level::INFO => "\x1b[32m",
        Level::WARN => "\x1b[33m",
        Level::ERROR => "\x1b[31m",
    }
}

/// `YYYY-MM-DD HH:MM:SS [LEVEL] message`, level colored on a terminal.
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut w: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        write_timestamp(&mut w)?;

        let level = event.metadata().level();
        if w.has_ansi_escapes() {
            write!(w, " {}[{}]\x1b[0m ", level_color(level), level)?;
        } else {
            write!(w, " [{}] ", level)?;
        }

        ctx.field_format().format_fields(w.by_ref(), event)?;
        writeln!(w)
    }
}

/// Pick the effective filter.
/// Priority: 1. --log-level flag, 2. LOG_LEVEL env, 3. config file, 4. info
pub fn resolve_filter(flag: Option<&str>, env: Option<&str>, config: &'static str) -> &'static str {
    for candidate in [flag, env].into_iter().flatten() {
        match level_filter(candidate) {
            Some(filter) => return filter,
            None => eprintln!(
                "Invalid log level '{}'. Valid levels: TRACE, DEBUG, INFO, WARN, ERROR",
                candidate
            ),
        }
    }
    config
}

pub fn init_tracing(filter: &str) {
    use std::io::IsTerminal;
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(std::io::stdout().is_terminal())
                .with_target(false)
                .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
                .event_format(LineFormat),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env_beats_config() {
        assert_eq!(resolve_filter(Some("DEBUG"), Some("error"), "warn"), "debug");
        assert_eq!(resolve_filter(None, Some("error"), "warn"), "error");
        assert_eq!(resolve_filter(None, None, "warn"), "warn");
    }

    #[test]
    fn invalid_values_fall_through() {
        assert_eq!(resolve_filter(Some("loud"), Some("trace"), "info"), "trace");
        assert_eq!(resolve_filter(Some("loud"), None, "error"), "error");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn line_format_is_timestamp_level_message() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .event_format(LineFormat)
            .finish();

        tracing::subscriber::with_default(subscriber, || tracing::warn!("UPS on battery"));

        let line = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let (stamp, rest) = line.split_at(19);
        assert_eq!(rest, " [WARN] UPS on battery\n");
        assert_eq!(stamp.as_bytes()[4], b'-');
        assert_eq!(stamp.as_bytes()[10], b' ');
        assert_eq!(stamp.as_bytes()[13], b':');
    }
}
