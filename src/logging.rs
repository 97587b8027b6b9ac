use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// A tracing event formatter that colors the whole line by level.
///
/// Only the event fields are printed: no timestamps, targets or level
/// names. Warnings about skipped files stand out in yellow among the
/// regular progress lines.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // format_fields writes directly, so buffer to color the full line.
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        writeln!(writer, "{}", colorize(event.metadata().level(), buffer))
    }
}

fn colorize(level: &Level, line: String) -> ColoredString {
    match *level {
        Level::INFO => line.white(),
        Level::WARN => line.yellow(),
        Level::ERROR => line.red(),
        Level::DEBUG => line.blue(),
        Level::TRACE => line.purple(),
    }
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. Logs go to stderr so report CSV and
/// dumps on stdout stay clean.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(ColorizedFormatter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "info");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    fn test_colorize_keeps_text() {
        colored::control::set_override(false);
        let line = colorize(&Level::WARN, "Skipping file".to_string());
        assert_eq!(line.to_string(), "Skipping file");
    }
}
