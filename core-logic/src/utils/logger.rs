use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields, MakeWriter},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Target for the human-facing race lines (banner, pre/post, errors, summary).
pub const RESULT_TARGET: &str = "race_result";

const LOG_DIR: &str = "logs";

pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all(LOG_DIR).ok();

    let file_appender = tracing_appender::rolling::hourly(LOG_DIR, "race");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Console: race lines only, unless RUST_LOG asks for more
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("error,{}=info", RESULT_TARGET)),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer(non_blocking))
        .with(console_layer)
        .try_init();

    match installed {
        // Guard MUST be kept alive by caller
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

/// File layer: engine debug output next to the race lines, prefixed with
/// the enclosing `unit` span.
fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(RESULT_TARGET, tracing::Level::INFO)
        .with_target("evm_racer", tracing::Level::DEBUG)
        .with_default(tracing::Level::WARN);

    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter)
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

const STATUS_COLORS: [(&str, Color); 3] = [
    ("SUCCESS", Color::LightGreen),
    ("FAILED", Color::LightRed),
    ("PENDING", Color::Yellow),
];

/// Paint the first status word found in a race line.
pub(crate) fn colorize_status(msg: &str) -> String {
    for (word, color) in STATUS_COLORS {
        if msg.contains(word) {
            let painted = Style::new().fg(color).bold().paint(word);
            return msg.replace(word, &painted.to_string());
        }
    }
    msg.to_string()
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut msg_visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut msg_visitor);

        write!(writer, "{}", colorize_status(&msg_visitor.message))?;
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
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
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;

        // Prefix with the enclosing unit span, e.g. `unit{label="2"}: `
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        let mut msg_visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut msg_visitor);
        writeln!(writer, "{}", msg_visitor.message)
    }
}
