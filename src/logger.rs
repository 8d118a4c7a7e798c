//! Console + file logging on top of `tracing`.
//!
//! Each logger writes to stdout and to `<YYYY-MM-DD-HHMM>-<tag>.log` inside the
//! log directory. Console lines are either plain (` LEVEL message`) or colored
//! per level when `LOG_PRETTY` is on; the file is always plain.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{dispatcher, Dispatch, Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Layer, Registry};

use crate::config::LogConfig;

pub const DEFAULT_LOG_DIR: &str = "logs";

const BEE: &str = "\u{1F41D}\u{1F50D}";
const RESET: &str = "\x1b[0m";

/// ` LEVEL message`, no color.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormat;

/// `[🐝🔍] LEVEL message` with the level colored by severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColoredFormat;

impl ColoredFormat {
    pub fn color(level: &Level) -> &'static str {
        match *level {
            Level::TRACE => "\x1b[0;35m",
            Level::DEBUG => "\x1b[0;34m",
            Level::INFO => "\x1b[0;32m",
            Level::WARN => "\x1b[0;33m",
            _ => "\x1b[0;31m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for PlainFormat
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
        write!(writer, " {} ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

impl<S, N> FormatEvent<S, N> for ColoredFormat
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
        let level = event.metadata().level();
        write!(writer, "[{BEE}] {}{}{RESET} ", Self::color(level), level)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Console layer: colored when `pretty`, plain otherwise.
pub fn console_layer<S, W>(pretty: bool, make_writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(make_writer);
    if pretty {
        layer.event_format(ColoredFormat).boxed()
    } else {
        layer.event_format(PlainFormat).boxed()
    }
}

/// A configured console + file logger.
///
/// Holds the file writer's worker guard; pending lines are flushed when the
/// logger is dropped, so keep it alive for as long as the process logs.
pub struct Logger {
    dispatch: Dispatch,
    file_path: PathBuf,
    _guard: WorkerGuard,
}

impl Logger {
    /// Builds a logger tagged `tag`. The directory is `config.path` if set,
    /// else `directory`, else `logs`.
    pub fn new(tag: &str, directory: Option<&Path>, config: &LogConfig) -> io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H%M").to_string();
        Self::with_stamp(tag, directory, config, &stamp)
    }

    fn with_stamp(
        tag: &str,
        directory: Option<&Path>,
        config: &LogConfig,
        stamp: &str,
    ) -> io::Result<Self> {
        let dir = config
            .path
            .clone()
            .or_else(|| directory.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
        fs::create_dir_all(&dir)?;

        let file_path = dir.join(format!("{stamp}-{tag}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer)
            .event_format(PlainFormat);

        let subscriber = Registry::default()
            .with(console_layer(config.pretty, io::stdout))
            .with(file_layer)
            .with(config.level);

        let logger = Self {
            dispatch: Dispatch::new(subscriber),
            file_path,
            _guard: guard,
        };

        dispatcher::with_default(&logger.dispatch, || {
            tracing::info!(
                "The [{BEE}] logs are buzzing to @{}",
                logger.file_path.display()
            );
        });

        Ok(logger)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Makes this logger the process-wide default and routes `log` crate
    /// records (actix-web, actix-server) through it. Can only succeed once.
    pub fn install(&self) -> Result<(), TryInitError> {
        self.dispatch.clone().try_init()
    }
}
