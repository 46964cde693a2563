use std::fmt::{self as stdfmt, Write as _};

use parking_lot::{const_rwlock, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Environment variable consulted before the configured default filter.
pub const LOG_ENV: &str = "RPLUG_LOG";

/// One formatted event, as handed to a [`HostLog`].
#[derive(Debug, Clone, Copy)]
pub struct HostRecord<'a> {
    pub level: Level,
    pub target: &'a str,
    /// The message followed by any other fields as ` name=value`.
    pub message: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
}

/// A log sink owned by the process hosting the plugin, such as an engine console.
pub trait HostLog: Send + Sync {
    fn write(&self, record: &HostRecord<'_>);
}

static HOST_LOG: RwLock<Option<Box<dyn HostLog>>> = const_rwlock(None);

/// Route events to `log` instead of stderr until [`detach_host_log`].
pub fn attach_host_log(log: impl HostLog + 'static) {
    *HOST_LOG.write() = Some(Box::new(log));
}

/// Drop the host sink; events go back to stderr.
pub fn detach_host_log() {
    HOST_LOG.write().take();
}

pub fn host_log_attached() -> bool {
    HOST_LOG.read().is_some()
}

/// Forwards events to the attached [`HostLog`], if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostLogLayer;

impl<S: Subscriber> Layer<S> for HostLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let guard = HOST_LOG.read();
        let Some(log) = guard.as_ref() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        visitor.message.push_str(&visitor.fields);

        let meta = event.metadata();
        log.write(&HostRecord {
            level: *meta.level(),
            target: meta.target(),
            message: &visitor.message,
            file: meta.file(),
            line: meta.line(),
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: stdfmt::Arguments<'_>) {
        let _ = write!(self.fields, " {}={}", name, value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

/// Initialize structured logging with environment filter.
/// Set RPLUG_LOG=debug (or trace, info, warn, error) for verbosity control;
/// otherwise `default_filter` applies.
///
/// Output goes to stderr, or to the host sink while one is attached.
///
/// The plugin can be loaded more than once into the same host process, so a
/// subscriber that is already installed is left in place.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let console = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr.with_filter(|_| !host_log_attached()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(HostLogLayer)
        .try_init();
}
