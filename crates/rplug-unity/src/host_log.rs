//! The engine console as a [`HostLog`] sink.

use std::ffi::{c_int, CString};
use std::ptr::NonNull;

use tracing::Level;

use rplug_common::logging::{HostLog, HostRecord};

use crate::interfaces::{IUnityLog, LOG_TYPE_ERROR, LOG_TYPE_LOG, LOG_TYPE_WARNING};

/// Writes records through `IUnityLog::log`.
pub struct UnityLog {
    table: NonNull<IUnityLog>,
}

// SAFETY: the engine keeps the table alive while the plugin is loaded and
// accepts log calls from any thread.
unsafe impl Send for UnityLog {}
unsafe impl Sync for UnityLog {}

impl UnityLog {
    /// # Safety
    /// `table` must stay valid until the sink is detached.
    pub unsafe fn new(table: NonNull<IUnityLog>) -> Self {
        Self { table }
    }
}

/// Console entry type for a tracing level.
pub fn log_type(level: Level) -> c_int {
    match level {
        Level::ERROR => LOG_TYPE_ERROR,
        Level::WARN => LOG_TYPE_WARNING,
        _ => LOG_TYPE_LOG,
    }
}

fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', " ")).unwrap_or_default()
}

impl HostLog for UnityLog {
    fn write(&self, record: &HostRecord<'_>) {
        // SAFETY: see `new`.
        let table = unsafe { self.table.as_ref() };
        let Some(log) = table.log else {
            return;
        };

        let message = c_string(record.message);
        let file = c_string(record.file.unwrap_or_default());
        let line = record.line.map_or(0, |line| line as c_int);
        unsafe { log(log_type(record.level), message.as_ptr(), file.as_ptr(), line) };
    }
}
