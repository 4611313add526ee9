//! Field names of the Cloud Logging structured log format.
//!
//! See <https://cloud.google.com/logging/docs/structured-logging>.

use crate::attr::{Attr, AttrValue};
use crate::level::Level;

/// Built-in keys produced by the JSON handler before remapping.
pub const LEVEL_KEY: &str = "level";
pub const TIME_KEY: &str = "time";
pub const MESSAGE_KEY: &str = "msg";
pub const SOURCE_KEY: &str = "source";

pub const SEVERITY_KEY: &str = "severity";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const CLOUD_MESSAGE_KEY: &str = "message";
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/trace_sampled";
pub const LABELS_KEY: &str = "logging.googleapis.com/labels";
pub const SERVICE_CONTEXT_KEY: &str = "serviceContext";
pub const STACKTRACE_KEY: &str = "stacktrace";

/// Rename built-in keys to the Cloud Logging names and spell the level as a
/// `LogSeverity`.
pub fn cloud_replacer(mut attr: Attr) -> Attr {
    match attr.key.as_str() {
        LEVEL_KEY => {
            attr.key = SEVERITY_KEY.to_string();
            if let AttrValue::Str(name) = &attr.value {
                if let Ok(level) = name.parse::<Level>() {
                    attr.value = AttrValue::Str(level.severity().to_string());
                }
            }
        }
        TIME_KEY => attr.key = TIMESTAMP_KEY.to_string(),
        MESSAGE_KEY => attr.key = CLOUD_MESSAGE_KEY.to_string(),
        SOURCE_KEY => attr.key = SOURCE_LOCATION_KEY.to_string(),
        _ => {}
    }
    attr
}
