pub mod attr;
pub mod context;
pub mod error;
pub mod handler;
pub mod level;
pub mod record;
pub mod schema;

pub mod fanout;
pub mod json;
pub mod memory;
pub mod trace;

pub mod env;
pub mod init;
pub mod layer;
pub mod logger;

pub mod bus;
pub mod mask;
pub mod sql;

#[cfg(feature = "http-transport")]
pub mod transport;

pub use attr::{Attr, AttrValue};
pub use context::{Context, SpanContext};
pub use level::Level;
pub use logger::{ContextLogger, Logger, LoggerConfig};
