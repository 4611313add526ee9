//! Logger adapter for SQL query layers.

use crate::attr;
use crate::context::Context;
use crate::logger::Logger;
use std::error::Error;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Verbosity of the SQL adapter. Each level includes the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SqlLogLevel {
    Silent = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
}

/// Marker error for a query that matched no rows.
///
/// [`SqlLogger`] recognises it anywhere in an error's `source()` chain.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("record not found")]
pub struct RecordNotFound;

/// Logging interface expected by SQL query layers.
pub trait QueryLogger: Send + Sync {
    /// Copy of this logger at another verbosity.
    fn log_mode(&self, level: SqlLogLevel) -> Box<dyn QueryLogger>;
    fn info(&self, ctx: &Context, msg: &dyn Display);
    fn warn(&self, ctx: &Context, msg: &dyn Display);
    fn error(&self, ctx: &Context, msg: &dyn Display);
    /// Report a finished query that started at `begin`. `query` is only
    /// called when the query is actually logged.
    fn trace(
        &self,
        ctx: &Context,
        begin: Instant,
        query: &mut dyn FnMut() -> (String, i64),
        err: Option<&(dyn Error + 'static)>,
    );
}

/// [`QueryLogger`] writing through a [`Logger`].
///
/// Defaults: [`SqlLogLevel::Warn`], 200 ms slow-query threshold and
/// not-found errors ignored.
#[derive(Clone, Debug)]
pub struct SqlLogger {
    pub logger: Logger,
    pub level: SqlLogLevel,
    /// Queries slower than this are logged at Warn. Zero disables the check.
    pub slow_threshold: Duration,
    pub ignore_record_not_found: bool,
}

impl SqlLogger {
    pub fn new(logger: Logger) -> Self {
        SqlLogger {
            logger,
            level: SqlLogLevel::Warn,
            slow_threshold: Duration::from_millis(200),
            ignore_record_not_found: true,
        }
    }

    fn is_ignored(&self, err: &(dyn Error + 'static)) -> bool {
        self.ignore_record_not_found && is_record_not_found(err)
    }
}

impl QueryLogger for SqlLogger {
    fn log_mode(&self, level: SqlLogLevel) -> Box<dyn QueryLogger> {
        Box::new(SqlLogger {
            level,
            ..self.clone()
        })
    }

    fn info(&self, ctx: &Context, msg: &dyn Display) {
        if self.level >= SqlLogLevel::Info {
            self.logger.debug_ctx(ctx, &msg.to_string(), &[]);
        }
    }

    fn warn(&self, ctx: &Context, msg: &dyn Display) {
        if self.level >= SqlLogLevel::Warn {
            self.logger.warn_ctx(ctx, &msg.to_string(), &[]);
        }
    }

    fn error(&self, ctx: &Context, msg: &dyn Display) {
        if self.level >= SqlLogLevel::Error {
            self.logger.error_ctx(ctx, &msg.to_string(), &[]);
        }
    }

    fn trace(
        &self,
        ctx: &Context,
        begin: Instant,
        query: &mut dyn FnMut() -> (String, i64),
        err: Option<&(dyn Error + 'static)>,
    ) {
        if self.level <= SqlLogLevel::Silent {
            return;
        }
        let elapsed = begin.elapsed();

        match err {
            Some(err) if self.level >= SqlLogLevel::Error && !self.is_ignored(err) => {
                let (sql, rows) = query();
                self.logger.error_ctx(
                    ctx,
                    "sql error trace",
                    &[
                        attr::error(err),
                        attr::duration("elapsed", elapsed),
                        attr::int64("rows", rows),
                        attr::string("sql", sql),
                    ],
                );
            }
            _ if !self.slow_threshold.is_zero()
                && elapsed > self.slow_threshold
                && self.level >= SqlLogLevel::Warn =>
            {
                let (sql, rows) = query();
                self.logger.warn_ctx(
                    ctx,
                    "sql slow query trace",
                    &[
                        attr::duration("elapsed", elapsed),
                        attr::int64("rows", rows),
                        attr::string("sql", sql),
                    ],
                );
            }
            _ if self.level >= SqlLogLevel::Info => {
                let (sql, rows) = query();
                self.logger.debug_ctx(
                    ctx,
                    "sql debug trace",
                    &[
                        attr::duration("elapsed", elapsed),
                        attr::int64("rows", rows),
                        attr::string("sql", sql),
                    ],
                );
            }
            _ => {}
        }
    }
}

/// Whether `err` or any of its sources is [`RecordNotFound`].
pub fn is_record_not_found(err: &(dyn Error + 'static)) -> bool {
    std::iter::successors(Some(err), |&e| e.source()).any(|e| e.is::<RecordNotFound>())
}
