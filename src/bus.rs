//! Logger adapter for message-bus libraries.

use crate::attr::{self, Attr};
use crate::logger::Logger;
use std::collections::BTreeMap;
use std::error::Error;

/// Loosely typed fields handed over by the bus library.
pub type LogFields = BTreeMap<String, serde_json::Value>;

/// Logging interface expected by message-bus publishers and subscribers.
pub trait BusLogger: Send + Sync {
    fn error(&self, msg: &str, err: &(dyn Error + '_), fields: &LogFields);
    fn info(&self, msg: &str, fields: &LogFields);
    fn debug(&self, msg: &str, fields: &LogFields);
    fn trace(&self, msg: &str, fields: &LogFields);
    fn with(&self, fields: &LogFields) -> Box<dyn BusLogger>;
}

/// [`BusLogger`] writing through a [`Logger`].
#[derive(Clone, Debug)]
pub struct BusAdapter {
    logger: Logger,
}

impl BusAdapter {
    pub fn new(logger: Logger) -> Self {
        BusAdapter { logger }
    }
}

fn to_attrs(fields: &LogFields) -> Vec<Attr> {
    fields
        .iter()
        .map(|(key, value)| attr::any(key.as_str(), value.clone()))
        .collect()
}

impl BusLogger for BusAdapter {
    fn error(&self, msg: &str, err: &(dyn Error + '_), fields: &LogFields) {
        let mut attrs = to_attrs(fields);
        attrs.push(attr::error(err));
        self.logger.error(msg, &attrs);
    }

    fn info(&self, msg: &str, fields: &LogFields) {
        self.logger.info(msg, &to_attrs(fields));
    }

    fn debug(&self, msg: &str, fields: &LogFields) {
        self.logger.debug(msg, &to_attrs(fields));
    }

    fn trace(&self, msg: &str, fields: &LogFields) {
        self.logger.info(msg, &to_attrs(fields));
    }

    fn with(&self, fields: &LogFields) -> Box<dyn BusLogger> {
        Box::new(BusAdapter {
            logger: self.logger.with(&to_attrs(fields)),
        })
    }
}
