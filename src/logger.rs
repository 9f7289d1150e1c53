//! Diagnostics for relinking.
//!
//! Messages always go to the `log` facade. A [`Logger`] installed with
//! [`Relinker::log`](crate::Relinker::log) receives the same messages, which
//! lets an application route them somewhere the facade is not wired up.

use std::{fmt, sync::Arc};

/// A sink for relinking diagnostics.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        (self)(message)
    }
}

/// Fan-out of one diagnostic to the `log` facade and the optional user logger.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    logger: Option<Arc<dyn Logger>>,
}

impl Diagnostics {
    pub(crate) fn new(logger: Option<Arc<dyn Logger>>) -> Self {
        Self { logger }
    }

    pub(crate) fn emit(&self, args: fmt::Arguments<'_>) {
        log::debug!("{}", args);
        if let Some(logger) = &self.logger {
            logger.log(&args.to_string());
        }
    }

    /// Like [`emit`](Self::emit), but at error level on the facade.
    pub(crate) fn fatal(&self, args: fmt::Arguments<'_>) {
        log::error!("{}", args);
        if let Some(logger) = &self.logger {
            logger.log(&args.to_string());
        }
    }
}

impl Logger for Diagnostics {
    fn log(&self, message: &str) {
        self.emit(format_args!("{message}"));
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
