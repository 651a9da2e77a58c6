// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! A minimal logging abstraction for bootstrap-phase messages (before
//! the full `tracing-subscriber` pipeline in `normalizer`'s
//! infrastructure layer is initialized). Trait-based so tests can
//! assert on captured output instead of stdout.

pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::with_prefix("bootstrap")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CapturingLogger {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl BootstrapLogger for CapturingLogger {
        fn error(&self, m: &str) {
            self.messages.lock().unwrap().push(format!("ERROR {m}"));
        }
        fn warn(&self, m: &str) {
            self.messages.lock().unwrap().push(format!("WARN {m}"));
        }
        fn info(&self, m: &str) {
            self.messages.lock().unwrap().push(format!("INFO {m}"));
        }
        fn debug(&self, m: &str) {
            self.messages.lock().unwrap().push(format!("DEBUG {m}"));
        }
    }

    #[test]
    fn noop_logger_discards_everything() {
        let logger = NoOpLogger;
        logger.error("boom");
        logger.info("fine");
    }

    #[test]
    fn capturing_logger_records_in_order() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let logger = CapturingLogger { messages: messages.clone() };
        logger.info("starting up");
        logger.warn("missing optional config");
        assert_eq!(*messages.lock().unwrap(), vec!["INFO starting up", "WARN missing optional config"]);
    }
}
