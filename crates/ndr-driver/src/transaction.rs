//! Command transactions
//!
//! A transaction binds one command spec to concrete values, is sent once,
//! and records how it went. Failures are kept as text rather than returned,
//! so a caller issuing many transactions can carry on past a bad one.

use std::time::Duration;

use ndr_protocol::keys::INDEX;
use ndr_protocol::{CachedConfiguration, CommandSpec, ConfigValue, Configuration, Direction};
use tracing::warn;

use crate::link::{lock_link, SharedLink};

/// One command bound to values, sent at most once
#[derive(Debug, Clone)]
pub struct CommandTransaction<'s> {
    spec: &'s CommandSpec,
    direction: Direction,
    params: Configuration,
    timeout: Option<Duration>,
    sent: bool,
    success: bool,
    errors: Vec<String>,
    response: CachedConfiguration,
}

impl<'s> CommandTransaction<'s> {
    /// Bind `params` to `spec`
    ///
    /// When `index` is given it is bound as the `index` parameter. Missing
    /// required parameters are reported when the transaction is sent.
    pub fn new(
        spec: &'s CommandSpec,
        direction: Direction,
        mut params: Configuration,
        index: Option<u32>,
    ) -> Self {
        if let Some(index) = index {
            params.insert(INDEX.to_string(), ConfigValue::Int(index as i64));
        }
        Self {
            spec,
            direction,
            params,
            timeout: None,
            sent: false,
            success: false,
            errors: Vec::new(),
            response: CachedConfiguration::new(),
        }
    }

    /// Query transaction for the component at `index`
    pub fn query(spec: &'s CommandSpec, index: Option<u32>) -> Self {
        Self::new(spec, Direction::Query, Configuration::new(), index)
    }

    /// Set transaction carrying `params`
    pub fn set(spec: &'s CommandSpec, params: Configuration, index: Option<u32>) -> Self {
        Self::new(spec, Direction::Set, params, index)
    }

    /// Override the link's reply timeout for this transaction
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send the command and wait for its reply
    ///
    /// Returns whether the transaction succeeded. A transaction is only
    /// ever sent once; later calls return the recorded outcome.
    pub fn send(&mut self, link: &SharedLink) -> bool {
        if self.sent {
            return self.success;
        }
        self.sent = true;

        let result = lock_link(link).execute(self.spec, self.direction, &self.params, self.timeout);
        match result {
            Ok(response) => {
                self.success = true;
                self.response = response;
            }
            Err(e) => {
                warn!(
                    mnemonic = self.spec.mnemonic,
                    direction = self.direction.name(),
                    "Command failed: {}",
                    e
                );
                self.errors.push(format!("{}: {}", self.spec.mnemonic, e));
            }
        }
        self.success
    }

    pub fn spec(&self) -> &CommandSpec {
        self.spec
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Values bound to the command
    pub fn params(&self) -> &Configuration {
        &self.params
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Errors recorded while sending
    pub fn error_info(&self) -> &[String] {
        &self.errors
    }

    /// Parsed reply fields; empty for sets and failed transactions
    pub fn response_info(&self) -> &CachedConfiguration {
        &self.response
    }

    /// Consume the transaction, keeping its reply
    pub fn into_response(self) -> CachedConfiguration {
        self.response
    }
}
