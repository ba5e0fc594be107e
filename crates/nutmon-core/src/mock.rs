//! Mock status source and action sink for testing.
//!
//! This module provides a scripted [`MockSource`] that stands in for a
//! live daemon session in poll-loop tests, and a recording [`MockActions`]
//! that captures dispatched device-control calls for assertions.
//!
//! [`MockSource`] implements [`StatusSource`], so it can be used anywhere
//! a real session can.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use nutmon_types::{Sample, VariableSet};

use crate::actions::PowerActions;
use crate::error::{Error, Result};
use crate::traits::StatusSource;

/// One scripted poll tick.
#[derive(Debug, Clone)]
pub enum ScriptedTick {
    /// A successful sample with the given raw status and charge.
    Sample {
        /// Raw `ups.status` value.
        status: String,
        /// Raw `battery.charge` value.
        charge: String,
    },
    /// A session-fatal failure (connection closed).
    Fail,
}

impl ScriptedTick {
    /// A successful tick.
    pub fn sample(status: impl Into<String>, charge: impl Into<String>) -> Self {
        Self::Sample {
            status: status.into(),
            charge: charge.into(),
        }
    }

    /// A failed tick.
    pub fn fail() -> Self {
        Self::Fail
    }
}

/// A scripted status source.
///
/// Plays back a fixed sequence of ticks; once the script is exhausted it
/// cancels the associated token and reports [`Error::Cancelled`], ending
/// the monitor gracefully. [`MockSource::repeating`] instead yields the
/// same sample forever, for tests that drive cancellation themselves.
#[derive(Debug)]
pub struct MockSource {
    script: VecDeque<ScriptedTick>,
    repeating: Option<(String, String)>,
    vars: VariableSet,
    cancel: Option<CancellationToken>,
    reconnects: Arc<AtomicU32>,
}

impl MockSource {
    /// Create a source playing back `script`, cancelling `cancel` when the
    /// script runs out.
    pub fn new(script: Vec<ScriptedTick>, cancel: CancellationToken) -> Self {
        Self {
            script: script.into(),
            repeating: None,
            vars: VariableSet::new(),
            cancel: Some(cancel),
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Create a source that yields the same sample forever.
    pub fn repeating(status: impl Into<String>, charge: impl Into<String>) -> Self {
        Self {
            script: VecDeque::new(),
            repeating: Some((status.into(), charge.into())),
            vars: VariableSet::new(),
            cancel: None,
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Set the snapshot returned by `refresh_vars`.
    #[must_use]
    pub fn with_vars(mut self, vars: VariableSet) -> Self {
        self.vars = vars;
        self
    }

    /// Shared counter of `reconnect` calls, for assertions after the
    /// source has been moved into a monitor.
    #[must_use]
    pub fn reconnect_count(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.reconnects)
    }
}

#[async_trait]
impl StatusSource for MockSource {
    async fn sample(&mut self) -> Result<Sample> {
        if let Some((status, charge)) = &self.repeating {
            return Ok(Sample::from_raw(status.clone(), charge.clone()));
        }
        match self.script.pop_front() {
            Some(ScriptedTick::Sample { status, charge }) => Ok(Sample::from_raw(status, charge)),
            Some(ScriptedTick::Fail) => Err(Error::connection_closed("GET VAR")),
            None => {
                if let Some(cancel) = &self.cancel {
                    cancel.cancel();
                }
                Err(Error::Cancelled)
            }
        }
    }

    async fn refresh_vars(&mut self) -> Result<VariableSet> {
        Ok(self.vars.clone())
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The four device-control actions, as recorded calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCall {
    SuspendPrint,
    SuspendHeater,
    ResumeHeater,
    ResumePrint,
}

/// An action sink that records every dispatched call.
///
/// Clones share the same call log, so a clone can be kept for assertions
/// after the original moves into a monitor.
#[derive(Debug, Clone, Default)]
pub struct MockActions {
    calls: Arc<Mutex<Vec<ActionCall>>>,
}

impl MockActions {
    fn record(&self, call: ActionCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// The calls dispatched so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PowerActions for MockActions {
    async fn suspend_print(&self) {
        self.record(ActionCall::SuspendPrint);
    }

    async fn suspend_heater(&self) {
        self.record(ActionCall::SuspendHeater);
    }

    async fn resume_heater(&self) {
        self.record(ActionCall::ResumeHeater);
    }

    async fn resume_print(&self) {
        self.record(ActionCall::ResumePrint);
    }
}
