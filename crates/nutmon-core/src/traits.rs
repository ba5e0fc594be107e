//! Trait abstraction over the UPS status source.
//!
//! This module provides the [`StatusSource`] trait that the poll loop
//! depends on, abstracting over the real TCP session and scripted mocks
//! for testing.

use async_trait::async_trait;

use nutmon_types::{Sample, VariableSet};

use crate::error::Result;

/// Trait abstracting the per-tick UPS queries.
///
/// Implemented by [`crate::session::UpsSession`] over a live daemon
/// connection and by [`crate::mock::MockSource`] for tests.
///
/// # Example
///
/// ```ignore
/// use nutmon_core::{Result, StatusSource};
///
/// async fn print_sample<S: StatusSource>(source: &mut S) -> Result<()> {
///     let sample = source.sample().await?;
///     println!("{}: {}", sample.status, sample.raw_charge);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StatusSource: Send {
    /// Read `ups.status` and `battery.charge` for one poll tick.
    async fn sample(&mut self) -> Result<Sample>;

    /// Fetch a fresh full variable snapshot.
    ///
    /// Observability only; the poll loop never gates a decision on this.
    async fn refresh_vars(&mut self) -> Result<VariableSet>;

    /// Re-establish the underlying connection after a session-fatal error.
    ///
    /// Sources without a reconnectable transport can keep the default,
    /// which is a no-op.
    async fn reconnect(&mut self) -> Result<()> {
        Ok(())
    }
}
