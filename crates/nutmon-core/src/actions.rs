//! Action dispatch interface for power-state transitions.
//!
//! The poll loop calls out to exactly four named actions when the UPS
//! crosses a status edge. Each call is fire-and-forget: the loop consumes
//! no return value, and failures are the implementation's concern. The
//! monitor moves on either way.

use async_trait::async_trait;

/// The device-control actions dispatched on power-state transitions.
///
/// Entering On Battery dispatches the *suspend load* pair (pause the
/// print, then drop the heater) as one combined transition action, not two
/// independently retried steps; entering Online with sufficient charge
/// dispatches the *resume load* pair in the reverse order.
#[async_trait]
pub trait PowerActions: Send + Sync {
    /// Pause the active print job.
    async fn suspend_print(&self);

    /// Turn the nozzle heater off.
    async fn suspend_heater(&self);

    /// Turn the nozzle heater back on.
    async fn resume_heater(&self);

    /// Resume the paused print job.
    async fn resume_print(&self);
}

/// Actions implementation that does nothing.
///
/// Useful for one-shot commands that poll without controlling a device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActions;

#[async_trait]
impl PowerActions for NoopActions {
    async fn suspend_print(&self) {}
    async fn suspend_heater(&self) {}
    async fn resume_heater(&self) {}
    async fn resume_print(&self) {}
}
