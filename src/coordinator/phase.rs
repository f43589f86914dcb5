//! Driver lifecycle phase tracking.

/// Tracks whether the driver has performed teardown.
///
/// `on_close` must run at most once per connection even when the driver
/// exits through several paths (close event, fatal error, cancellation, or a
/// failed `on_open`). The phase records the transition so repeated teardown
/// attempts become no-ops.
pub(super) struct DriverPhase {
    closed: bool,
}

impl DriverPhase {
    /// A freshly opened driver.
    pub(super) fn new() -> Self { Self { closed: false } }

    /// Record that teardown has run.
    pub(super) fn mark_closed(&mut self) { self.closed = true; }

    /// Whether teardown has already run.
    pub(super) fn is_closed(&self) -> bool { self.closed }
}
