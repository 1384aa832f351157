/// Control plane -> data plane messages for one transport engine.
///
/// Queued per engine and applied at the next block boundary, in the order they
/// were issued. Record arming does not go through the queue, see
/// [`crate::transport::TrackHandle::arm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    /// Frames subtracted from the write address while recording
    SetLatency(u32),
    /// Absolute tape time, drops any ramp
    SetPosition(f64),
    /// Linear ramp from the current position, in real seconds
    RampPosition { target: f64, duration_seconds: f64 },
    /// Motor run-up: jump to `from`, then advance one tape second per second
    Forward { from: f64, horizon_seconds: f64 },
    /// Motor stop: drop any ramp and freeze at the given tape time
    Hold(f64),
}
