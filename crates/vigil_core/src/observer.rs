//! Traits the host implements to feed and observe the monitor.

use crate::pass::Affiliation;
use glam::Vec3;

/// Receives conflict transitions for objects it owns.
///
/// `on_enter`/`on_leave` carry the counterpart handles and their
/// affiliation labels, index-aligned. `on_conflict_ended` fires when an
/// object's last active conflict ends and carries only the subject.
/// Delivery order across owners is unspecified, but every owner of an
/// event is notified before the next pass can change conflict state.
pub trait ConflictObserver<H> {
    fn on_enter(&self, subject: &H, counterparts: &[H], affiliations: &[Affiliation]);
    fn on_leave(&self, subject: &H, counterparts: &[H], affiliations: &[Affiliation]);
    fn on_conflict_ended(&self, subject: &H);
}

/// Supplies current positions when the registry builds a pass snapshot.
pub trait PositionSource<H> {
    /// `None` lets the registry fall back to the handle's last known
    /// position instead of failing the tick.
    fn position_of(&self, handle: &H) -> Option<Vec3>;
}

impl<H, F> PositionSource<H> for F
where
    F: Fn(&H) -> Option<Vec3>,
{
    fn position_of(&self, handle: &H) -> Option<Vec3> {
        self(handle)
    }
}
