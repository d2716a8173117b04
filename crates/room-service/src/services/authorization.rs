//! Group-based authorization policy for privileged actions.
//!
//! Room creation, join, leave, and extension require no privileged group;
//! authentication only changes the room kind (guest vs unlimited). The
//! actions below are the ones gated on group membership, consolidated here
//! instead of repeated per handler.

/// Groups granting full administrative access.
pub const PRIVILEGED_GROUPS: &[&str] = &["admin", "meet-admin"];

/// Group granting recording access in addition to the privileged set.
pub const RECORDING_GROUP: &str = "recording";

/// Privileged actions gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    /// Forcibly remove a participant from the media session.
    RemoveParticipant,

    /// Start a composite recording.
    StartRecording,

    /// Stop a composite recording.
    StopRecording,

    /// Deactivate a room through the admin path.
    DeactivateRoom,
}

impl AdminAction {
    /// Whether the action is a recording operation, which accepts the
    /// dedicated recording group.
    fn accepts_recording_group(self) -> bool {
        matches!(self, AdminAction::StartRecording | AdminAction::StopRecording)
    }
}

/// Decide whether a caller with the given group memberships may perform the
/// action.
///
/// Pure function of (groups, action): the caller is authorized if their
/// group set intersects `{admin, meet-admin}`; recording actions
/// additionally accept the `recording` group.
pub fn is_authorized(groups: &[String], action: AdminAction) -> bool {
    let privileged = groups
        .iter()
        .any(|g| PRIVILEGED_GROUPS.contains(&g.as_str()));

    if privileged {
        return true;
    }

    action.accepts_recording_group() && groups.iter().any(|g| g == RECORDING_GROUP)
}
