//! Status graph for opinion requests.
//!
//! Transitions are a fixed table rather than database rows: the graph is
//! part of the engine's contract and changing it is a code change, not a
//! data migration.

use crate::errors::AppError;

pub const UNASSIGNED: &str = "unassigned";
pub const ASSIGNED_TO_DEPARTMENT: &str = "assigned_to_department";
pub const ASSIGNED_TO_EXPERT: &str = "assigned_to_expert";
pub const IN_REVIEW: &str = "in_review";
pub const EXPERT_OPINION_SUBMITTED: &str = "expert_opinion_submitted";
pub const HEAD_REVIEW_PENDING: &str = "head_review_pending";
pub const HEAD_APPROVED: &str = "head_approved";
pub const REJECTED: &str = "rejected";
pub const ADDITIONAL_INFO_REQUESTED: &str = "additional_info_requested";
pub const PENDING_OTHER_DEPARTMENT: &str = "pending_other_department";
pub const COMPLETED: &str = "completed";

/// Allowed transitions, keyed by the current status. Staying in the current
/// status is always allowed and is not listed here; terminal statuses have
/// no outgoing edges at all.
const EDGES: &[(&str, &[&str])] = &[
    (
        UNASSIGNED,
        &[ASSIGNED_TO_DEPARTMENT, ASSIGNED_TO_EXPERT, PENDING_OTHER_DEPARTMENT],
    ),
    (
        ASSIGNED_TO_DEPARTMENT,
        &[ASSIGNED_TO_EXPERT, IN_REVIEW, ADDITIONAL_INFO_REQUESTED, PENDING_OTHER_DEPARTMENT],
    ),
    (
        ASSIGNED_TO_EXPERT,
        &[
            ASSIGNED_TO_DEPARTMENT,
            IN_REVIEW,
            ADDITIONAL_INFO_REQUESTED,
            PENDING_OTHER_DEPARTMENT,
        ],
    ),
    (
        IN_REVIEW,
        &[EXPERT_OPINION_SUBMITTED, ADDITIONAL_INFO_REQUESTED, PENDING_OTHER_DEPARTMENT],
    ),
    (
        EXPERT_OPINION_SUBMITTED,
        &[
            HEAD_REVIEW_PENDING,
            HEAD_APPROVED,
            REJECTED,
            ADDITIONAL_INFO_REQUESTED,
            PENDING_OTHER_DEPARTMENT,
        ],
    ),
    (HEAD_REVIEW_PENDING, &[HEAD_APPROVED, REJECTED]),
    (
        ADDITIONAL_INFO_REQUESTED,
        &[ASSIGNED_TO_DEPARTMENT, ASSIGNED_TO_EXPERT, IN_REVIEW, EXPERT_OPINION_SUBMITTED],
    ),
    (
        PENDING_OTHER_DEPARTMENT,
        &[
            UNASSIGNED,
            ASSIGNED_TO_DEPARTMENT,
            ASSIGNED_TO_EXPERT,
            IN_REVIEW,
            EXPERT_OPINION_SUBMITTED,
        ],
    ),
];

const TERMINAL: &[&str] = &[HEAD_APPROVED, REJECTED, COMPLETED];

pub fn is_terminal(status: &str) -> bool {
    TERMINAL.contains(&status)
}

/// Reject any mutation of a request that has reached a terminal status.
pub fn ensure_mutable(status: &str) -> Result<(), AppError> {
    if is_terminal(status) {
        return Err(AppError::InvalidState(format!(
            "request is in terminal status '{status}' and cannot be modified"
        )));
    }
    Ok(())
}

/// Check that the graph allows moving from `from` to `to`. A no-op move
/// (second assignment, second opinion) is always fine.
pub fn validate(from: &str, to: &str) -> Result<(), AppError> {
    if from == to {
        return Ok(());
    }
    let allowed = EDGES
        .iter()
        .find(|(name, _)| *name == from)
        .map(|(_, targets)| targets.contains(&to))
        .unwrap_or(false);
    if !allowed {
        return Err(AppError::InvalidState(format!(
            "transition from '{from}' to '{to}' is not allowed"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_can_be_assigned() {
        assert!(validate(UNASSIGNED, ASSIGNED_TO_DEPARTMENT).is_ok());
        assert!(validate(UNASSIGNED, ASSIGNED_TO_EXPERT).is_ok());
        assert!(validate(UNASSIGNED, IN_REVIEW).is_err());
    }

    #[test]
    fn both_assigned_statuses_can_enter_review() {
        assert!(validate(ASSIGNED_TO_DEPARTMENT, IN_REVIEW).is_ok());
        assert!(validate(ASSIGNED_TO_EXPERT, IN_REVIEW).is_ok());
    }

    #[test]
    fn staying_in_place_is_allowed() {
        assert!(validate(IN_REVIEW, IN_REVIEW).is_ok());
        assert!(validate(ASSIGNED_TO_DEPARTMENT, ASSIGNED_TO_DEPARTMENT).is_ok());
    }

    #[test]
    fn review_can_conclude_either_way() {
        assert!(validate(EXPERT_OPINION_SUBMITTED, HEAD_APPROVED).is_ok());
        assert!(validate(EXPERT_OPINION_SUBMITTED, REJECTED).is_ok());
        assert!(validate(HEAD_REVIEW_PENDING, HEAD_APPROVED).is_ok());
        assert!(validate(HEAD_REVIEW_PENDING, REJECTED).is_ok());
    }

    #[test]
    fn head_review_cannot_be_interrupted() {
        assert!(validate(HEAD_REVIEW_PENDING, ADDITIONAL_INFO_REQUESTED).is_err());
        assert!(validate(HEAD_REVIEW_PENDING, PENDING_OTHER_DEPARTMENT).is_err());
    }

    #[test]
    fn info_branch_returns_to_working_statuses_only() {
        assert!(validate(ADDITIONAL_INFO_REQUESTED, IN_REVIEW).is_ok());
        assert!(validate(ADDITIONAL_INFO_REQUESTED, EXPERT_OPINION_SUBMITTED).is_ok());
        assert!(validate(ADDITIONAL_INFO_REQUESTED, HEAD_REVIEW_PENDING).is_err());
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for terminal in [HEAD_APPROVED, REJECTED, COMPLETED] {
            assert!(is_terminal(terminal));
            assert!(ensure_mutable(terminal).is_err());
            assert!(validate(terminal, UNASSIGNED).is_err());
        }
        assert!(!is_terminal(IN_REVIEW));
        assert!(ensure_mutable(IN_REVIEW).is_ok());
    }
}
