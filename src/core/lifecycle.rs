//! Request lifecycle state machine.
//!
//! ```text
//! pending ──assign──▶ in-progress ──▶ resolved
//!    │  ◀──unassign──      │
//!    ▼                     ▼
//! cancelled ◀──────────────┘
//! ```
//!
//! Every operation takes a snapshot and returns a new one; a rejected
//! operation leaves the input untouched. `resolved` and `cancelled` are
//! terminal and reject every operation with
//! [`EngineError::TerminalStateViolation`].
use chrono::{DateTime, Utc};

use crate::core::error::{EngineError, EngineResult};
use crate::models::{Request, RequestStatus};

/// Whether the transition table permits `from → to`
///
/// `pending → in-progress` is listed here but is only reachable through
/// [`assign_volunteer`], which supplies the volunteer the target state needs.
pub fn is_permitted(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress) | (Pending, Cancelled) | (InProgress, Resolved) | (InProgress, Cancelled)
    )
}

fn reject_terminal(request: &Request) -> EngineResult<()> {
    if request.status.is_terminal() {
        return Err(EngineError::TerminalStateViolation { status: request.status });
    }
    Ok(())
}

/// Assign a volunteer to a pending request
///
/// Moves the request to `in-progress` and stamps `assigned_at`.
pub fn assign_volunteer(request: &Request, volunteer_id: &str, at: DateTime<Utc>) -> EngineResult<Request> {
    reject_terminal(request)?;

    if request.status != RequestStatus::Pending {
        return Err(EngineError::invalid(
            request.status,
            RequestStatus::InProgress,
            format!(
                "already assigned to {}",
                request.assigned_volunteer_id.as_deref().unwrap_or("another volunteer")
            ),
        ));
    }

    let volunteer_id = volunteer_id.trim();
    if volunteer_id.is_empty() {
        return Err(EngineError::invalid(
            request.status,
            RequestStatus::InProgress,
            "volunteer id must not be empty",
        ));
    }

    let mut next = request.clone();
    next.status = RequestStatus::InProgress;
    next.assigned_volunteer_id = Some(volunteer_id.to_string());
    next.assigned_at = Some(at);
    Ok(next)
}

/// Move a request to `new_status` following the transition table
///
/// Cancelling clears any assignment; resolving stamps `resolved_at` and
/// keeps the volunteer on record.
pub fn transition(request: &Request, new_status: RequestStatus, at: DateTime<Utc>) -> EngineResult<Request> {
    reject_terminal(request)?;

    // in-progress needs a volunteer, which only assign_volunteer supplies
    if new_status == RequestStatus::InProgress && request.status == RequestStatus::Pending {
        return Err(EngineError::invalid(
            request.status,
            new_status,
            "a volunteer must be assigned to start progress",
        ));
    }
    if !is_permitted(request.status, new_status) {
        return Err(EngineError::invalid(request.status, new_status, "not permitted by the transition table"));
    }

    let mut next = request.clone();
    match new_status {
        RequestStatus::Resolved => {
            next.resolved_at = Some(at);
        }
        RequestStatus::Cancelled => {
            next.assigned_volunteer_id = None;
            next.assigned_at = None;
        }
        RequestStatus::Pending | RequestStatus::InProgress => {}
    }
    next.status = new_status;
    Ok(next)
}

/// Return an in-progress request to `pending`, clearing its volunteer
///
/// Used when a volunteer declines before acting.
pub fn unassign(request: &Request) -> EngineResult<Request> {
    reject_terminal(request)?;

    if request.status != RequestStatus::InProgress {
        return Err(EngineError::invalid(request.status, RequestStatus::Pending, "no volunteer to release"));
    }

    let mut next = request.clone();
    next.status = RequestStatus::Pending;
    next.assigned_volunteer_id = None;
    next.assigned_at = None;
    Ok(next)
}
