//! Booking statuses and the role-gated transitions between them.
//!
//! ```text
//!              approve (owner)         activate (owner|system)      complete (owner|system)
//!   pending ───────────────────▶ confirmed ───────────────────▶ active ───────────────────▶ completed
//!      │                            │                             │
//!      │ decline (owner)            │ cancel (renter|owner)       │ cancel (owner)
//!      │ cancel (renter)            │                             │
//!      └────────────────────────────┴─────────────────────────────┴──────────────────────▶ cancelled
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::{BookingError, BookingResult};

/// Lifecycle status of a booking
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Default,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the renter, awaiting the owner
    #[default]
    Pending,
    /// Approved by the owner
    Confirmed,
    /// Rental period is running
    Active,
    /// Rental period is over
    Completed,
    /// Declined or cancelled
    Cancelled,
}

impl BookingStatus {
    /// `completed` and `cancelled` accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether a booking in this status blocks its dates in the availability index
    pub fn holds_reservation(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active
        )
    }
}

/// Something an actor asks to happen to a booking
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitionEvent {
    Approve,
    Decline,
    Cancel,
    Activate,
    Complete,
}

/// Who is asking. `System` is the time-driven sweep.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorRole {
    Renter,
    Owner,
    System,
}

/// One row of the transition table
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: BookingStatus,
    pub event: TransitionEvent,
    pub actors: &'static [ActorRole],
    pub to: BookingStatus,
}

const TRANSITIONS: &[Transition] = &[
    Transition {
        from: BookingStatus::Pending,
        event: TransitionEvent::Approve,
        actors: &[ActorRole::Owner],
        to: BookingStatus::Confirmed,
    },
    Transition {
        from: BookingStatus::Pending,
        event: TransitionEvent::Decline,
        actors: &[ActorRole::Owner],
        to: BookingStatus::Cancelled,
    },
    Transition {
        from: BookingStatus::Pending,
        event: TransitionEvent::Cancel,
        actors: &[ActorRole::Renter],
        to: BookingStatus::Cancelled,
    },
    Transition {
        from: BookingStatus::Confirmed,
        event: TransitionEvent::Cancel,
        actors: &[ActorRole::Renter, ActorRole::Owner],
        to: BookingStatus::Cancelled,
    },
    Transition {
        from: BookingStatus::Confirmed,
        event: TransitionEvent::Activate,
        actors: &[ActorRole::Owner, ActorRole::System],
        to: BookingStatus::Active,
    },
    Transition {
        from: BookingStatus::Active,
        event: TransitionEvent::Complete,
        actors: &[ActorRole::Owner, ActorRole::System],
        to: BookingStatus::Completed,
    },
    Transition {
        from: BookingStatus::Active,
        event: TransitionEvent::Cancel,
        actors: &[ActorRole::Owner],
        to: BookingStatus::Cancelled,
    },
];

/// Stateless transition rules; the only place that decides a status change
pub struct BookingStateMachine;

impl BookingStateMachine {
    /// Resolve the status reached by `event` from `current` when fired by `role`.
    ///
    /// Fails with [`BookingError::IllegalTransition`] when the pair is not in the
    /// table and with [`BookingError::Unauthorized`] when the role may not fire it.
    pub fn transition(
        current: BookingStatus,
        event: TransitionEvent,
        role: ActorRole,
    ) -> BookingResult<BookingStatus> {
        let edge = Self::edge(current, event).ok_or(BookingError::IllegalTransition {
            from: current,
            event,
        })?;

        if !edge.actors.contains(&role) {
            return Err(BookingError::Unauthorized { role, event });
        }

        Ok(edge.to)
    }

    /// Events `role` may fire right now, in table order
    pub fn allowed_events(current: BookingStatus, role: ActorRole) -> Vec<TransitionEvent> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == current && t.actors.contains(&role))
            .map(|t| t.event)
            .collect()
    }

    /// The full table, in declaration order
    pub fn transitions() -> &'static [Transition] {
        TRANSITIONS
    }

    fn edge(current: BookingStatus, event: TransitionEvent) -> Option<&'static Transition> {
        TRANSITIONS
            .iter()
            .find(|t| t.from == current && t.event == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_unlisted_pair_is_illegal() {
        for status in BookingStatus::iter() {
            for event in TransitionEvent::iter() {
                let listed = BookingStateMachine::transitions()
                    .iter()
                    .any(|t| t.from == status && t.event == event);
                if listed {
                    continue;
                }
                for role in ActorRole::iter() {
                    let result = BookingStateMachine::transition(status, event, role);
                    assert!(
                        matches!(result, Err(BookingError::IllegalTransition { from, event: e }) if from == status && e == event),
                        "{status} + {event} by {role} should be illegal, got {result:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_listed_pair_reaches_documented_target() {
        for t in BookingStateMachine::transitions() {
            for role in ActorRole::iter() {
                let result = BookingStateMachine::transition(t.from, t.event, role);
                if t.actors.contains(&role) {
                    assert_eq!(result.unwrap(), t.to);
                } else {
                    assert!(matches!(result, Err(BookingError::Unauthorized { .. })));
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.holds_reservation());
            for role in ActorRole::iter() {
                assert!(BookingStateMachine::allowed_events(status, role).is_empty());
            }
        }
    }

    #[test]
    fn test_renter_cannot_approve() {
        let result = BookingStateMachine::transition(
            BookingStatus::Pending,
            TransitionEvent::Approve,
            ActorRole::Renter,
        );
        assert!(matches!(
            result,
            Err(BookingError::Unauthorized {
                role: ActorRole::Renter,
                event: TransitionEvent::Approve
            })
        ));
    }

    #[test]
    fn test_allowed_events_per_role() {
        assert_eq!(
            BookingStateMachine::allowed_events(BookingStatus::Pending, ActorRole::Owner),
            vec![TransitionEvent::Approve, TransitionEvent::Decline]
        );
        assert_eq!(
            BookingStateMachine::allowed_events(BookingStatus::Pending, ActorRole::Renter),
            vec![TransitionEvent::Cancel]
        );
        assert_eq!(
            BookingStateMachine::allowed_events(BookingStatus::Confirmed, ActorRole::System),
            vec![TransitionEvent::Activate]
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(BookingStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(
            "cancelled".parse::<BookingStatus>().unwrap(),
            BookingStatus::Cancelled
        );
        assert_eq!(
            serde_json::to_string(&TransitionEvent::Activate).unwrap(),
            "\"activate\""
        );
    }
}
