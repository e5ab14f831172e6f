use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::date_range::DateRange;
use crate::state_machine::{ActorRole, BookingStatus, TransitionEvent};

/// The resolved identity behind a mutating request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn renter(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Renter,
        }
    }

    pub fn owner(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Owner,
        }
    }

    /// The scheduler; carries the nil id
    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            role: ActorRole::System,
        }
    }
}

/// One entry of a booking's append-only status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: BookingStatus,
    /// `None` for the creation entry
    pub event: Option<TransitionEvent>,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    pub fn new(status: BookingStatus, event: TransitionEvent, actor: Actor) -> Self {
        Self {
            status,
            event: Some(event),
            actor_id: actor.id,
            actor_role: actor.role,
            at: Utc::now(),
        }
    }
}

/// A renter's claim on a listing for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub range: DateRange,
    pub quantity: u32,
    /// Rate at creation time; later catalog changes do not affect it
    pub unit_price_per_day: Decimal,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_history: Vec<StatusChange>,
}

impl Booking {
    /// New `pending` booking with its creation recorded against the renter
    pub fn pending(id: Uuid, input: &CreateBooking, total_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            listing_id: input.listing_id,
            renter_id: input.renter_id,
            owner_id: input.owner_id,
            range: input.range,
            quantity: input.quantity,
            unit_price_per_day: input.unit_price_per_day,
            total_amount,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
            status_history: vec![StatusChange {
                status: BookingStatus::Pending,
                event: None,
                actor_id: input.renter_id,
                actor_role: ActorRole::Renter,
                at: now,
            }],
        }
    }

    pub fn holds_reservation(&self) -> bool {
        self.status.holds_reservation()
    }

    /// Move to `change.status` and append it to the history
    pub fn apply_change(&mut self, change: StatusChange) {
        self.status = change.status;
        self.updated_at = change.at;
        self.status_history.push(change);
    }

    pub fn last_change(&self) -> Option<&StatusChange> {
        self.status_history.last()
    }
}

/// Everything needed to open a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBooking {
    pub listing_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub range: DateRange,
    pub quantity: u32,
    pub unit_price_per_day: Decimal,
}

/// Side of a booking a party is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Renter(Uuid),
    Owner(Uuid),
}

/// Query parameters for listing bookings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingFilter {
    pub renter_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            renter_id: None,
            owner_id: None,
            listing_id: None,
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl BookingFilter {
    /// No filters and no page limit
    pub fn all() -> Self {
        Self {
            limit: u64::MAX,
            ..Self::default()
        }
    }

    pub fn for_party(party: Party) -> Self {
        let mut filter = Self::all();
        match party {
            Party::Renter(id) => filter.renter_id = Some(id),
            Party::Owner(id) => filter.owner_id = Some(id),
        }
        filter
    }

    pub fn with_status(mut self, status: Option<BookingStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.renter_id.is_none_or(|id| booking.renter_id == id)
            && self.owner_id.is_none_or(|id| booking.owner_id == id)
            && self.listing_id.is_none_or(|id| booking.listing_id == id)
            && self.status.is_none_or(|status| booking.status == status)
    }
}
