//! Domain events emitted after a booking change commits.
//!
//! Consumers (notifications, chat, dashboards) subscribe through an
//! [`EventPublisher`]; the service never waits on them and a failed publish
//! never undoes the change that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::date_range::DateRange;
use crate::error::{BookingError, BookingResult};
use crate::models::Booking;
use crate::state_machine::{BookingStatus, TransitionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingEventKind {
    BookingCreated,
    BookingApproved,
    BookingDeclined,
    BookingCancelled,
    BookingActivated,
    BookingCompleted,
}

impl BookingEventKind {
    pub fn for_transition(event: TransitionEvent) -> Self {
        match event {
            TransitionEvent::Approve => Self::BookingApproved,
            TransitionEvent::Decline => Self::BookingDeclined,
            TransitionEvent::Cancel => Self::BookingCancelled,
            TransitionEvent::Activate => Self::BookingActivated,
            TransitionEvent::Complete => Self::BookingCompleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub range: DateRange,
    pub status: BookingStatus,
    pub timestamp: DateTime<Utc>,
}

impl BookingEvent {
    pub fn from_booking(kind: BookingEventKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: booking.id,
            listing_id: booking.listing_id,
            renter_id: booking.renter_id,
            owner_id: booking.owner_id,
            range: booking.range,
            status: booking.status,
            timestamp: Utc::now(),
        }
    }

    /// Wire form of the event
    pub fn to_json(&self) -> BookingResult<String> {
        serde_json::to_string(self).map_err(|e| BookingError::Internal(e.to_string()))
    }
}

/// Outbound port for domain events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> BookingResult<()>;
}

/// Fan-out over a `tokio::sync::broadcast` channel.
///
/// Publishing with no subscribers succeeds; a subscriber that falls more than
/// `capacity` events behind sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<BookingEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> BookingResult<()> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(kind = %event.kind, booking_id = %event.booking_id, receivers, "Event broadcast"),
            Err(_) => debug!(kind = %event.kind, booking_id = %event.booking_id, "Event dropped, no subscribers"),
        }
        Ok(())
    }
}

/// Keeps every published event in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<BookingEvent>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<BookingEvent> {
        self.events.read().await.clone()
    }

    pub async fn events_for(&self, booking_id: Uuid) -> Vec<BookingEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub async fn count_of(&self, kind: BookingEventKind) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> BookingResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

/// Writes one structured log line per event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> BookingResult<()> {
        let payload = event.to_json()?;
        info!(
            kind = %event.kind,
            booking_id = %event.booking_id,
            listing_id = %event.listing_id,
            status = %event.status,
            payload = %payload,
            "Booking event"
        );
        Ok(())
    }
}
