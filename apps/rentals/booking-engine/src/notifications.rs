//! Relay from the booking event channel to the notification surface.
//!
//! Delivery (push, SMS, chat) belongs to other services; this process only
//! logs what would be handed to them.

use domain_bookings::{BookingEvent, BookingEventKind};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub fn spawn_relay(mut events: broadcast::Receiver<BookingEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => relay(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification relay fell behind, events dropped");
                }
                Err(RecvError::Closed) => {
                    info!("Booking event channel closed, notification relay stopping");
                    break;
                }
            }
        }
    })
}

fn relay(event: &BookingEvent) {
    let recipients = match event.kind {
        BookingEventKind::BookingCreated => vec![event.owner_id],
        BookingEventKind::BookingApproved
        | BookingEventKind::BookingDeclined
        | BookingEventKind::BookingActivated
        | BookingEventKind::BookingCompleted => vec![event.renter_id],
        BookingEventKind::BookingCancelled => vec![event.renter_id, event.owner_id],
    };

    for recipient in recipients {
        info!(
            kind = %event.kind,
            booking_id = %event.booking_id,
            listing_id = %event.listing_id,
            %recipient,
            range = %event.range,
            "Notify"
        );
    }
}
