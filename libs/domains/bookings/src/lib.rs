//! Bookings Domain
//!
//! Booking lifecycle and availability scheduling for rental listings. A
//! listing is never double-booked, every booking follows a role-gated status
//! lifecycle, and its price is fixed when it is created.
//!
//! # Architecture
//!
//! ```text
//!             ┌──────────────┐
//!             │   Handlers   │  ← axum routes, JSON errors
//!             └──────┬───────┘
//!                    │
//!      ┌─────────────▼──────────────┐
//!      │  BookingLifecycleService   │  ← orchestration, compensation, sweep
//!      └──┬──────────┬──────────┬───┘
//!         │          │          │
//! ┌───────▼────┐ ┌───▼───────┐ ┌▼──────────────┐
//! │ Repository │ │ Avail.    │ │ EventPublisher│  ← injected traits
//! │            │ │ Index     │ │               │
//! └───────┬────┘ └───┬───────┘ └───────────────┘
//!         │          │
//! ┌───────▼──────────▼─────────────────────────┐
//! │ StateMachine · Pricing · DateRange         │  ← pure rules
//! └────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_bookings::{
//!     Actor, BookingLifecycleService, CreateBooking, DateRange, InMemoryAvailabilityIndex,
//!     InMemoryBookingRepository, InMemoryEventPublisher, TransitionEvent,
//! };
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = BookingLifecycleService::new(
//!     InMemoryBookingRepository::new(),
//!     InMemoryAvailabilityIndex::default(),
//!     InMemoryEventPublisher::new(),
//! );
//!
//! let owner_id = Uuid::now_v7();
//! let booking = service
//!     .create_booking(CreateBooking {
//!         listing_id: Uuid::now_v7(),
//!         renter_id: Uuid::now_v7(),
//!         owner_id,
//!         range: DateRange::parse("2024-02-10", "2024-02-12")?,
//!         quantity: 1,
//!         unit_price_per_day: Decimal::from(2500),
//!     })
//!     .await?;
//!
//! service
//!     .apply_transition(booking.id, TransitionEvent::Approve, Actor::owner(owner_id))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod availability;
pub mod catalog;
pub mod config;
pub mod date_range;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod retry;
pub mod service;
pub mod state_machine;
pub mod sweep;

// Re-export commonly used types
pub use availability::{AvailabilityIndex, InMemoryAvailabilityIndex, Reservation};
pub use catalog::{InMemoryListingCatalog, Listing, ListingCatalog};
pub use config::BookingConfig;
pub use date_range::DateRange;
pub use error::{BookingError, BookingResult, ErrorResponse};
pub use events::{
    BookingEvent, BookingEventKind, BroadcastEventPublisher, EventPublisher,
    InMemoryEventPublisher, TracingEventPublisher,
};
pub use handlers::{ApiDoc, ListingsApiDoc};
pub use models::{Actor, Booking, BookingFilter, CreateBooking, Party, StatusChange};
pub use repository::{BookingRepository, InMemoryBookingRepository};
pub use retry::RetryPolicy;
pub use service::BookingLifecycleService;
pub use state_machine::{ActorRole, BookingStateMachine, BookingStatus, TransitionEvent};
pub use sweep::SweepReport;
