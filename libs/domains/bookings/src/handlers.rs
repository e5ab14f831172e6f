use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::availability::{AvailabilityIndex, Reservation};
use crate::catalog::{InMemoryListingCatalog, Listing, ListingCatalog};
use crate::date_range::DateRange;
use crate::error::{BookingError, BookingResult, ErrorResponse};
use crate::events::EventPublisher;
use crate::models::{Actor, Booking, BookingFilter, StatusChange};
use crate::repository::BookingRepository;
use crate::service::BookingLifecycleService;
use crate::state_machine::{ActorRole, BookingStatus, TransitionEvent};

type SharedService<R, A, P> = Arc<BookingLifecycleService<R, A, P>>;

const TAG: &str = "bookings";
const LISTINGS_TAG: &str = "listings";

/// OpenAPI documentation for the Bookings API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_bookings,
        create_booking,
        get_booking,
        apply_transition,
        get_availability,
        get_reservations,
    ),
    components(schemas(
        Booking,
        StatusChange,
        DateRange,
        BookingStatus,
        TransitionEvent,
        ActorRole,
        BookingFilter,
        CreateBookingRequest,
        TransitionRequest,
        AvailabilityResponse,
        Reservation,
        ErrorResponse,
    )),
    tags(
        (name = TAG, description = "Booking lifecycle and availability endpoints")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for the listing admin endpoints
#[derive(OpenApi)]
#[openapi(
    paths(get_listing, upsert_listing),
    components(schemas(Listing, UpsertListingRequest, ErrorResponse)),
    tags(
        (name = LISTINGS_TAG, description = "Listing catalog endpoints")
    )
)]
pub struct ListingsApiDoc;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,
    pub renter_id: Uuid,
    /// `YYYY-MM-DD`
    pub start: String,
    /// `YYYY-MM-DD`, inclusive
    pub end: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    #[schema(minimum = 1, default = 1)]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub event: TransitionEvent,
    pub actor_id: Uuid,
    /// `renter` or `owner`; `system` is refused over HTTP
    pub actor_role: ActorRole,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// `YYYY-MM-DD`
    pub start: String,
    /// `YYYY-MM-DD`, inclusive
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub listing_id: Uuid,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertListingRequest {
    pub owner_id: Uuid,
    pub price_per_day: Decimal,
}

/// Create the booking router with all HTTP endpoints
pub fn router<R, A, P>(service: BookingLifecycleService<R, A, P>) -> Router
where
    R: BookingRepository + 'static,
    A: AvailabilityIndex + 'static,
    P: EventPublisher + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/{id}", get(get_booking))
        .route("/{id}/transitions", post(apply_transition))
        .route(
            "/listings/{listing_id}/availability",
            get(get_availability),
        )
        .route(
            "/listings/{listing_id}/reservations",
            get(get_reservations),
        )
        .with_state(shared_service)
}

/// Minimal listing admin endpoints over the in-memory catalog
pub fn listings_router(catalog: Arc<InMemoryListingCatalog>) -> Router {
    Router::new()
        .route("/{id}", get(get_listing).put(upsert_listing))
        .with_state(catalog)
}

/// List bookings, newest first
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(BookingFilter),
    responses(
        (status = 200, description = "Matching bookings", body = Vec<Booking>),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
async fn list_bookings<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Query(filter): Query<BookingFilter>,
) -> BookingResult<Json<Vec<Booking>>>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    let bookings = service.list_bookings(filter).await?;
    Ok(Json(bookings))
}

/// Request a booking; the dates are reserved immediately
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created as pending", body = Booking),
        (status = 400, description = "Invalid range, quantity or price", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 409, description = "Dates already reserved", body = ErrorResponse),
        (status = 503, description = "Listing busy, retry", body = ErrorResponse)
    )
)]
async fn create_booking<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Json(input): Json<CreateBookingRequest>,
) -> BookingResult<impl IntoResponse>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    input.validate()?;
    let range = DateRange::parse(&input.start, &input.end)?;

    let booking = service
        .create_booking_for_listing(input.listing_id, input.renter_id, range, input.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Get a booking by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking found", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    )
)]
async fn get_booking<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<Booking>>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    let booking = service.get_booking(id).await?;
    Ok(Json(booking))
}

/// Fire a lifecycle event on a booking
#[utoipa::path(
    post,
    path = "/{id}/transitions",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = Booking),
        (status = 403, description = "Actor may not fire this event", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Event not allowed in the current status", body = ErrorResponse)
    )
)]
async fn apply_transition<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> BookingResult<Json<Booking>>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    // `system` is reserved for the in-process sweep
    if request.actor_role == ActorRole::System {
        return Err(BookingError::Unauthorized {
            role: ActorRole::System,
            event: request.event,
        });
    }

    let actor = Actor {
        id: request.actor_id,
        role: request.actor_role,
    };
    let booking = service.apply_transition(id, request.event, actor).await?;
    Ok(Json(booking))
}

/// Whether a listing is free for the whole range
#[utoipa::path(
    get,
    path = "/listings/{listing_id}/availability",
    tag = TAG,
    params(
        ("listing_id" = Uuid, Path, description = "Listing ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Availability of the range", body = AvailabilityResponse),
        (status = 400, description = "Invalid range", body = ErrorResponse)
    )
)]
async fn get_availability<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Path(listing_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> BookingResult<Json<AvailabilityResponse>>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    let range = DateRange::parse(&query.start, &query.end)?;
    let available = service.get_availability(listing_id, range).await?;

    Ok(Json(AvailabilityResponse {
        listing_id,
        start: range.start(),
        end: range.end(),
        available,
    }))
}

/// Reserved ranges of a listing, ordered by start date
#[utoipa::path(
    get,
    path = "/listings/{listing_id}/reservations",
    tag = TAG,
    params(
        ("listing_id" = Uuid, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Current reservations", body = Vec<Reservation>)
    )
)]
async fn get_reservations<R, A, P>(
    State(service): State<SharedService<R, A, P>>,
    Path(listing_id): Path<Uuid>,
) -> BookingResult<Json<Vec<Reservation>>>
where
    R: BookingRepository,
    A: AvailabilityIndex,
    P: EventPublisher,
{
    let reservations = service.blocked_ranges(listing_id).await?;
    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = LISTINGS_TAG,
    params(
        ("id" = Uuid, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing found", body = Listing),
        (status = 404, description = "Listing not found", body = ErrorResponse)
    )
)]
async fn get_listing(
    State(catalog): State<Arc<InMemoryListingCatalog>>,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<Listing>> {
    let listing = catalog
        .get_listing(id)
        .await?
        .ok_or(BookingError::ListingNotFound(id))?;
    Ok(Json(listing))
}

/// Create a listing or replace its owner and rate
#[utoipa::path(
    put,
    path = "/{id}",
    tag = LISTINGS_TAG,
    params(
        ("id" = Uuid, Path, description = "Listing ID")
    ),
    request_body = UpsertListingRequest,
    responses(
        (status = 200, description = "Listing stored", body = Listing),
        (status = 400, description = "Negative price", body = ErrorResponse)
    )
)]
async fn upsert_listing(
    State(catalog): State<Arc<InMemoryListingCatalog>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpsertListingRequest>,
) -> BookingResult<Json<Listing>> {
    if request.price_per_day < Decimal::ZERO {
        return Err(BookingError::Validation(
            "price_per_day must not be negative".to_string(),
        ));
    }

    let listing = Listing {
        id,
        owner_id: request.owner_id,
        price_per_day: request.price_per_day,
    };
    catalog.upsert(listing.clone()).await;
    Ok(Json(listing))
}
