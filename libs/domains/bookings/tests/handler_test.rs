//! Handler tests for the Bookings domain
//!
//! These exercise the axum router directly: JSON in and out, status codes
//! and the error body shape.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_bookings::handlers::AvailabilityResponse;
use domain_bookings::*;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn app() -> (Router, Listing) {
    let catalog = Arc::new(InMemoryListingCatalog::new());
    let listing = Listing {
        id: uuid::Uuid::now_v7(),
        owner_id: uuid::Uuid::now_v7(),
        price_per_day: dec!(2500),
    };
    catalog.upsert(listing.clone()).await;

    let service = BookingLifecycleService::new(
        InMemoryBookingRepository::new(),
        InMemoryAvailabilityIndex::default(),
        InMemoryEventPublisher::new(),
    )
    .with_catalog(catalog);

    (handlers::router(service), listing)
}

async fn create(
    app: &Router,
    listing: &Listing,
    renter: uuid::Uuid,
    start: &str,
    end: &str,
) -> axum::response::Response {
    app.clone()
        .oneshot(post(
            "/",
            json!({
                "listing_id": listing.id,
                "renter_id": renter,
                "start": start,
                "end": end,
            }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_booking_returns_201() {
    let (app, listing) = app().await;
    let response = create(&app, &listing, uuid::Uuid::now_v7(), "2024-02-10", "2024-02-12").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let booking: Value = json_body(response.into_body()).await;
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["total_amount"], "7500.00");
    assert_eq!(booking["range"]["start"], "2024-02-10");
}

#[tokio::test]
async fn test_inverted_range_is_400() {
    let (app, listing) = app().await;
    let response = create(&app, &listing, uuid::Uuid::now_v7(), "2024-02-12", "2024-02-10").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "INVALID_RANGE");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_zero_quantity_is_400() {
    let (app, listing) = app().await;
    let response = app
        .oneshot(post(
            "/",
            json!({
                "listing_id": listing.id,
                "renter_id": uuid::Uuid::now_v7(),
                "start": "2024-02-10",
                "end": "2024-02-10",
                "quantity": 0,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_listing_is_404() {
    let (app, _) = app().await;
    let stranger = Listing {
        id: uuid::Uuid::now_v7(),
        owner_id: uuid::Uuid::now_v7(),
        price_per_day: dec!(1),
    };
    let response = create(&app, &stranger, uuid::Uuid::now_v7(), "2024-02-10", "2024-02-10").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "LISTING_NOT_FOUND");
}

#[tokio::test]
async fn test_overlap_is_409() {
    let (app, listing) = app().await;
    let first = create(&app, &listing, uuid::Uuid::now_v7(), "2024-03-01", "2024-03-03").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = create(&app, &listing, uuid::Uuid::now_v7(), "2024-03-03", "2024-03-05").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = json_body(second.into_body()).await;
    assert_eq!(body["error"], "RANGE_CONFLICT");
}

#[tokio::test]
async fn test_transitions_over_http() {
    let (app, listing) = app().await;
    let renter = uuid::Uuid::now_v7();
    let created = create(&app, &listing, renter, "2024-04-01", "2024-04-02").await;
    let booking: Booking = json_body(created.into_body()).await;

    let forbidden = app
        .clone()
        .oneshot(post(
            &format!("/{}/transitions", booking.id),
            json!({"event": "approve", "actor_id": renter, "actor_role": "renter"}),
        ))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let approved = app
        .clone()
        .oneshot(post(
            &format!("/{}/transitions", booking.id),
            json!({"event": "approve", "actor_id": listing.owner_id, "actor_role": "owner"}),
        ))
        .await
        .unwrap();
    assert_eq!(approved.status(), StatusCode::OK);
    let approved: Booking = json_body(approved.into_body()).await;
    assert_eq!(approved.status, BookingStatus::Confirmed);

    let illegal = app
        .clone()
        .oneshot(post(
            &format!("/{}/transitions", booking.id),
            json!({"event": "decline", "actor_id": listing.owner_id, "actor_role": "owner"}),
        ))
        .await
        .unwrap();
    assert_eq!(illegal.status(), StatusCode::CONFLICT);
    let body: Value = json_body(illegal.into_body()).await;
    assert_eq!(body["error"], "ILLEGAL_TRANSITION");

    let fetched = app
        .oneshot(get(&format!("/{}", booking.id)))
        .await
        .unwrap();
    let fetched: Booking = json_body(fetched.into_body()).await;
    assert_eq!(fetched.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_missing_booking_is_404() {
    let (app, _) = app().await;
    let response = app
        .oneshot(get(&format!("/{}", uuid::Uuid::now_v7())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_and_reservations() {
    let (app, listing) = app().await;
    create(&app, &listing, uuid::Uuid::now_v7(), "2024-05-10", "2024-05-12").await;

    let busy = app
        .clone()
        .oneshot(get(&format!(
            "/listings/{}/availability?start=2024-05-12&end=2024-05-14",
            listing.id
        )))
        .await
        .unwrap();
    assert_eq!(busy.status(), StatusCode::OK);
    let busy: AvailabilityResponse = json_body(busy.into_body()).await;
    assert!(!busy.available);

    let free = app
        .clone()
        .oneshot(get(&format!(
            "/listings/{}/availability?start=2024-05-13&end=2024-05-14",
            listing.id
        )))
        .await
        .unwrap();
    let free: AvailabilityResponse = json_body(free.into_body()).await;
    assert!(free.available);

    let reservations = app
        .oneshot(get(&format!("/listings/{}/reservations", listing.id)))
        .await
        .unwrap();
    let reservations: Vec<Reservation> = json_body(reservations.into_body()).await;
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].range.to_string(), "2024-05-10..2024-05-12");
}

#[tokio::test]
async fn test_list_filters_by_renter() {
    let (app, listing) = app().await;
    let renter = uuid::Uuid::now_v7();
    create(&app, &listing, renter, "2024-06-01", "2024-06-01").await;
    create(&app, &listing, uuid::Uuid::now_v7(), "2024-06-05", "2024-06-05").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/?renter_id={}", renter)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bookings: Vec<Booking> = json_body(response.into_body()).await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].renter_id, renter);

    let bad_limit = app.oneshot(get("/?limit=0")).await.unwrap();
    assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_system_role_is_refused_over_http() {
    let (app, listing) = app().await;
    let created = create(&app, &listing, uuid::Uuid::now_v7(), "2030-01-10", "2030-01-12").await;
    let booking: Booking = json_body(created.into_body()).await;

    let approved = app
        .clone()
        .oneshot(post(
            &format!("/{}/transitions", booking.id),
            json!({"event": "approve", "actor_id": listing.owner_id, "actor_role": "owner"}),
        ))
        .await
        .unwrap();
    assert_eq!(approved.status(), StatusCode::OK);

    let stranger = uuid::Uuid::now_v7();
    for event in ["activate", "complete"] {
        let response = app
            .clone()
            .oneshot(post(
                &format!("/{}/transitions", booking.id),
                json!({"event": event, "actor_id": stranger, "actor_role": "system"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{event}");
        let body: Value = json_body(response.into_body()).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    let fetched = app
        .clone()
        .oneshot(get(&format!("/{}", booking.id)))
        .await
        .unwrap();
    let fetched: Booking = json_body(fetched.into_body()).await;
    assert_eq!(fetched.status, BookingStatus::Confirmed);
    assert_eq!(fetched.status_history.len(), 2);

    let reservations = app
        .oneshot(get(&format!("/listings/{}/reservations", listing.id)))
        .await
        .unwrap();
    let reservations: Vec<Reservation> = json_body(reservations.into_body()).await;
    assert_eq!(reservations.len(), 1);
}

#[test]
fn test_openapi_documents_every_route() {
    use utoipa::OpenApi;

    let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
    let paths = &doc["paths"];
    assert!(paths["/{id}"]["get"].is_object());
    assert!(paths["/{id}/transitions"]["post"].is_object());
    assert!(paths["/listings/{listing_id}/availability"]["get"].is_object());
    assert!(paths["/listings/{listing_id}/reservations"]["get"].is_object());

    let schemas = &doc["components"]["schemas"];
    for name in [
        "Booking",
        "CreateBookingRequest",
        "TransitionRequest",
        "AvailabilityResponse",
        "ErrorResponse",
    ] {
        assert!(schemas[name].is_object(), "missing schema {name}");
    }
    assert!(schemas["BookingStatus"].is_object());

    let listings = serde_json::to_value(ListingsApiDoc::openapi()).unwrap();
    assert!(listings["paths"]["/{id}"]["put"].is_object());
}
