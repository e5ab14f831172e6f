use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(domain_bookings::ErrorResponse)
    ),
    info(
        title = "Booking Engine API",
        version = "0.1.0",
        description = "Rental bookings: reservation, approval and the lifecycle that follows"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/bookings", api = domain_bookings::ApiDoc),
        (path = "/listings", api = domain_bookings::ListingsApiDoc)
    )
)]
pub struct ApiDoc;
