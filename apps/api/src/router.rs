use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::{booking_routes, BookingState};

pub fn create_router(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .nest("/bookings", booking_routes(state))
}
