// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{BookingLifecycleService, ReservationService};

/// Shared state for the booking routes.
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub reservation: ReservationService,
    pub lifecycle: BookingLifecycleService,
}

pub fn booking_routes(state: Arc<BookingState>) -> Router {
    // Every booking operation requires an authenticated user.
    let protected_routes = Router::new()
        // Doctor bookings
        .route("/doctors", post(handlers::book_doctor))
        .route("/doctors", get(handlers::list_doctor_bookings))
        .route("/doctors/{booking_id}", get(handlers::get_doctor_booking))
        .route("/doctors/{booking_id}/cancel", post(handlers::cancel_doctor_booking))
        .route("/doctors/{booking_id}/complete", post(handlers::complete_doctor_booking))
        .route("/doctors/{booking_id}/reschedule", patch(handlers::reschedule_doctor_booking))
        .route("/doctors/{booking_id}/refund", post(handlers::initiate_doctor_refund))
        .route("/doctors/{booking_id}/refund/complete", post(handlers::complete_doctor_refund))
        // Service bookings
        .route("/services", post(handlers::book_service))
        .route("/services", get(handlers::list_service_bookings))
        .route("/services/cart", post(handlers::book_service_cart))
        .route("/services/{booking_id}", get(handlers::get_service_booking))
        .route("/services/{booking_id}/cancel", post(handlers::cancel_service_booking))
        .route("/services/{booking_id}/complete", post(handlers::complete_service_booking))
        .route("/services/{booking_id}/reschedule", patch(handlers::reschedule_service_booking))
        .route("/services/{booking_id}/refund", post(handlers::initiate_service_refund))
        .route("/services/{booking_id}/refund/complete", post(handlers::complete_service_refund))
        // Payment callback and metrics
        .route("/payments/confirm", post(handlers::confirm_payment))
        .route("/metrics/visits/doctors", get(handlers::doctor_visit_metrics))
        .route("/metrics/visits/services", get(handlers::service_visit_metrics))
        .route("/metrics/spend", get(handlers::my_spend))
        .route("/metrics/spend/{user_id}", get(handlers::user_spend_metrics))
        .route("/loyalty", get(handlers::my_loyalty_balance))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
