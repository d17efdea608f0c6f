// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Actor, BookDoctorRequest, BookServiceRequest, PaymentConfirmationRequest,
    RescheduleBookingRequest, ServiceCartRequest,
};
use crate::router::BookingState;

fn actor(user: &User) -> Actor {
    Actor {
        user_id: user.id,
        is_admin: user.is_admin(),
    }
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Auth("Admin access required".to_string()))
    }
}

// ==============================================================================
// DOCTOR BOOKING HANDLERS
// ==============================================================================

pub async fn book_doctor(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state.reservation.book_doctor(user.id, &request).await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn get_doctor_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .get_doctor_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn list_doctor_bookings(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.lifecycle.list_doctor_bookings(user.id).await?;
    Ok(Json(json!({ "success": true, "data": bookings })))
}

pub async fn cancel_doctor_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .cancel_doctor_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn complete_doctor_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .complete_doctor_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn reschedule_doctor_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .reschedule_doctor_booking(&actor(&user), booking_id, &request)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn initiate_doctor_refund(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .initiate_doctor_refund(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn complete_doctor_refund(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let booking = state
        .lifecycle
        .complete_doctor_refund(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

// ==============================================================================
// SERVICE BOOKING HANDLERS
// ==============================================================================

pub async fn book_service(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state.reservation.book_service(user.id, &request).await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn book_service_cart(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ServiceCartRequest>,
) -> Result<Json<Value>, AppError> {
    let bookings = state
        .reservation
        .book_service_cart(user.id, &request)
        .await?;
    Ok(Json(json!({ "success": true, "data": bookings })))
}

pub async fn get_service_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .get_service_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn list_service_bookings(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.lifecycle.list_service_bookings(user.id).await?;
    Ok(Json(json!({ "success": true, "data": bookings })))
}

pub async fn cancel_service_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .cancel_service_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn complete_service_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .complete_service_booking(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn reschedule_service_booking(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .reschedule_service_booking(&actor(&user), booking_id, &request)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn initiate_service_refund(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .lifecycle
        .initiate_service_refund(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

pub async fn complete_service_refund(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let booking = state
        .lifecycle
        .complete_service_refund(&actor(&user), booking_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": booking })))
}

// ==============================================================================
// PAYMENT + METRICS HANDLERS
// ==============================================================================

/// Payment provider callback. Flips every referenced booking to SCHEDULED;
/// retries of the same callback are no-ops.
pub async fn confirm_payment(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<PaymentConfirmationRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    state.lifecycle.confirm_payment(&request).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn doctor_visit_metrics(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let visits = state.lifecycle.doctor_visits_per_user().await?;
    Ok(Json(json!({ "success": true, "data": visits })))
}

pub async fn service_visit_metrics(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let visits = state.lifecycle.service_visits_per_user().await?;
    Ok(Json(json!({ "success": true, "data": visits })))
}

pub async fn my_spend(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let spend = state.lifecycle.user_spend(user.id).await?;
    Ok(Json(json!({ "success": true, "data": spend })))
}

pub async fn user_spend_metrics(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let spend = state.lifecycle.user_spend(user_id).await?;
    Ok(Json(json!({ "success": true, "data": spend })))
}

pub async fn my_loyalty_balance(
    State(state): State<Arc<BookingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let points = state.lifecycle.loyalty_balance(user.id).await?;
    Ok(Json(json!({ "success": true, "data": { "points": points } })))
}
