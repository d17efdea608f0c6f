use axum::http::StatusCode;
use axum::response::IntoResponse;

use booking_cell::models::{BookingError, BookingStatus};
use shared_models::error::AppError;

fn status_of(err: BookingError) -> StatusCode {
    AppError::from(err).into_response().status()
}

#[test]
fn missing_resources_map_to_404() {
    assert_eq!(status_of(BookingError::DoctorNotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_of(BookingError::ServiceNotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_of(BookingError::BookingNotFound), StatusCode::NOT_FOUND);
    assert_eq!(
        status_of(BookingError::DoctorTimeSlotNotFound),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn absent_capacity_binding_is_not_found_not_conflict() {
    assert_eq!(
        status_of(BookingError::ServiceBranchNotFound),
        StatusCode::NOT_FOUND
    );
    assert_eq!(AppError::from(BookingError::ServiceBranchNotFound).code(), 50003);
}

#[test]
fn contention_maps_to_409() {
    assert_eq!(status_of(BookingError::SlotAlreadyBooked), StatusCode::CONFLICT);
    assert_eq!(status_of(BookingError::CapacityExhausted), StatusCode::CONFLICT);
    assert_eq!(
        status_of(BookingError::DuplicateReservation),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_of(BookingError::InvalidStatusTransition {
            from: BookingStatus::Canceled,
            to: BookingStatus::Completed,
        }),
        StatusCode::CONFLICT
    );
}

#[test]
fn malformed_day_maps_are_a_client_error() {
    assert_eq!(
        status_of(BookingError::InvalidDayMap("expected 7 day flags".to_string())),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn infrastructure_failures_are_a_500() {
    assert_eq!(
        status_of(BookingError::LockStore("connection refused".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn numeric_codes_survive_the_app_error_conversion() {
    let err = AppError::from(BookingError::SlotAlreadyBooked);
    assert_eq!(err.code(), 50002);
    let err = AppError::from(BookingError::DuplicateReservation);
    assert_eq!(err.code(), 5006);
}
