// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use catalog_cell::models::DayMapError;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// Lifecycle status shared by both booking families.
///
/// `Reschedule` is the transient marker stamped on the *old* row the instant a
/// replacement booking is created; such rows are never reactivated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Scheduled,
    Canceled,
    RefundInitiated,
    RefundCompleted,
    Completed,
    Reschedule,
}

impl BookingStatus {
    /// Whether a row in this status counts against slot capacity.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Scheduled | BookingStatus::Completed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::Scheduled => write!(f, "SCHEDULED"),
            BookingStatus::Canceled => write!(f, "CANCELED"),
            BookingStatus::RefundInitiated => write!(f, "REFUND_INITIATED"),
            BookingStatus::RefundCompleted => write!(f, "REFUND_COMPLETED"),
            BookingStatus::Completed => write!(f, "COMPLETED"),
            BookingStatus::Reschedule => write!(f, "RESCHEDULE"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub time_slot_id: Uuid,
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub vat_percentage: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub time_slot_id: Uuid,
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub vat_percentage: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDoctorRequest {
    pub doctor_id: Uuid,
    pub time_slot_id: Uuid,
    pub branch_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookServiceRequest {
    pub service_id: Uuid,
    pub time_slot_id: Uuid,
    pub branch_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCartRequest {
    pub items: Vec<BookServiceRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleBookingRequest {
    pub time_slot_id: Uuid,
    pub date: NaiveDate,
}

/// Line items of a confirmed payment; every referenced booking is flipped
/// PENDING -> SCHEDULED, idempotently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmationRequest {
    #[serde(default)]
    pub doctor_booking_ids: Vec<Uuid>,
    #[serde(default)]
    pub service_booking_ids: Vec<Uuid>,
}

/// The identity every mutating lifecycle operation is authorized against.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

// ==============================================================================
// METRICS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserVisits {
    pub user_id: Uuid,
    pub visits: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSpend {
    pub user_id: Uuid,
    pub doctor_spend: f64,
    pub service_spend: f64,
}

// ==============================================================================
// ERROR TYPE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Transient,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Time slot not found for doctor")]
    DoctorTimeSlotNotFound,

    #[error("Doctor branch not found")]
    DoctorBranchNotFound,

    #[error("Doctor is not available at this branch on the requested day")]
    DoctorUnavailableOnDay,

    #[error("Doctor already booked for this slot")]
    SlotAlreadyBooked,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Service time slot not found")]
    ServiceTimeSlotNotFound,

    #[error("Service is not bookable at this branch")]
    ServiceBranchNotFound,

    #[error("All slots already booked for this service")]
    CapacityExhausted,

    #[error("Duplicate record found")]
    DuplicateReservation,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Invalid day mapping: {0}")]
    InvalidDayMap(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Lock store error: {0}")]
    LockStore(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::DoctorNotFound
            | BookingError::DoctorTimeSlotNotFound
            | BookingError::DoctorBranchNotFound
            | BookingError::ServiceNotFound
            | BookingError::ServiceTimeSlotNotFound
            | BookingError::ServiceBranchNotFound
            | BookingError::BookingNotFound => ErrorKind::NotFound,
            BookingError::DoctorUnavailableOnDay
            | BookingError::SlotAlreadyBooked
            | BookingError::CapacityExhausted
            | BookingError::DuplicateReservation
            | BookingError::InvalidStatusTransition { .. } => ErrorKind::Conflict,
            BookingError::InvalidDayMap(_) => ErrorKind::Validation,
            BookingError::Database(_) | BookingError::LockStore(_) => ErrorKind::Transient,
        }
    }

    /// Stable numeric code carried on the wire alongside the message.
    pub fn code(&self) -> u32 {
        match self {
            BookingError::BookingNotFound => 50001,
            BookingError::SlotAlreadyBooked => 50002,
            BookingError::ServiceBranchNotFound => 50003,
            BookingError::DoctorTimeSlotNotFound => 50004,
            BookingError::CapacityExhausted => 50005,
            BookingError::DuplicateReservation => 5006,
            BookingError::DoctorUnavailableOnDay => 50007,
            BookingError::InvalidStatusTransition { .. } => 50008,
            BookingError::ServiceNotFound => 30002,
            BookingError::DoctorNotFound => 30004,
            BookingError::DoctorBranchNotFound => 30005,
            BookingError::ServiceTimeSlotNotFound => 30009,
            BookingError::InvalidDayMap(_) => 30010,
            BookingError::Database(_) => 10001,
            BookingError::LockStore(_) => 10008,
        }
    }
}

impl From<DayMapError> for BookingError {
    fn from(e: DayMapError) -> Self {
        BookingError::InvalidDayMap(e.0)
    }
}

impl From<BookingError> for shared_models::error::AppError {
    fn from(e: BookingError) -> Self {
        use shared_models::error::AppError;
        let code = e.code();
        match e.kind() {
            ErrorKind::NotFound => AppError::not_found(code, e.to_string()),
            ErrorKind::Conflict => AppError::conflict(code, e.to_string()),
            ErrorKind::Validation => AppError::validation(code, e.to_string()),
            ErrorKind::Transient => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_ignores_released_rows() {
        assert!(BookingStatus::Pending.occupies_slot());
        assert!(BookingStatus::Scheduled.occupies_slot());
        assert!(BookingStatus::Completed.occupies_slot());
        assert!(!BookingStatus::Canceled.occupies_slot());
        assert!(!BookingStatus::Reschedule.occupies_slot());
        assert!(!BookingStatus::RefundInitiated.occupies_slot());
        assert!(!BookingStatus::RefundCompleted.occupies_slot());
    }

    #[test]
    fn error_codes_match_the_published_taxonomy() {
        assert_eq!(BookingError::BookingNotFound.code(), 50001);
        assert_eq!(BookingError::SlotAlreadyBooked.code(), 50002);
        assert_eq!(BookingError::ServiceBranchNotFound.code(), 50003);
        assert_eq!(BookingError::CapacityExhausted.code(), 50005);
        assert_eq!(BookingError::DuplicateReservation.code(), 5006);
        assert_eq!(BookingError::DoctorNotFound.code(), 30004);
        assert_eq!(BookingError::InvalidDayMap("x".to_string()).code(), 30010);
    }

    #[test]
    fn conflict_errors_map_to_conflict_kind() {
        assert_eq!(BookingError::SlotAlreadyBooked.kind(), ErrorKind::Conflict);
        assert_eq!(BookingError::CapacityExhausted.kind(), ErrorKind::Conflict);
        assert_eq!(BookingError::DuplicateReservation.kind(), ErrorKind::Conflict);
        assert_eq!(BookingError::BookingNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            BookingError::ServiceBranchNotFound.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BookingError::InvalidDayMap("bad".to_string()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&BookingStatus::RefundInitiated).unwrap();
        assert_eq!(json, "\"REFUND_INITIATED\"");
        assert_eq!(BookingStatus::RefundInitiated.to_string(), "REFUND_INITIATED");
    }
}
