use assert_matches::assert_matches;

use booking_cell::models::{BookingError, BookingStatus};
use booking_cell::services::lifecycle::validate_status_transition;

use BookingStatus::*;

const ALL: [BookingStatus; 7] = [
    Pending,
    Scheduled,
    Canceled,
    RefundInitiated,
    RefundCompleted,
    Completed,
    Reschedule,
];

#[test]
fn payment_promotes_pending_to_scheduled() {
    assert!(validate_status_transition(Pending, Scheduled).is_ok());
}

#[test]
fn scheduled_bookings_can_close_out_four_ways() {
    for to in [Completed, Canceled, RefundInitiated, Reschedule] {
        assert!(validate_status_transition(Scheduled, to).is_ok());
    }
    assert_matches!(
        validate_status_transition(Scheduled, RefundCompleted),
        Err(BookingError::InvalidStatusTransition { .. })
    );
}

#[test]
fn no_state_can_return_to_pending() {
    for from in ALL {
        assert_matches!(
            validate_status_transition(from, Pending),
            Err(BookingError::InvalidStatusTransition { .. })
        );
    }
}

#[test]
fn refund_flow_is_a_strict_two_step() {
    assert!(validate_status_transition(Completed, RefundInitiated).is_ok());
    assert!(validate_status_transition(RefundInitiated, RefundCompleted).is_ok());
    for to in ALL {
        if to != RefundCompleted {
            assert_matches!(
                validate_status_transition(RefundInitiated, to),
                Err(BookingError::InvalidStatusTransition { .. })
            );
        }
    }
}

#[test]
fn superseded_rows_are_never_reactivated() {
    for to in ALL {
        assert_matches!(
            validate_status_transition(Reschedule, to),
            Err(BookingError::InvalidStatusTransition { .. })
        );
    }
}

#[test]
fn invalid_transition_error_names_both_states() {
    let err = validate_status_transition(Canceled, Completed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid status transition from CANCELED to COMPLETED"
    );
}
