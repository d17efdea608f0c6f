// libs/catalog-cell/src/models.rs
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// BOOKABLE RESOURCES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub session_fee: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: Uuid,
    pub category_id: Uuid,
    pub actual_price: f64,
    pub discounted_price: f64,
    pub is_redeemable: bool,
    pub is_active: bool,
}

/// A fixed start/end window offered by a doctor. Unique per
/// (doctor, start, end) while active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorTimeSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceTimeSlot {
    pub id: Uuid,
    pub service_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

// ==============================================================================
// BRANCH CAPACITY BINDINGS
// ==============================================================================

/// Ties a doctor to a branch with a weekly availability bitmap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorBranch {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub branch_id: Uuid,
    pub day_map: String,
    pub is_active: bool,
}

impl DoctorBranch {
    pub fn availability(&self) -> Result<DayMap, DayMapError> {
        DayMap::parse(&self.day_map)
    }
}

/// Ties a service to a branch with a per-slot booking ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceBranch {
    pub id: Uuid,
    pub service_id: Uuid,
    pub branch_id: Uuid,
    pub max_bookings_per_slot: i32,
    pub is_active: bool,
}

// ==============================================================================
// WEEKLY AVAILABILITY BITMAP
// ==============================================================================

#[derive(Error, Debug, PartialEq)]
#[error("Invalid day mapping: {0}")]
pub struct DayMapError(pub String);

/// Seven weekday flags, Monday-first, stored as a string like "0101010".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMap([bool; 7]);

impl DayMap {
    pub fn parse(raw: &str) -> Result<Self, DayMapError> {
        if raw.len() != 7 {
            return Err(DayMapError(format!(
                "expected 7 day flags, got {}",
                raw.len()
            )));
        }
        let mut days = [false; 7];
        for (i, c) in raw.chars().enumerate() {
            match c {
                '1' => days[i] = true,
                '0' => days[i] = false,
                other => {
                    return Err(DayMapError(format!(
                        "day flag must be 0 or 1, got '{}'",
                        other
                    )))
                }
            }
        }
        Ok(DayMap(days))
    }

    pub fn allows(&self, weekday: Weekday) -> bool {
        self.0[weekday.num_days_from_monday() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Weekday;

    #[test]
    fn day_map_parses_and_indexes_monday_first() {
        let map = DayMap::parse("1000001").unwrap();
        assert!(map.allows(Weekday::Mon));
        assert!(map.allows(Weekday::Sun));
        assert!(!map.allows(Weekday::Tue));
        assert!(!map.allows(Weekday::Sat));
    }

    #[test]
    fn day_map_rejects_wrong_length() {
        assert_matches!(DayMap::parse("101"), Err(DayMapError(_)));
        assert_matches!(DayMap::parse("10101010"), Err(DayMapError(_)));
    }

    #[test]
    fn day_map_rejects_non_binary_flags() {
        assert_matches!(DayMap::parse("10101x1"), Err(DayMapError(_)));
        assert_matches!(DayMap::parse("2000000"), Err(DayMapError(_)));
    }

    #[test]
    fn doctor_branch_exposes_parsed_availability() {
        let binding = DoctorBranch {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            day_map: "1111100".to_string(),
            is_active: true,
        };
        let availability = binding.availability().unwrap();
        assert!(availability.allows(Weekday::Fri));
        assert!(!availability.allows(Weekday::Sat));
    }
}
