//! # Documents
//!
//! The three denormalized records a booking touches, plus the identity
//! records used for login.
//!
//! Ids are ObjectId hex strings so they round-trip cleanly between BSON
//! and the JSON surface. Calendar dates are day-granular by design:
//! availability matching compares dates, never timestamps.

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

// ---------------------------------------------------------------------------
// College

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct College {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_conducting_exam_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_eligibility_qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_fees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_eligibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programmes_offered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_year_cut_off: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_syllabus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_slots: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_mode: Option<String>,

    #[serde(default)]
    pub booked_dates: Vec<BookedDate>,
}

/// One calendar date a college holds seats on. At most one entry per
/// distinct date; within it, at most one slot record per
/// (Slot, TestCenterId) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookedDate {
    pub date: NaiveDate,
    pub slots: Vec<BookedSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookedSlot {
    pub slot: String,
    pub seats_booked: i64,
    pub test_center_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Test center

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestCenter {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_center_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Per-slot-per-date capacity every availability entry is seeded at.
    #[serde(default)]
    pub normal_vacancy: i64,
    /// Running sum of all remaining seats across `BookingAvailableSeats`.
    #[serde(default)]
    pub total_vacancy: i64,

    #[serde(default)]
    pub booking_available_seats: Vec<AvailabilityDay>,
    #[serde(default)]
    pub booking_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailabilityDay {
    pub booking_date: NaiveDate,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailabilitySlot {
    pub slot: String,
    pub available_seats: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    pub college_id: String,
    pub booking_date: NaiveDate,
    pub slots: Vec<HistorySlot>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistorySlot {
    pub slot: String,
    pub seats_booked: i64,
}

// ---------------------------------------------------------------------------
// Booking

/// Cross-reference document linking one college to the
/// (test center, date, slot, seats) tuples it requested. The same seat
/// counts are projected into the college and test-center ledgers, which
/// is why create/update fan out to three documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Booking {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    pub college: String,
    pub test_centers: Vec<BookingCenter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookingCenter {
    pub test_center_id: String,
    pub booking_dates: Vec<BookingDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookingDay {
    pub date: NaiveDate,
    pub slots: Vec<BookingSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookingSlot {
    pub slot: String,
    pub seats_to_book: i64,
}

// ---------------------------------------------------------------------------
// Identity records

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeAuthority {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    pub email: String,
    pub password: String,
    pub college_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCenterManager {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    pub email: String,
    pub password: String,
    pub test_center_id: String,
}

// ---------------------------------------------------------------------------
// Registration payload

/// Caller-supplied test-center fields. `AvailableDates`/`AvailableSlots`
/// only drive the seeded availability ledger and are not stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestCenterData {
    #[serde(default)]
    pub test_center_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub normal_vacancy: i64,
    pub available_dates: Vec<NaiveDate>,
    pub available_slots: Vec<String>,
}
