//! # Booking reconciliation
//!
//! The seat arithmetic behind booking create/update. One booked tuple
//! (test center, date, slot, seats) fans out to three ledgers: the test
//! center's availability, the test center's history, and the college's
//! booked-dates. Everything here works on in-memory documents so the
//! handlers can validate and apply a whole request before writing
//! anything back, and so the arithmetic is testable without a database.
//!
//! Matching is day-granular: availability entries are located by
//! calendar-date equality, never by timestamp.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::AppError,
    models::{
        AvailabilityDay, AvailabilitySlot, BookedDate, BookedSlot, BookingCenter, College,
        HistoryEntry, HistorySlot, TestCenter,
    },
};

/// Materializes the dates × slots cross product, every slot seeded at
/// `normal_vacancy`. Returns the derived total vacancy alongside.
pub fn seed_availability(
    normal_vacancy: i64,
    dates: &[NaiveDate],
    slots: &[String],
) -> (i64, Vec<AvailabilityDay>) {
    let days = dates
        .iter()
        .map(|&date| AvailabilityDay {
            booking_date: date,
            slots: slots
                .iter()
                .map(|slot| AvailabilitySlot {
                    slot: slot.clone(),
                    available_seats: normal_vacancy,
                })
                .collect(),
        })
        .collect();

    let total = normal_vacancy * dates.len() as i64 * slots.len() as i64;

    (total, days)
}

/// Applies one requested center of a new booking against the in-memory
/// documents. Seats are checked before any mutation of the tuple, so a
/// capacity failure leaves nothing half-applied for that tuple; the
/// caller discards all in-memory state on error, nothing having been
/// persisted yet.
pub fn apply_booking(
    center: &mut TestCenter,
    college: &mut College,
    booking_id: &str,
    request: &BookingCenter,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    for day in &request.booking_dates {
        let Some(avail_day) = center
            .booking_available_seats
            .iter_mut()
            .find(|d| d.booking_date == day.date)
        else {
            return Err(AppError::NoAvailability(day.date));
        };

        for slot_req in &day.slots {
            let entry = avail_day
                .slots
                .iter_mut()
                .find(|s| s.slot == slot_req.slot);

            let slot_entry = match entry {
                Some(slot_entry) if slot_entry.available_seats >= slot_req.seats_to_book => {
                    slot_entry
                }
                other => {
                    return Err(AppError::InsufficientSeats {
                        slot: slot_req.slot.clone(),
                        date: day.date,
                        available: other.map_or(0, |s| s.available_seats),
                    });
                }
            };

            // One slot record per (Slot, TestCenterId) within a date; the
            // update path relies on this when locating the entry to mutate.
            let duplicate = college.booked_dates.iter().any(|d| {
                d.date == day.date
                    && d.slots.iter().any(|s| {
                        s.slot == slot_req.slot && s.test_center_id == request.test_center_id
                    })
            });
            if duplicate {
                return Err(AppError::InvalidState(format!(
                    "Slot {} on {} already booked at this test center",
                    slot_req.slot, day.date
                )));
            }

            slot_entry.available_seats -= slot_req.seats_to_book;
            center.total_vacancy -= slot_req.seats_to_book;

            center.booking_history.push(HistoryEntry {
                college_id: college.id.clone(),
                booking_date: day.date,
                slots: vec![HistorySlot {
                    slot: slot_req.slot.clone(),
                    seats_booked: slot_req.seats_to_book,
                }],
                timestamp: now,
            });

            let booked_slot = BookedSlot {
                slot: slot_req.slot.clone(),
                seats_booked: slot_req.seats_to_book,
                test_center_id: request.test_center_id.clone(),
                booking_id: Some(booking_id.to_string()),
            };

            match college.booked_dates.iter_mut().find(|d| d.date == day.date) {
                Some(existing) => existing.slots.push(booked_slot),
                None => college.booked_dates.push(BookedDate {
                    date: day.date,
                    slots: vec![booked_slot],
                }),
            }
        }
    }

    Ok(())
}

/// Applies one requested center of a booking update. Every requested
/// tuple is diffed against the `old` tree stored on the booking;
/// `delta = old - new` is added to the availability ledger (so growing a
/// booking takes seats, shrinking it frees them) and the matching
/// history and booked-dates records are rewritten in place. A tuple
/// absent from the original booking is an [`AppError::InvalidState`].
pub fn apply_update(
    center: &mut TestCenter,
    college: &mut College,
    old: &BookingCenter,
    request: &BookingCenter,
) -> Result<(), AppError> {
    for day in &request.booking_dates {
        let Some(avail_day) = center
            .booking_available_seats
            .iter_mut()
            .find(|d| d.booking_date == day.date)
        else {
            return Err(AppError::NoAvailability(day.date));
        };

        for slot_req in &day.slots {
            let old_slot = old
                .booking_dates
                .iter()
                .find(|d| d.date == day.date)
                .and_then(|d| d.slots.iter().find(|s| s.slot == slot_req.slot))
                .ok_or_else(|| {
                    AppError::InvalidState(format!(
                        "Slot {} on {} was never part of the original booking",
                        slot_req.slot, day.date
                    ))
                })?;

            let delta = old_slot.seats_to_book - slot_req.seats_to_book;

            let slot_entry = avail_day
                .slots
                .iter_mut()
                .find(|s| s.slot == slot_req.slot)
                .ok_or_else(|| {
                    AppError::InvalidState(format!(
                        "No availability slot {} on {}",
                        slot_req.slot, day.date
                    ))
                })?;

            // Growing the booking consumes seats; never let the ledger
            // go negative.
            if delta < 0 && slot_entry.available_seats < -delta {
                return Err(AppError::InsufficientSeats {
                    slot: slot_req.slot.clone(),
                    date: day.date,
                    available: slot_entry.available_seats,
                });
            }

            slot_entry.available_seats += delta;
            center.total_vacancy += delta;

            let history = center
                .booking_history
                .iter_mut()
                .find(|h| {
                    h.college_id == college.id
                        && h.booking_date == day.date
                        && h.slots.iter().any(|s| s.slot == slot_req.slot)
                })
                .ok_or_else(|| {
                    AppError::InvalidState(format!(
                        "No booking history for slot {} on {}",
                        slot_req.slot, day.date
                    ))
                })?;
            for slot in &mut history.slots {
                if slot.slot == slot_req.slot {
                    slot.seats_booked = slot_req.seats_to_book;
                }
            }

            let booked = college
                .booked_dates
                .iter_mut()
                .find(|d| d.date == day.date)
                .and_then(|d| {
                    d.slots.iter_mut().find(|s| {
                        s.slot == slot_req.slot && s.test_center_id == request.test_center_id
                    })
                })
                .ok_or_else(|| {
                    AppError::InvalidState(format!(
                        "No booked-dates record for slot {} on {}",
                        slot_req.slot, day.date
                    ))
                })?;
            booked.seats_booked = slot_req.seats_to_book;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BookingDay, BookingSlot};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn center(normal: i64, dates: &[&str], slots: &[&str]) -> TestCenter {
        let dates: Vec<NaiveDate> = dates.iter().map(|d| date(d)).collect();
        let slots: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
        let (total, available) = seed_availability(normal, &dates, &slots);

        TestCenter {
            id: "center-1".into(),
            test_center_name: Some("Central".into()),
            location: Some("Springfield".into()),
            normal_vacancy: normal,
            total_vacancy: total,
            booking_available_seats: available,
            booking_history: Vec::new(),
        }
    }

    fn college() -> College {
        College {
            id: "college-1".into(),
            college_name: Some("State College".into()),
            college_conducting_exam_name: None,
            exam_eligibility_qualification: None,
            exam_fees: None,
            nationality: None,
            age_limit: None,
            subject_eligibility: None,
            programmes_offered: None,
            previous_year_cut_off: None,
            exam_syllabus: None,
            seat_availability: None,
            exam_date: None,
            exam_slots: None,
            exam_duration: None,
            exam_pattern: None,
            exam_type: None,
            exam_mode: None,
            booked_dates: Vec::new(),
        }
    }

    fn request(center_id: &str, tuples: &[(&str, &str, i64)]) -> BookingCenter {
        let mut booking_dates: Vec<BookingDay> = Vec::new();
        for &(d, slot, seats) in tuples {
            let d = date(d);
            let slot_req = BookingSlot {
                slot: slot.into(),
                seats_to_book: seats,
            };
            match booking_dates.iter_mut().find(|day| day.date == d) {
                Some(day) => day.slots.push(slot_req),
                None => booking_dates.push(BookingDay {
                    date: d,
                    slots: vec![slot_req],
                }),
            }
        }

        BookingCenter {
            test_center_id: center_id.into(),
            booking_dates,
        }
    }

    fn available(center: &TestCenter, d: &str, slot: &str) -> i64 {
        center
            .booking_available_seats
            .iter()
            .find(|day| day.booking_date == date(d))
            .unwrap()
            .slots
            .iter()
            .find(|s| s.slot == slot)
            .unwrap()
            .available_seats
    }

    #[test]
    fn seeding_covers_cross_product() {
        let c = center(20, &["2025-04-01", "2025-04-02"], &["Morning", "Evening"]);

        assert_eq!(c.total_vacancy, 80);
        assert_eq!(c.booking_available_seats.len(), 2);
        for day in &c.booking_available_seats {
            assert_eq!(day.slots.len(), 2);
            for slot in &day.slots {
                assert_eq!(slot.available_seats, 20);
            }
        }
    }

    #[test]
    fn booking_decrements_all_three_ledgers() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();
        let req = request("center-1", &[("2025-04-01", "Morning", 15)]);

        apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap();

        assert_eq!(available(&c, "2025-04-01", "Morning"), 5);
        assert_eq!(available(&c, "2025-04-01", "Evening"), 20);
        assert_eq!(c.total_vacancy, 25);

        assert_eq!(c.booking_history.len(), 1);
        let history = &c.booking_history[0];
        assert_eq!(history.college_id, "college-1");
        assert_eq!(history.slots[0].seats_booked, 15);

        assert_eq!(col.booked_dates.len(), 1);
        let booked = &col.booked_dates[0].slots[0];
        assert_eq!(booked.seats_booked, 15);
        assert_eq!(booked.test_center_id, "center-1");
        assert_eq!(booked.booking_id.as_deref(), Some("booking-1"));
    }

    #[test]
    fn overbooking_reports_actual_availability() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();

        let first = request("center-1", &[("2025-04-01", "Morning", 15)]);
        apply_booking(&mut c, &mut col, "booking-1", &first, Utc::now()).unwrap();

        let mut other = college();
        other.id = "college-2".into();
        let second = request("center-1", &[("2025-04-01", "Morning", 10)]);
        let err = apply_booking(&mut c, &mut other, "booking-2", &second, Utc::now()).unwrap_err();

        match err {
            AppError::InsufficientSeats { available, .. } => assert_eq!(available, 5),
            other => panic!("unexpected error: {other:?}"),
        }

        // Nothing moved on the failed attempt.
        assert_eq!(available(&c, "2025-04-01", "Morning"), 5);
        assert_eq!(c.total_vacancy, 25);
        assert_eq!(c.booking_history.len(), 1);
        assert!(other.booked_dates.is_empty());
    }

    #[test]
    fn absent_slot_reports_zero_available() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();
        let req = request("center-1", &[("2025-04-01", "Night", 1)]);

        let err = apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap_err();

        match err {
            AppError::InsufficientSeats { available, .. } => assert_eq!(available, 0),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_date_is_no_availability() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();
        let req = request("center-1", &[("2025-05-01", "Morning", 1)]);

        let err = apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::NoAvailability(d) if d == date("2025-05-01")));
    }

    #[test]
    fn same_date_second_slot_joins_existing_booked_date() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();
        let req = request(
            "center-1",
            &[("2025-04-01", "Morning", 5), ("2025-04-01", "Evening", 3)],
        );

        apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap();

        assert_eq!(col.booked_dates.len(), 1);
        assert_eq!(col.booked_dates[0].slots.len(), 2);
        assert_eq!(c.booking_history.len(), 2);
        assert_eq!(c.total_vacancy, 32);
    }

    #[test]
    fn rebooking_same_slot_and_center_is_rejected() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();

        let req = request("center-1", &[("2025-04-01", "Morning", 3)]);
        apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap();

        let again = request("center-1", &[("2025-04-01", "Morning", 2)]);
        let err = apply_booking(&mut c, &mut col, "booking-2", &again, Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn update_with_unchanged_seats_is_a_no_op() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();
        let req = request("center-1", &[("2025-04-01", "Morning", 10)]);
        apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap();

        apply_update(&mut c, &mut col, &req, &req).unwrap();

        assert_eq!(available(&c, "2025-04-01", "Morning"), 10);
        assert_eq!(c.total_vacancy, 10);
        assert_eq!(c.booking_history[0].slots[0].seats_booked, 10);
        assert_eq!(col.booked_dates[0].slots[0].seats_booked, 10);
    }

    #[test]
    fn shrinking_a_booking_frees_exactly_the_difference() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();
        let old = request("center-1", &[("2025-04-01", "Morning", 10)]);
        apply_booking(&mut c, &mut col, "booking-1", &old, Utc::now()).unwrap();
        assert_eq!(available(&c, "2025-04-01", "Morning"), 10);

        let new = request("center-1", &[("2025-04-01", "Morning", 5)]);
        apply_update(&mut c, &mut col, &old, &new).unwrap();

        assert_eq!(available(&c, "2025-04-01", "Morning"), 15);
        assert_eq!(available(&c, "2025-04-01", "Evening"), 20);
        assert_eq!(c.total_vacancy, 35);
        assert_eq!(c.booking_history[0].slots[0].seats_booked, 5);
        assert_eq!(col.booked_dates[0].slots[0].seats_booked, 5);
    }

    #[test]
    fn growing_a_booking_takes_seats() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();
        let old = request("center-1", &[("2025-04-01", "Morning", 5)]);
        apply_booking(&mut c, &mut col, "booking-1", &old, Utc::now()).unwrap();

        let new = request("center-1", &[("2025-04-01", "Morning", 12)]);
        apply_update(&mut c, &mut col, &old, &new).unwrap();

        assert_eq!(available(&c, "2025-04-01", "Morning"), 8);
        assert_eq!(c.total_vacancy, 8);
        assert_eq!(col.booked_dates[0].slots[0].seats_booked, 12);
    }

    #[test]
    fn growing_past_availability_is_rejected() {
        let mut c = center(20, &["2025-04-01"], &["Morning"]);
        let mut col = college();
        let old = request("center-1", &[("2025-04-01", "Morning", 5)]);
        apply_booking(&mut c, &mut col, "booking-1", &old, Utc::now()).unwrap();

        // 15 remain; growing by 16 would drive the ledger negative.
        let new = request("center-1", &[("2025-04-01", "Morning", 21)]);
        let err = apply_update(&mut c, &mut col, &old, &new).unwrap_err();

        match err {
            AppError::InsufficientSeats { available, .. } => assert_eq!(available, 15),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(available(&c, "2025-04-01", "Morning"), 15);
        assert_eq!(c.total_vacancy, 15);
    }

    #[test]
    fn updating_a_tuple_never_booked_is_invalid_state() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();
        let old = request("center-1", &[("2025-04-01", "Morning", 5)]);
        apply_booking(&mut c, &mut col, "booking-1", &old, Utc::now()).unwrap();

        let new = request("center-1", &[("2025-04-01", "Evening", 5)]);
        let err = apply_update(&mut c, &mut col, &old, &new).unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(available(&c, "2025-04-01", "Evening"), 20);
        assert_eq!(c.total_vacancy, 15);
    }

    #[test]
    fn update_leaves_other_slots_untouched() {
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        let mut col = college();
        let old = request(
            "center-1",
            &[("2025-04-01", "Morning", 10), ("2025-04-01", "Evening", 4)],
        );
        apply_booking(&mut c, &mut col, "booking-1", &old, Utc::now()).unwrap();

        let new = request(
            "center-1",
            &[("2025-04-01", "Morning", 5), ("2025-04-01", "Evening", 4)],
        );
        apply_update(&mut c, &mut col, &old, &new).unwrap();

        assert_eq!(available(&c, "2025-04-01", "Morning"), 15);
        assert_eq!(available(&c, "2025-04-01", "Evening"), 16);
        assert_eq!(c.total_vacancy, 31);
    }

    #[test]
    fn registration_scenario_from_the_booking_flow() {
        // normalVacancy=20, one date, two slots.
        let mut c = center(20, &["2025-04-01"], &["Morning", "Evening"]);
        assert_eq!(c.total_vacancy, 40);
        assert_eq!(c.booking_available_seats[0].slots.len(), 2);

        let mut col = college();
        let req = request("center-1", &[("2025-04-01", "Morning", 15)]);
        apply_booking(&mut c, &mut col, "booking-1", &req, Utc::now()).unwrap();
        assert_eq!(available(&c, "2025-04-01", "Morning"), 5);
        assert_eq!(c.total_vacancy, 25);

        let mut other = college();
        other.id = "college-2".into();
        let more = request("center-1", &[("2025-04-01", "Morning", 10)]);
        let err = apply_booking(&mut c, &mut other, "booking-2", &more, Utc::now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not enough seats in slot Morning on 2025-04-01 (Available: 5)"
        );
    }
}
