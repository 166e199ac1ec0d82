//! Calendar appointments. Independent of the plan: nothing here touches
//! supplements or slots.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, SupporgError};
use crate::model::{clean_optional, new_id, Appointment, AppointmentDraft, Document};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeSet;

/// Sort key for appointments without a time.
const UNTIMED: &str = "99:99";

/// Accepts `H:MM` or `HH:MM` (24h) and returns the zero-padded form.
pub fn normalize_time(raw: &str) -> Result<String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| SupporgError::validation(format!("Invalid time '{}', expected HH:MM.", raw)))
}

struct CleanDraft {
    title: String,
    time: Option<String>,
    location: Option<String>,
    notes: Option<String>,
}

fn clean(draft: AppointmentDraft) -> Result<CleanDraft> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(SupporgError::validation("Title is required."));
    }
    let time = match clean_optional(draft.time) {
        Some(t) => Some(normalize_time(&t)?),
        None => None,
    };
    Ok(CleanDraft {
        title,
        time,
        location: clean_optional(draft.location),
        notes: clean_optional(draft.notes),
    })
}

pub fn create_appointment(doc: &mut Document, draft: AppointmentDraft) -> Result<CmdResult> {
    let date = draft.date;
    let c = clean(draft)?;
    let now = Utc::now();
    let appt = Appointment {
        id: new_id("appt"),
        title: c.title,
        date,
        time: c.time,
        location: c.location,
        notes: c.notes,
        created_at: now,
        updated_at: now,
    };
    doc.appointments.push(appt.clone());
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!(
            "Appointment saved: {} on {}",
            appt.title, appt.date
        )))
        .with_appointment(appt))
}

/// Rewrites an appointment's fields. `created_at` survives, `updated_at`
/// moves to now.
pub fn update_appointment(doc: &mut Document, id: &str, draft: AppointmentDraft) -> Result<CmdResult> {
    let date = draft.date;
    let c = clean(draft)?;
    let appt = doc
        .appointments
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| SupporgError::AppointmentNotFound(id.to_string()))?;
    appt.title = c.title;
    appt.date = date;
    appt.time = c.time;
    appt.location = c.location;
    appt.notes = c.notes;
    appt.updated_at = Utc::now();

    let appt = appt.clone();
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!("Appointment updated: {}", appt.title)))
        .with_appointment(appt))
}

pub fn delete_appointment(doc: &mut Document, id: &str) -> Result<CmdResult> {
    let pos = doc
        .appointments
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| SupporgError::AppointmentNotFound(id.to_string()))?;
    let appt = doc.appointments.remove(pos);
    Ok(CmdResult::changed()
        .with_message(CmdMessage::success(format!("Appointment deleted: {}", appt.title)))
        .with_appointment(appt))
}

pub fn get_appointment<'a>(doc: &'a Document, id: &str) -> Result<&'a Appointment> {
    doc.appointments
        .iter()
        .find(|a| a.id == id)
        .ok_or_else(|| SupporgError::AppointmentNotFound(id.to_string()))
}

/// Appointments on `date`, by time. Untimed ones come last.
pub fn appointments_for_day(doc: &Document, date: NaiveDate) -> Vec<Appointment> {
    let mut day: Vec<Appointment> = doc
        .appointments
        .iter()
        .filter(|a| a.date == date)
        .cloned()
        .collect();
    day.sort_by(|a, b| {
        let ka = a.time.as_deref().unwrap_or(UNTIMED);
        let kb = b.time.as_deref().unwrap_or(UNTIMED);
        ka.cmp(kb)
    });
    day
}

/// Days of the month that carry at least one appointment.
pub fn appointment_days(doc: &Document, year: i32, month: u32) -> BTreeSet<u32> {
    doc.appointments
        .iter()
        .filter(|a| a.date.year() == year && a.date.month() == month)
        .map(|a| a.date.day())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn timed(title: &str, d: NaiveDate, time: Option<&str>) -> AppointmentDraft {
        let mut draft = AppointmentDraft::new(title, d);
        draft.time = time.map(String::from);
        draft
    }

    #[test]
    fn title_is_required() {
        let mut doc = Document::default();
        assert!(matches!(
            create_appointment(&mut doc, AppointmentDraft::new("  ", date(3, 1))),
            Err(SupporgError::Validation(_))
        ));
        assert!(doc.appointments().is_empty());
    }

    #[test]
    fn time_is_validated_and_padded() {
        assert_eq!(normalize_time("9:05").unwrap(), "09:05");
        assert_eq!(normalize_time("23:59").unwrap(), "23:59");
        assert!(normalize_time("24:00").is_err());
        assert!(normalize_time("noon").is_err());

        let mut doc = Document::default();
        assert!(create_appointment(&mut doc, timed("Dentist", date(3, 1), Some("25:00"))).is_err());
        let res = create_appointment(&mut doc, timed("Dentist", date(3, 1), Some(" "))).unwrap();
        assert_eq!(res.affected_appointments[0].time, None);
    }

    #[test]
    fn update_keeps_created_at() {
        let mut doc = Document::default();
        let id = create_appointment(&mut doc, timed("Dentist", date(3, 1), Some("10:00")))
            .unwrap()
            .affected_appointments[0]
            .id
            .clone();
        let created = doc.appointments()[0].created_at;
        doc.appointments[0].updated_at = created - chrono::Duration::seconds(60);

        let mut draft = timed("Dentist (moved)", date(3, 2), Some("11:30"));
        draft.location = Some("Main St".into());
        update_appointment(&mut doc, &id, draft).unwrap();

        let appt = get_appointment(&doc, &id).unwrap();
        assert_eq!(appt.created_at, created);
        assert!(appt.updated_at >= created);
        assert_eq!(appt.date, date(3, 2));
        assert_eq!(appt.location.as_deref(), Some("Main St"));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut doc = Document::default();
        assert!(matches!(
            delete_appointment(&mut doc, "nope"),
            Err(SupporgError::AppointmentNotFound(_))
        ));
        assert!(matches!(
            update_appointment(&mut doc, "nope", AppointmentDraft::new("x", date(1, 1))),
            Err(SupporgError::AppointmentNotFound(_))
        ));
    }

    #[test]
    fn day_listing_sorts_untimed_last() {
        let mut doc = Document::default();
        create_appointment(&mut doc, timed("Call pharmacy", date(4, 2), None)).unwrap();
        create_appointment(&mut doc, timed("Lab", date(4, 2), Some("14:00"))).unwrap();
        create_appointment(&mut doc, timed("GP", date(4, 2), Some("08:30"))).unwrap();
        create_appointment(&mut doc, timed("Other day", date(4, 3), Some("07:00"))).unwrap();

        let titles: Vec<_> = appointments_for_day(&doc, date(4, 2))
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["GP", "Lab", "Call pharmacy"]);
    }

    #[test]
    fn month_days_are_collected() {
        let mut doc = Document::default();
        for (m, d) in [(4, 2), (4, 2), (4, 17), (5, 1)] {
            create_appointment(&mut doc, AppointmentDraft::new("x", date(m, d))).unwrap();
        }
        let days: Vec<u32> = appointment_days(&doc, 2024, 4).into_iter().collect();
        assert_eq!(days, vec![2, 17]);
        assert!(appointment_days(&doc, 2023, 4).is_empty());
    }

    #[test]
    fn delete_removes_entry() {
        let mut doc = Document::default();
        let id = create_appointment(&mut doc, AppointmentDraft::new("x", date(1, 1)))
            .unwrap()
            .affected_appointments[0]
            .id
            .clone();
        delete_appointment(&mut doc, &id).unwrap();
        assert!(doc.appointments().is_empty());
    }
}
