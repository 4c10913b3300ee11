//! Tattoo reservation book.

use std::fmt;
use std::str::FromStr;

use bevy::log::{info, warn};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::admin::AdminSession;
use super::error::StudioError;

/// Reservation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub u64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a reservation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Submitted, not yet reviewed by the studio.
    Pending,
    /// Accepted by the studio.
    Confirmed,
    /// Withdrawn; frees the slot.
    Cancelled,
}

impl FromStr for ReservationStatus {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            other => Err(StudioError::BadInput(format!("unknown status {other}"))),
        }
    }
}

/// Reservation form as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationRequest {
    /// Customer name.
    pub name: String,
    /// Contact number.
    pub phone: String,
    /// Body part.
    pub part: String,
    /// Tattoo genre.
    pub genre: String,
    /// Free-text design reference.
    pub reference_text: Option<String>,
    /// Uploaded reference image URLs.
    pub reference_images: Vec<String>,
    /// `YYYY-MM-DD`.
    pub reservation_date: String,
    /// `HH:MM`, 24-hour.
    pub reservation_time: String,
}

/// Stored reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Id.
    pub id: ReservationId,
    /// Customer name.
    pub name: String,
    /// Contact number.
    pub phone: String,
    /// Body part.
    pub part: String,
    /// Tattoo genre.
    pub genre: String,
    /// Free-text design reference.
    pub reference_text: Option<String>,
    /// Uploaded reference image URLs.
    pub reference_images: Vec<String>,
    /// Appointment day.
    pub reservation_date: NaiveDate,
    /// Appointment time.
    #[serde(serialize_with = "hour_minute")]
    pub reservation_time: NaiveTime,
    /// Current status.
    pub status: ReservationStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

fn hour_minute<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.format("%H:%M").to_string())
}

fn required(value: &str, field: &'static str) -> Result<String, StudioError> {
    let value = value.trim();
    if value.is_empty() {
        Err(StudioError::MissingField(field))
    } else {
        Ok(value.to_owned())
    }
}

/// Parses `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, StudioError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| StudioError::BadInput(format!("date {s} is not YYYY-MM-DD")))
}

/// Parses 24-hour `HH:MM`.
pub fn parse_time(s: &str) -> Result<NaiveTime, StudioError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| StudioError::BadInput(format!("time {s} is not HH:MM")))
}

/// In-memory reservation store.
#[derive(Debug, Default)]
pub struct ReservationBook {
    records: Vec<Reservation>,
    next_id: u64,
}

impl ReservationBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new reservation as [`ReservationStatus::Pending`].
    ///
    /// A slot already held by a pending or confirmed reservation is a
    /// [`StudioError::Conflict`].
    pub fn submit(
        &mut self,
        req: ReservationRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, StudioError> {
        let name = required(&req.name, "name")?;
        let phone = required(&req.phone, "phone")?;
        let part = required(&req.part, "part")?;
        let genre = required(&req.genre, "genre")?;
        let date = parse_date(&required(&req.reservation_date, "reservationDate")?)?;
        let time = parse_time(&required(&req.reservation_time, "reservationTime")?)?;

        let taken = self.records.iter().any(|r| {
            r.reservation_date == date
                && r.reservation_time == time
                && r.status != ReservationStatus::Cancelled
        });
        if taken {
            warn!("studio: slot {date} {time} already reserved");
            return Err(StudioError::Conflict(format!(
                "{date} {} is already reserved",
                time.format("%H:%M")
            )));
        }

        self.next_id += 1;
        let reservation = Reservation {
            id: ReservationId(self.next_id),
            name,
            phone,
            part,
            genre,
            reference_text: req
                .reference_text
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty()),
            reference_images: req.reference_images,
            reservation_date: date,
            reservation_time: time,
            status: ReservationStatus::Pending,
            created_at: now,
        };
        self.records.push(reservation.clone());
        info!("studio: reservation {} submitted", reservation.id);
        Ok(reservation)
    }

    /// Every reservation, newest submission first.
    pub fn list(&self, _admin: &AdminSession) -> Vec<Reservation> {
        let mut all = self.records.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all
    }

    /// One reservation.
    pub fn get(&self, _admin: &AdminSession, id: ReservationId) -> Result<Reservation, StudioError> {
        self.position(id).map(|i| self.records[i].clone())
    }

    /// Changes a reservation's status.
    pub fn set_status(
        &mut self,
        admin: &AdminSession,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation, StudioError> {
        let i = self.position(id)?;
        let record = &mut self.records[i];
        record.status = status;
        info!(
            "studio: {} set reservation {id} to {status:?}",
            admin.username()
        );
        Ok(record.clone())
    }

    /// Removes a reservation permanently.
    pub fn delete(&mut self, admin: &AdminSession, id: ReservationId) -> Result<(), StudioError> {
        let i = self.position(id)?;
        self.records.remove(i);
        info!("studio: {} deleted reservation {id}", admin.username());
        Ok(())
    }

    /// Number of stored reservations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the book is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: ReservationId) -> Result<usize, StudioError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StudioError::NotFound {
                kind: "reservation",
                id: id.0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::admin::AdminDesk;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 20, 10, 0, 0).unwrap()
    }

    fn admin() -> AdminSession {
        let mut desk = AdminDesk::new();
        let token = desk.login("admin", "pw", t0()).unwrap();
        desk.verify(Some(token.as_str()), t0()).unwrap()
    }

    fn kim() -> ReservationRequest {
        ReservationRequest {
            name: "Kim".into(),
            phone: "010-1234-5678".into(),
            part: "Arm".into(),
            genre: "Blackwork".into(),
            reservation_date: "2025-05-01".into(),
            reservation_time: "14:00".into(),
            ..Default::default()
        }
    }

    // ── submit ──────────────────────────────────────────────────────

    #[test]
    fn submit_confirm_delete_round() {
        let admin = admin();
        let mut book = ReservationBook::new();

        let created = book.submit(kim(), t0()).unwrap();
        assert_eq!(created.status, ReservationStatus::Pending);
        assert_eq!(created.name, "Kim");
        assert_eq!(created.reservation_date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());

        book.set_status(&admin, created.id, ReservationStatus::Confirmed)
            .unwrap();
        let fetched = book.get(&admin, created.id).unwrap();
        assert_eq!(fetched.status, ReservationStatus::Confirmed);

        book.delete(&admin, created.id).unwrap();
        assert!(matches!(
            book.get(&admin, created.id),
            Err(StudioError::NotFound { .. })
        ));
        assert!(book.is_empty());
        assert!(matches!(
            book.delete(&admin, created.id),
            Err(StudioError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_fields_are_named() {
        let mut book = ReservationBook::new();
        let mut req = kim();
        req.phone = "  ".into();
        assert_eq!(
            book.submit(req, t0()),
            Err(StudioError::MissingField("phone"))
        );
        let mut req = kim();
        req.reservation_time.clear();
        assert_eq!(
            book.submit(req, t0()),
            Err(StudioError::MissingField("reservationTime"))
        );
    }

    #[test]
    fn malformed_date_and_time_are_bad_input() {
        let mut book = ReservationBook::new();
        let mut req = kim();
        req.reservation_date = "05/01/2025".into();
        assert!(matches!(book.submit(req, t0()), Err(StudioError::BadInput(_))));
        let mut req = kim();
        req.reservation_time = "2pm".into();
        assert!(matches!(book.submit(req, t0()), Err(StudioError::BadInput(_))));
        assert!(book.is_empty());
    }

    #[test]
    fn taken_slot_conflicts_until_cancelled() {
        let admin = admin();
        let mut book = ReservationBook::new();
        let first = book.submit(kim(), t0()).unwrap();

        let mut lee = kim();
        lee.name = "Lee".into();
        assert!(matches!(
            book.submit(lee.clone(), t0()),
            Err(StudioError::Conflict(_))
        ));

        book.set_status(&admin, first.id, ReservationStatus::Cancelled)
            .unwrap();
        assert!(book.submit(lee, t0()).is_ok());
    }

    // ── listing / json ──────────────────────────────────────────────

    #[test]
    fn list_is_newest_first() {
        let admin = admin();
        let mut book = ReservationBook::new();
        let mut early = kim();
        early.reservation_time = "11:00".into();
        book.submit(early, t0()).unwrap();
        book.submit(kim(), t0() + Duration::minutes(5)).unwrap();

        let listed = book.list(&admin);
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at > listed[1].created_at);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("confirmed".parse::<ReservationStatus>(), Ok(ReservationStatus::Confirmed));
        assert_eq!(" CANCELLED ".parse::<ReservationStatus>(), Ok(ReservationStatus::Cancelled));
        assert!("DONE".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn request_and_record_use_site_field_names() {
        let req: ReservationRequest = serde_json::from_str(
            r#"{"name":"Kim","phone":"010-1234-5678","part":"Arm","genre":"Blackwork",
                "referenceText":"small rose","reservationDate":"2025-05-01","reservationTime":"14:00"}"#,
        )
        .unwrap();
        let mut book = ReservationBook::new();
        let created = book.submit(req, t0()).unwrap();

        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["reservationDate"], "2025-05-01");
        assert_eq!(json["reservationTime"], "14:00");
        assert_eq!(json["referenceText"], "small rose");
    }
}
