//! Studio desk: the services behind the site's reservation, review and admin
//! pages.
//!
//! Everything is in memory. Operations that need an admin take an
//! [`AdminSession`], so an unauthenticated caller cannot reach them.

mod admin;
mod consent;
mod error;
mod reservations;
mod reviews;

pub use admin::{
    AdminDesk, AdminRole, AdminSession, LOGIN_PATH, RouteDecision, SESSION_COOKIE,
    SESSION_TTL_HOURS, SameSite, SessionCookie, SessionToken,
};
pub use consent::{ConsentForm, ConsentPage, ConsentSection};
pub use error::{AuthFailure, StudioError};
pub use reservations::{
    Reservation, ReservationBook, ReservationId, ReservationRequest, ReservationStatus, parse_date,
    parse_time,
};
pub use reviews::{
    Review, ReviewBoard, ReviewDeleter, ReviewEdit, ReviewId, ReviewRequest, ReviewView,
    mask_author,
};

use chrono::{DateTime, Utc};

/// The three desk services behind one handle.
#[derive(Debug, Default)]
pub struct StudioDesk {
    /// Accounts and sessions.
    pub admin: AdminDesk,
    /// Reservations.
    pub reservations: ReservationBook,
    /// Reviews.
    pub reviews: ReviewBoard,
}

impl StudioDesk {
    /// Empty desk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consent form for a reservation, looked up as an admin.
    pub fn consent_form(
        &mut self,
        token: Option<&str>,
        id: ReservationId,
        now: DateTime<Utc>,
    ) -> Result<ConsentForm, StudioError> {
        let session = self.admin.verify(token, now)?;
        let reservation = self.reservations.get(&session, id)?;
        Ok(ConsentForm::for_reservation(&reservation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn reservation_lifecycle_through_admin_cookie() {
        let mut desk = StudioDesk::new();
        let created = desk
            .reservations
            .submit(
                ReservationRequest {
                    name: "Kim".into(),
                    phone: "010-1234-5678".into(),
                    part: "Arm".into(),
                    genre: "Blackwork".into(),
                    reservation_date: "2025-05-01".into(),
                    reservation_time: "14:00".into(),
                    ..Default::default()
                },
                t0(),
            )
            .unwrap();
        assert_eq!(created.status, ReservationStatus::Pending);

        let token = desk.admin.login("admin", "studio", t0()).unwrap();
        let cookie = SessionCookie::issue(&token, false);
        let session = desk.admin.verify(Some(&cookie.value), t0()).unwrap();

        desk.reservations
            .set_status(&session, created.id, ReservationStatus::Confirmed)
            .unwrap();
        let listed = desk.reservations.list(&session);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ReservationStatus::Confirmed);

        let form = desk
            .consent_form(Some(token.as_str()), created.id, t0())
            .unwrap();
        assert_eq!(form.file_name(), "consent_Kim_2025-05-01.txt");

        desk.reservations.delete(&session, created.id).unwrap();
        assert!(desk.reservations.list(&session).is_empty());
    }

    #[test]
    fn consent_export_needs_live_session() {
        let mut desk = StudioDesk::new();
        let token = desk.admin.login("admin", "studio", t0()).unwrap();
        let late = t0() + Duration::hours(SESSION_TTL_HOURS);
        assert_eq!(
            desk.consent_form(Some(token.as_str()), ReservationId(1), late),
            Err(StudioError::Auth(AuthFailure::SessionExpired))
        );
        assert_eq!(
            desk.consent_form(None, ReservationId(1), t0()),
            Err(StudioError::Auth(AuthFailure::MissingCredentials))
        );
    }
}
