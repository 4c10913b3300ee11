//! Customer reviews with a per-review numeric password.
//!
//! The author's password gates editing and deletion. Admins may delete any
//! review but can never edit one.

use bevy::log::{info, warn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::admin::AdminSession;
use super::error::StudioError;

/// Review id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub u64);

/// Review form as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewRequest {
    /// Author name.
    pub author: String,
    /// Optional digits-only password for later edits.
    pub password: Option<String>,
    /// Star rating, 1 to 5.
    pub rating: Option<i64>,
    /// Review body.
    pub text: Option<String>,
    /// Attached photo URL.
    pub image_url: Option<String>,
    /// Show only a masked author name.
    pub is_anonymous: bool,
}

/// Fields an author may change. `None` keeps the current value, except the
/// rating, which must always be supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewEdit {
    /// New rating.
    pub rating: Option<i64>,
    /// New text.
    pub text: Option<String>,
    /// New photo URL.
    pub image_url: Option<String>,
}

/// Who is deleting a review.
#[derive(Debug, Clone, Copy)]
pub enum ReviewDeleter<'a> {
    /// The author, proving it with the review password.
    Author(Option<&'a str>),
    /// An admin; the password is not needed.
    Admin(&'a AdminSession),
}

/// Stored review. The password never leaves the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Id.
    pub id: ReviewId,
    /// Author name as entered.
    pub author: String,
    #[serde(skip)]
    password: Option<String>,
    /// Star rating.
    pub rating: u8,
    /// Review body.
    pub text: Option<String>,
    /// Attached photo URL.
    pub image_url: Option<String>,
    /// Author name is masked publicly.
    pub is_anonymous: bool,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Whether edits and author deletes are possible.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Public listing entry.
    pub fn public_view(&self) -> ReviewView {
        ReviewView {
            id: self.id,
            author: if self.is_anonymous {
                mask_author(&self.author)
            } else {
                self.author.clone()
            },
            rating: self.rating,
            text: self.text.clone(),
            image_url: self.image_url.clone(),
            is_anonymous: self.is_anonymous,
            created_at: self.created_at,
        }
    }
}

/// Review as shown on the public site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    /// Id.
    pub id: ReviewId,
    /// Author, masked when anonymous.
    pub author: String,
    /// Star rating.
    pub rating: u8,
    /// Review body.
    pub text: Option<String>,
    /// Attached photo URL.
    pub image_url: Option<String>,
    /// Author name is masked.
    pub is_anonymous: bool,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// First character followed by `**`.
pub fn mask_author(author: &str) -> String {
    match author.trim().chars().next() {
        Some(first) => format!("{first}**"),
        None => "**".to_owned(),
    }
}

fn validate_rating(rating: Option<i64>) -> Result<u8, StudioError> {
    match rating {
        None => Err(StudioError::MissingField("rating")),
        Some(r @ 1..=5) => Ok(r as u8),
        Some(r) => Err(StudioError::BadInput(format!("rating {r} is not between 1 and 5"))),
    }
}

fn validate_password(password: Option<String>) -> Result<Option<String>, StudioError> {
    match password.map(|p| p.trim().to_owned()) {
        None => Ok(None),
        Some(p) if p.is_empty() => Ok(None),
        Some(p) if p.chars().all(|c| c.is_ascii_digit()) => Ok(Some(p)),
        Some(_) => Err(StudioError::BadInput("password must be digits only".to_owned())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// In-memory review store.
#[derive(Debug, Default)]
pub struct ReviewBoard {
    records: Vec<Review>,
    next_id: u64,
}

impl ReviewBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a review.
    pub fn create(&mut self, req: ReviewRequest, now: DateTime<Utc>) -> Result<Review, StudioError> {
        let author = req.author.trim();
        if author.is_empty() {
            return Err(StudioError::MissingField("author"));
        }
        let rating = validate_rating(req.rating)?;
        let password = validate_password(req.password)?;

        self.next_id += 1;
        let review = Review {
            id: ReviewId(self.next_id),
            author: author.to_owned(),
            password,
            rating,
            text: non_empty(req.text),
            image_url: non_empty(req.image_url),
            is_anonymous: req.is_anonymous,
            created_at: now,
        };
        self.records.push(review.clone());
        info!("studio: review {} posted", review.id.0);
        Ok(review)
    }

    /// Public listing, newest first.
    pub fn list(&self) -> Vec<ReviewView> {
        let mut views: Vec<ReviewView> = self.records.iter().map(Review::public_view).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        views
    }

    /// Author-only edit.
    pub fn update(
        &mut self,
        id: ReviewId,
        password: Option<&str>,
        edit: ReviewEdit,
    ) -> Result<Review, StudioError> {
        let i = self.position(id)?;
        check_author(&self.records[i], password, "reviews without a password cannot be edited")?;
        let rating = validate_rating(edit.rating)?;

        let review = &mut self.records[i];
        review.rating = rating;
        if let Some(text) = edit.text {
            review.text = non_empty(Some(text));
        }
        if let Some(url) = edit.image_url {
            review.image_url = non_empty(Some(url));
        }
        Ok(review.clone())
    }

    /// Deletes a review as its author or as an admin.
    pub fn delete(&mut self, id: ReviewId, by: ReviewDeleter<'_>) -> Result<(), StudioError> {
        let i = self.position(id)?;
        match by {
            ReviewDeleter::Admin(admin) => {
                info!("studio: {} removed review {}", admin.username(), id.0);
            }
            ReviewDeleter::Author(password) => {
                check_author(
                    &self.records[i],
                    password,
                    "reviews without a password can only be removed by the studio",
                )?;
            }
        }
        self.records.remove(i);
        Ok(())
    }

    /// Full record, for tests and admin tooling.
    pub fn get(&self, id: ReviewId) -> Result<&Review, StudioError> {
        self.position(id).map(|i| &self.records[i])
    }

    fn position(&self, id: ReviewId) -> Result<usize, StudioError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StudioError::NotFound {
                kind: "review",
                id: id.0,
            })
    }
}

fn check_author(
    review: &Review,
    password: Option<&str>,
    no_password: &'static str,
) -> Result<(), StudioError> {
    let Some(stored) = review.password.as_deref() else {
        return Err(StudioError::Forbidden(no_password));
    };
    let Some(given) = password.map(str::trim).filter(|p| !p.is_empty()) else {
        return Err(StudioError::MissingField("password"));
    };
    if given != stored {
        warn!("studio: wrong password for review {}", review.id.0);
        return Err(StudioError::Forbidden("password does not match"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::admin::AdminDesk;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, 18, 30, 0).unwrap()
    }

    fn request(password: Option<&str>) -> ReviewRequest {
        ReviewRequest {
            author: "Park".into(),
            password: password.map(str::to_owned),
            rating: Some(5),
            text: Some("Clean lines, great aftercare notes.".into()),
            ..Default::default()
        }
    }

    // ── password gate ───────────────────────────────────────────────

    #[test]
    fn wrong_password_keeps_review_right_one_deletes() {
        let mut board = ReviewBoard::new();
        let review = board.create(request(Some("1234")), t0()).unwrap();

        let denied = board.delete(review.id, ReviewDeleter::Author(Some("0000")));
        assert!(matches!(denied, Err(StudioError::Forbidden(_))));
        assert!(board.get(review.id).is_ok());

        board
            .delete(review.id, ReviewDeleter::Author(Some("1234")))
            .unwrap();
        assert!(matches!(
            board.get(review.id),
            Err(StudioError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_password_is_reported_as_missing() {
        let mut board = ReviewBoard::new();
        let review = board.create(request(Some("1234")), t0()).unwrap();
        assert_eq!(
            board.delete(review.id, ReviewDeleter::Author(None)),
            Err(StudioError::MissingField("password"))
        );
    }

    #[test]
    fn passwordless_review_only_admin_can_delete() {
        let mut desk = AdminDesk::new();
        let token = desk.login("admin", "pw", t0()).unwrap();
        let admin = desk.verify(Some(token.as_str()), t0()).unwrap();

        let mut board = ReviewBoard::new();
        let review = board.create(request(None), t0()).unwrap();
        assert!(!review.has_password());
        assert!(matches!(
            board.delete(review.id, ReviewDeleter::Author(Some("1234"))),
            Err(StudioError::Forbidden(_))
        ));
        board.delete(review.id, ReviewDeleter::Admin(&admin)).unwrap();
        assert!(board.list().is_empty());
    }

    #[test]
    fn edit_needs_author_password() {
        let mut board = ReviewBoard::new();
        let review = board.create(request(Some("1234")), t0()).unwrap();
        let edit = ReviewEdit {
            rating: Some(4),
            text: Some("Healed nicely.".into()),
            image_url: None,
        };

        assert!(matches!(
            board.update(review.id, Some("9999"), edit.clone()),
            Err(StudioError::Forbidden(_))
        ));
        let updated = board.update(review.id, Some("1234"), edit).unwrap();
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.text.as_deref(), Some("Healed nicely."));

        let no_rating = ReviewEdit::default();
        assert_eq!(
            board.update(review.id, Some("1234"), no_rating),
            Err(StudioError::MissingField("rating"))
        );
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn rating_and_password_are_validated() {
        let mut board = ReviewBoard::new();
        let mut req = request(None);
        req.rating = Some(6);
        assert!(matches!(board.create(req, t0()), Err(StudioError::BadInput(_))));

        let mut req = request(None);
        req.rating = None;
        assert_eq!(board.create(req, t0()), Err(StudioError::MissingField("rating")));

        assert!(matches!(
            board.create(request(Some("12ab")), t0()),
            Err(StudioError::BadInput(_))
        ));

        let mut req = request(None);
        req.author = " ".into();
        assert_eq!(board.create(req, t0()), Err(StudioError::MissingField("author")));
    }

    // ── public listing ──────────────────────────────────────────────

    #[test]
    fn listing_masks_anonymous_and_hides_password() {
        let mut board = ReviewBoard::new();
        board.create(request(Some("1234")), t0()).unwrap();
        let mut anon = request(Some("5678"));
        anon.author = "김하늘".into();
        anon.is_anonymous = true;
        board.create(anon, t0() + Duration::minutes(1)).unwrap();

        let listed = board.list();
        assert_eq!(listed[0].author, "김**");
        assert_eq!(listed[1].author, "Park");

        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains("5678"));
        assert!(!json.contains("password"));

        let full = serde_json::to_value(board.get(ReviewId(1)).unwrap()).unwrap();
        assert!(full.get("password").is_none());
        assert_eq!(full["isAnonymous"], false);
    }

    #[test]
    fn mask_handles_short_names() {
        assert_eq!(mask_author("J"), "J**");
        assert_eq!(mask_author(""), "**");
    }
}
