//! Procedure consent form, filled from a reservation and paginated for
//! export.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::reservations::Reservation;

const HEALTH_CHECKLIST: [&str; 11] = [
    "Diabetes",
    "Heart disease",
    "High blood pressure",
    "Blood clotting disorder",
    "Hepatitis (HBV/HCV)",
    "HIV/AIDS",
    "Skin condition (e.g. atopic dermatitis)",
    "Metal allergy",
    "Previous ink allergy",
    "Medication (e.g. anticoagulants)",
    "Pregnant or breastfeeding",
];

const PHOTO_CONSENTS: [&str; 3] = [
    "Photos of the tattooed area",
    "Use on social media and marketing",
    "Photos that include the face",
];

const BLANK: &str = "____________";

/// One numbered section of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentSection {
    /// Section number, from 1.
    pub number: u8,
    /// Heading.
    pub title: String,
    /// Body lines.
    pub lines: Vec<String>,
}

/// One exported page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentPage {
    /// Page number, from 1.
    pub number: usize,
    /// Total pages.
    pub total: usize,
    /// Body lines on this page.
    pub lines: Vec<String>,
}

impl ConsentPage {
    /// Page text with a footer.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push_str(&format!("\n\nPage {} of {}\n", self.number, self.total));
        out
    }
}

/// Consent form for one reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentForm {
    /// Customer name.
    pub customer: String,
    /// Appointment day.
    pub date: NaiveDate,
    /// Appointment time.
    pub time: NaiveTime,
    /// Numbered sections in order.
    pub sections: Vec<ConsentSection>,
}

fn section(number: u8, title: &str, lines: Vec<String>) -> ConsentSection {
    ConsentSection {
        number,
        title: title.to_owned(),
        lines,
    }
}

fn checkboxes(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| format!("[ ] {item}")).collect()
}

fn numbered(items: &[&str]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("({}) {item}", i + 1))
        .collect()
}

impl ConsentForm {
    /// Fills the fixed form with the reservation's details.
    pub fn for_reservation(r: &Reservation) -> Self {
        let date = r.reservation_date.format("%Y-%m-%d").to_string();
        let time = r.reservation_time.format("%H:%M").to_string();

        let mut procedure = vec![
            format!("Area: {} ({})", r.part, r.genre),
            "Colour: black and grey / colour".to_owned(),
            format!("Date: {date} {time}"),
            format!("Artist: {BLANK}"),
        ];
        if let Some(reference) = &r.reference_text {
            procedure.push(format!("Notes and requests: {reference}"));
        }

        let mut health = checkboxes(&HEALTH_CHECKLIST);
        health.push("False or missing answers are the customer's responsibility.".to_owned());

        let sections = vec![
            section(
                1,
                "Customer details",
                vec![
                    format!("Name: {}", r.name),
                    format!("Date of birth: {BLANK}"),
                    format!("Phone: {}", r.phone),
                    format!("Address: {BLANK}"),
                    "[ ] ID checked".to_owned(),
                ],
            ),
            section(2, "Procedure details", procedure),
            section(3, "Health check (tick all that apply)", health),
            section(
                4,
                "Infection and side effects",
                numbered(&[
                    "Light bleeding, swelling, itching and peeling are normal for 3 to 7 days.",
                    "These healing reactions are not grounds for a refund.",
                    "Fever over 38C, swelling past 5 days, pus or spreading redness need a doctor.",
                    "Any such symptom is reported to the studio without delay.",
                    "Infection caused by ignoring aftercare is the customer's responsibility.",
                    "Healing varies with constitution, immunity and existing conditions.",
                ]),
            ),
            section(
                5,
                "Not a medical procedure",
                numbered(&[
                    "This is a cosmetic pigment procedure, not a medical treatment.",
                    "It does not prevent, diagnose or treat any condition.",
                    "Medical costs after the procedure are borne by the customer.",
                    "I have understood the above and choose the procedure freely.",
                ]),
            ),
            section(
                6,
                "Design and results",
                numbered(&[
                    "Colour and saturation vary with skin tone, thickness and healing.",
                    "Lines may blur or thicken depending on area and friction.",
                    "Fingers, hands, feet, flanks and joints hold pigment poorly.",
                    "Fresh colour looks darker and may lighten 10 to 30% while healing.",
                    format!("One free touch-up within {BLANK} days; later changes are charged.").as_str(),
                    "Perfect symmetry or an exact photo match is not guaranteed.",
                ]),
            ),
            section(
                7,
                "Aftercare",
                {
                    let mut lines = vec!["[ ] Aftercare guide received".to_owned()];
                    lines.extend(numbered(&[
                        format!("Apply the given ointment {BLANK} times a day for {BLANK} days.").as_str(),
                        format!("Wash gently with lukewarm water after {BLANK} hours.").as_str(),
                        "Avoid alcohol, sauna, swimming, hard exercise and direct sun as advised.",
                        "Do not scratch, rub or peel the area.",
                        "Problems from ignoring these instructions are the customer's responsibility.",
                    ]));
                    lines
                },
            ),
            section(8, "Photo consent (optional)", checkboxes(&PHOTO_CONSENTS)),
            section(
                9,
                "Refunds and bookings",
                numbered(&[
                    "Deposits are not refundable.",
                    format!("One date change up to {BLANK} days before; no-shows forfeit the deposit.").as_str(),
                    "No refund once design work has started.",
                    "Change of mind, design changes or discomfort are not grounds for a refund.",
                ]),
            ),
            section(
                10,
                "Voluntary consent",
                vec![
                    "I consent freely after a full explanation and have had my questions answered."
                        .to_owned(),
                    "This form serves as evidence in case of a dispute.".to_owned(),
                ],
            ),
            section(
                11,
                "Personal data",
                {
                    let mut lines = numbered(&[
                        "Purpose: booking, procedure records, aftercare and dispute evidence.",
                        format!("Kept for {BLANK} years from the procedure date, then destroyed.").as_str(),
                        "Not shared with third parties.",
                    ]);
                    lines.push("[ ] I agree to the collection and use of my personal data".to_owned());
                    lines
                },
            ),
            section(
                12,
                "Signatures",
                vec![
                    "Date: 20__-__-__".to_owned(),
                    format!("Customer ({}): {BLANK}", r.name),
                    format!("Artist: {BLANK}"),
                ],
            ),
        ];

        Self {
            customer: r.name.clone(),
            date: r.reservation_date,
            time: r.reservation_time,
            sections,
        }
    }

    /// Title followed by every section, one entry per output line.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec!["PROCEDURE CONSENT FORM".to_owned(), String::new()];
        for s in &self.sections {
            out.push(format!("{}. {}", s.number, s.title));
            out.extend(s.lines.iter().map(|l| format!("  {l}")));
            out.push(String::new());
        }
        out
    }

    /// Splits the form into pages of at most `lines_per_page` lines.
    pub fn pages(&self, lines_per_page: usize) -> Vec<ConsentPage> {
        let per_page = lines_per_page.max(1);
        let lines = self.lines();
        let total = lines.len().div_ceil(per_page);
        lines
            .chunks(per_page)
            .enumerate()
            .map(|(i, chunk)| ConsentPage {
                number: i + 1,
                total,
                lines: chunk.to_vec(),
            })
            .collect()
    }

    /// Download name, `consent_<customer>_<date>.txt`.
    pub fn file_name(&self) -> String {
        let customer: String = self
            .customer
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
            .collect();
        format!("consent_{customer}_{}.txt", self.date.format("%Y-%m-%d"))
    }
}
