#![warn(missing_docs)]
//! Hex backdrop for a tattoo studio site.
//!
//! [`background`] is the decorative engine: a hex prism grid that rises under
//! the pointer, drifts with page scroll and glows. [`studio`] holds the
//! in-memory desk services the site talks to (reservations, reviews, admin
//! sessions, consent forms).

pub mod background;
pub mod math;
pub mod studio;
