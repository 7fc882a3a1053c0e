//! Domain model for the care centre registry and respite scheduling.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every member, booking, activity and registration is identified by a stable UUID.
//! - Capacity is counted per half-session; full-day bookings span both halves.
//! - Activity seats are counted per activity, excluding cancelled sign-ups.

pub mod activity;
pub mod booking;
pub mod member;
