//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and capacity calls into use-case level APIs.
//! - Keep calling layers (web handlers, CLI) decoupled from storage details.

pub mod activity_service;
pub mod booking_service;
pub mod dashboard_service;
pub mod member_service;
