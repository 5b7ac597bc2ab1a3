//! Tray session services.
//!
//! # Responsibility
//! - Orchestrate store, tag index and graph algorithms into session operations.
//! - Keep hosts decoupled from storage details.

mod transfer;
pub mod tray_service;
