//! Modules layer - Infrastructure components for external integrations
//!
//! Contains asset storage backends and the QR image renderer.

pub mod qr;
pub mod storage;
