//! HTTP-facing request handlers.

pub mod health_handlers;
pub mod screenshot_handlers;
