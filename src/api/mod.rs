//! REST API layer: DTOs, handlers, middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
