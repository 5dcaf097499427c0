//! # housebridge-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** over the hardware bridge for the rest of the
//!   platform (`/api/houses/{house}/sensors`, `/api/houses/{house}/devices`,
//!   device control and provisioning)
//! - Stream bridge events to live dashboards as **server-sent events**
//!   (`/api/events/stream`)
//! - Map bridge errors onto HTTP status codes
//!
//! ## Dependency rule
//! Depends on `housebridge-app` (for the bridge service and port traits) and
//! `housebridge-domain` (for request/response types). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
