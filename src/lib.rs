//! Record core for a clinical-nutrition practice: patients,
//! consultations, measurement history, and nutrition plans behind
//! validated, ownership-scoped services and a cookie-session HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod session;
pub mod validation;
