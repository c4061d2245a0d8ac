//! HTTP surface of the practice manager.
//!
//! Read endpoints live under `/api/` and answer typed JSON; mutations
//! live under `/acciones/` and always answer an `ActionResult`
//! envelope. Both sit behind the session cookie middleware, with the
//! health probe and the login/logout pair left open.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use router::app_router;
pub use types::ApiContext;
