//! Route middleware.
//!
//! One concern: resolving the practitioner from the session cookie
//! before a protected handler runs. The two exported flavors answer
//! anonymous requests differently (401 for `/api`, redirect for
//! `/acciones`).

pub mod auth;
