// [apps/guardian/src/http/mod.rs]
//! The HTTP surface: router assembly, shared state, middleware, and
//! request validation (`spec.md` §4.6/§4.7/§6).

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
