// [apps/guardian/src/http/state.rs]
//! Shared application state injected into every handler. Built once by
//! the composition root (`main.rs`) and cloned cheaply per request — every
//! field is an `Arc`, matching `spec.md` §9's "no hidden globals"
//! directive: the dependency graph is explicit, not resolved through a
//! module-level accessor.

use crate::auth::rate_limit::LoginRateLimiter;
use crate::config::Config;
use crate::diagnostics::DiagnosticsCollector;
use crate::probe::registry::ProbeRegistry;
use crate::runner::TestRunner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProbeRegistry>,
    pub runner: Arc<TestRunner>,
    pub collector: Arc<DiagnosticsCollector>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub version: &'static str,
}
