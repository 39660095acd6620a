// [apps/guardian/src/lib.rs]
//! Guardian: a pre-flight infrastructure validation service. Runs a
//! registry of probes against configured dependencies (databases,
//! object storage, AI providers, Kubernetes, DNS, TLS, GPUs), exposes
//! their results over HTTP, and can pull a Kubernetes diagnostics
//! bundle on demand (`spec.md` §1).

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod probe;
pub mod probes;
pub mod runner;
