//! Functional core for splatkit.
//!
//! Everything in this crate is free of HTTP framework types: route keys and
//! verb-classes, provider route derivation, the credential-exchange
//! [`auth::Strategy`] capability, session payloads and cookie signing, and the
//! preference schema. The `splatkit` crate is the imperative shell around it.

pub mod api;
pub mod auth;
pub mod session;
pub mod theme;
