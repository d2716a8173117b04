//! Shared utilities for the meet backend services.
//!
//! Currently holds the JWT validation primitives used by the room service's
//! auth middleware and by test token builders.

pub mod jwt;
