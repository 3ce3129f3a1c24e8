//! Transport integration tests
//!
//! Pools backed by real TCP connections to local listeners.
