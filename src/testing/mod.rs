//! Testing utilities and mock implementations
//!
//! Mocks for the broker transport, the thermometer and the publish façade,
//! usable from unit tests and from the integration tests under `tests/`.

pub mod mocks;

pub use mocks::*;
