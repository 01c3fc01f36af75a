//! Bridge wire protocol: topics and payloads
//!
//! This module defines the message structures and topic layout the bridge
//! uses to talk to the broker.

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::*;
