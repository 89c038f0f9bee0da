//! # va-contracts
//!
//! Request payloads and the contracts that validate them.
//!
//! Every write operation deserializes its body into one of the `*Input`
//! types here and runs the matching contract before touching a store.
//! Messages for missing required fields are reported as base errors so the
//! API can return them verbatim.

pub mod base;
pub mod contacts;
pub mod documents;
pub mod events;
pub mod tasks;
pub mod users;
pub mod visitors;

pub use base::*;
