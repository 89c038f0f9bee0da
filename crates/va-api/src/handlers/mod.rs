//! API request handlers, one module per resource

pub mod contacts;
pub mod documents;
pub mod events;
pub mod notes;
pub mod profile;
pub mod realtime;
pub mod tasks;
pub mod users;
pub mod visitors;
