//! Core data model: source messages, sender addresses, and transactions.

pub mod address;
pub mod message;
pub mod transaction;
