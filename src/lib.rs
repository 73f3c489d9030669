//! `momocheck`: find MoMo payment notifications in a mailbox.
//!
//! This crate provides the core library for turning notification emails
//! into typed transaction records, caching each message's outcome so it is
//! parsed once, and searching recent mail for a matching transaction.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod search;
pub mod source;
pub mod store;
