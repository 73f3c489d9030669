//! Message sources: listing and fetching the messages to search.
//!
//! Real deployments talk to a mailbox API; [`spool::SpoolService`] reads a
//! local directory of exported messages. Either way the core only sees the
//! [`MessageService`] contract and canonical [`RawMessage`]s.

pub mod document;
pub mod spool;

use crate::error::Result;
use crate::model::message::{ListCriteria, MessagePage, RawMessage};

/// External provider of message listings and message contents.
///
/// Failures propagate unchanged to the caller: no retries happen here or
/// in the search loop.
pub trait MessageService {
    /// One page of message ids, most recent first.
    fn list(&self, criteria: &ListCriteria) -> Result<MessagePage>;

    /// Fetch a single message.
    fn get(&self, id: &str) -> Result<RawMessage>;
}

impl<T: MessageService + ?Sized> MessageService for &T {
    fn list(&self, criteria: &ListCriteria) -> Result<MessagePage> {
        (**self).list(criteria)
    }

    fn get(&self, id: &str) -> Result<RawMessage> {
        (**self).get(id)
    }
}

impl<T: MessageService + ?Sized> MessageService for Box<T> {
    fn list(&self, criteria: &ListCriteria) -> Result<MessagePage> {
        (**self).list(criteria)
    }

    fn get(&self, id: &str) -> Result<RawMessage> {
        (**self).get(id)
    }
}
