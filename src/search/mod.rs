//! Transaction search: walks a bounded, most-recent-first window of
//! messages, resolving each through the cache, and returns the first
//! transaction a predicate accepts.

pub mod query;

use tracing::{debug, info};

use crate::config::MOMO_SENDER;
use crate::error::Result;
use crate::model::message::{ListCriteria, RawMessage};
use crate::model::transaction::TransactionRecord;
use crate::parser::{MessageParser, NotificationParser};
use crate::source::MessageService;
use crate::store::TransactionCache;

/// Which part of the mailbox a search looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    /// Source-side sender filter.
    pub sender: Option<String>,
    /// Message ids requested per listing page.
    pub page_size: u32,
    /// Maximum number of pages listed; at least one page is always listed.
    pub max_pages: u32,
}

impl Default for SearchWindow {
    fn default() -> Self {
        Self {
            sender: Some(MOMO_SENDER.to_string()),
            page_size: 100,
            max_pages: 2,
        }
    }
}

/// Cache-aside transaction finder.
///
/// Cached outcomes, including "no transaction", are used as-is; only ids
/// missing from the cache are fetched from the source, parsed and saved.
pub struct Searcher<S, C> {
    source: S,
    cache: C,
    parser: Box<dyn MessageParser>,
    expected_sender: String,
}

impl<S: MessageService, C: TransactionCache> Searcher<S, C> {
    /// Searcher using the default [`NotificationParser`], accepting only
    /// messages from [`MOMO_SENDER`].
    pub fn new(source: S, cache: C) -> Self {
        Self {
            source,
            cache,
            parser: Box::new(NotificationParser::default()),
            expected_sender: MOMO_SENDER.to_string(),
        }
    }

    /// Replace the per-message parsing step.
    pub fn with_parser(mut self, parser: impl MessageParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Only treat messages whose sender header names `sender` as notifications.
    pub fn with_expected_sender(mut self, sender: impl Into<String>) -> Self {
        self.expected_sender = sender.into();
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Return the first transaction in listing order accepted by `predicate`.
    ///
    /// Each page is fully resolved through the cache before the predicate
    /// runs over it. The next page is listed only if nothing matched, a
    /// continuation token exists, and fewer than `window.max_pages` pages
    /// were listed.
    pub fn search<P>(&self, window: &SearchWindow, mut predicate: P) -> Result<Option<TransactionRecord>>
    where
        P: FnMut(&TransactionRecord) -> bool,
    {
        let max_pages = window.max_pages.max(1);
        let mut page_token = None;
        let mut pages = 0;

        loop {
            pages += 1;
            let page = self.source.list(&ListCriteria {
                sender: window.sender.clone(),
                max_results: window.page_size,
                page_token: page_token.take(),
            })?;
            debug!(page = pages, count = page.ids.len(), "Listed message page");

            if !page.ids.is_empty() {
                self.cache.preload(&page.ids);
            }

            let mut outcomes = Vec::with_capacity(page.ids.len());
            for id in &page.ids {
                outcomes.push(self.resolve(id)?);
            }

            if let Some(found) = outcomes.into_iter().flatten().find(|record| predicate(record)) {
                info!(transaction_id = %found.id, page = pages, "Matching transaction found");
                return Ok(Some(found));
            }

            match page.next_page_token {
                Some(token) if pages < max_pages => page_token = Some(token),
                _ => break,
            }
        }

        info!(pages, "No matching transaction");
        Ok(None)
    }

    /// Resolve the outcome for one message id, cache first.
    ///
    /// On a miss the message is fetched, parsed and its outcome saved, even
    /// when it holds no transaction. Parse errors are returned and nothing
    /// is cached for the message.
    pub fn resolve(&self, id: &str) -> Result<Option<TransactionRecord>> {
        if self.cache.has(id) {
            debug!(message_id = %id, "Cache hit");
            return self.cache.get(id);
        }

        debug!(message_id = %id, "Cache miss, fetching message");
        let message = self.source.get(id)?;
        let outcome = self.parse_message(&message)?;
        self.cache.save(id, outcome.as_ref())?;
        Ok(outcome)
    }

    /// Parse a fetched message, skipping those from other senders.
    pub fn parse_message(&self, message: &RawMessage) -> Result<Option<TransactionRecord>> {
        if !message.is_from(&self.expected_sender) {
            debug!(
                message_id = %message.id,
                sender = %message.sender,
                "Not a notification sender, no transaction"
            );
            return Ok(None);
        }
        self.parser.parse(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::error::CheckerError;
    use crate::model::message::{BodyPart, MessagePage};
    use crate::parser::normalize::encode_transport;
    use crate::store::memory::MemoryCache;

    /// In-memory source with fixed pages and a fetch log.
    struct FakeSource {
        pages: Vec<Vec<&'static str>>,
        messages: HashMap<String, RawMessage>,
        fetched: RefCell<Vec<String>>,
        listed: RefCell<u32>,
    }

    impl FakeSource {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                messages: HashMap::new(),
                fetched: RefCell::new(Vec::new()),
                listed: RefCell::new(0),
            }
        }

        fn with(mut self, id: &str, sender: &str, html: &str) -> Self {
            self.messages.insert(
                id.to_string(),
                RawMessage {
                    id: id.to_string(),
                    sender: sender.to_string(),
                    body: BodyPart {
                        data: encode_transport(html),
                    },
                },
            );
            self
        }

        fn with_transaction(self, id: &str, tx_id: &str, amount: &str) -> Self {
            let html = notification(tx_id, amount);
            self.with(id, MOMO_SENDER, &html)
        }
    }

    impl MessageService for FakeSource {
        fn list(&self, criteria: &ListCriteria) -> Result<MessagePage> {
            *self.listed.borrow_mut() += 1;
            let index: usize = criteria
                .page_token
                .as_deref()
                .map_or(0, |t| t.parse().unwrap());
            Ok(MessagePage {
                ids: self.pages[index].iter().map(|s| s.to_string()).collect(),
                next_page_token: (index + 1 < self.pages.len()).then(|| (index + 1).to_string()),
            })
        }

        fn get(&self, id: &str) -> Result<RawMessage> {
            self.fetched.borrow_mut().push(id.to_string());
            self.messages
                .get(id)
                .cloned()
                .ok_or_else(|| CheckerError::Source(format!("no message {id}")))
        }
    }

    fn notification(tx_id: &str, amount: &str) -> String {
        format!(
            "<!DOCTYPE html><table>\
             <tr><td>Received amount</td><td>{amount}</td></tr>\
             <tr><td>Transaction id</td><td>{tx_id}</td></tr>\
             <tr><td>Time</td><td>01/02/2023 - 10:30</td></tr>\
             <tr><td>Sender phone number</td><td>0912345678</td></tr>\
             </table>"
        )
    }

    #[test]
    fn test_first_match_in_listing_order() {
        let source = FakeSource::new(vec![vec!["m1", "m2", "m3"]])
            .with_transaction("m1", "TX1", "10.000")
            .with_transaction("m2", "TX2", "50.000")
            .with_transaction("m3", "TX3", "50.000");
        let searcher = Searcher::new(source, MemoryCache::new());

        let found = searcher
            .search(&SearchWindow::default(), |r| r.amount == 50_000)
            .unwrap();
        assert_eq!(found.map(|r| r.id), Some("TX2".to_string()));
    }

    #[test]
    fn test_foreign_sender_is_cached_as_no_transaction() {
        let html = notification("TX9", "1.000");
        let source = FakeSource::new(vec![vec!["spam"]]).with("spam", "promo@shop.example", &html);
        let searcher = Searcher::new(source, MemoryCache::new());

        let found = searcher.search(&SearchWindow::default(), |_| true).unwrap();
        assert_eq!(found, None);
        assert!(searcher.cache().has("spam"));
        assert_eq!(searcher.cache().get("spam").unwrap(), None);
    }

    #[test]
    fn test_sentinels_are_skipped() {
        let source = FakeSource::new(vec![vec!["n1", "m1"]])
            .with("n1", MOMO_SENDER, "Monthly statement")
            .with_transaction("m1", "TX1", "1.000");
        let searcher = Searcher::new(source, MemoryCache::new());

        let found = searcher.search(&SearchWindow::default(), |_| true).unwrap();
        assert_eq!(found.map(|r| r.id), Some("TX1".to_string()));
        assert_eq!(searcher.cache().get("n1").unwrap(), None);
    }

    #[test]
    fn test_page_ceiling() {
        let source = FakeSource::new(vec![vec!["m1"], vec!["m2"], vec!["m3"]])
            .with_transaction("m1", "TX1", "1.000")
            .with_transaction("m2", "TX2", "2.000")
            .with_transaction("m3", "TX3", "3.000");
        let searcher = Searcher::new(source, MemoryCache::new());
        let window = SearchWindow {
            max_pages: 2,
            ..SearchWindow::default()
        };

        let found = searcher.search(&window, |r| r.id == "TX3").unwrap();
        assert_eq!(found, None);
        assert_eq!(*searcher.source().listed.borrow(), 2);
        assert_eq!(*searcher.source().fetched.borrow(), vec!["m1", "m2"]);

        let found = searcher.search(&window, |r| r.id == "TX2").unwrap();
        assert_eq!(found.map(|r| r.id), Some("TX2".to_string()));
    }

    #[test]
    fn test_zero_page_ceiling_still_lists_one_page() {
        let source = FakeSource::new(vec![vec!["m1"], vec!["m2"]])
            .with_transaction("m1", "TX1", "1.000");
        let searcher = Searcher::new(source, MemoryCache::new());
        let window = SearchWindow {
            max_pages: 0,
            ..SearchWindow::default()
        };

        assert!(searcher.search(&window, |_| true).unwrap().is_some());
        assert_eq!(*searcher.source().listed.borrow(), 1);
    }

    #[test]
    fn test_cached_ids_are_not_fetched_again() {
        let source = FakeSource::new(vec![vec!["m1", "m2"]])
            .with_transaction("m1", "TX1", "1.000")
            .with("m2", MOMO_SENDER, "not html");
        let searcher = Searcher::new(source, MemoryCache::new());

        let first = searcher.search(&SearchWindow::default(), |r| r.id == "none").unwrap();
        let fetched_after_first = searcher.source().fetched.borrow().len();
        let second = searcher.search(&SearchWindow::default(), |r| r.id == "none").unwrap();

        assert_eq!(first, second);
        assert_eq!(fetched_after_first, 2);
        assert_eq!(searcher.source().fetched.borrow().len(), 2);
    }

    #[test]
    fn test_bad_date_is_an_error_and_not_cached() {
        let html = notification("TX1", "1.000").replace("01/02/2023 - 10:30", "2023-02-01 10:30");
        let source = FakeSource::new(vec![vec!["m1"]]).with("m1", MOMO_SENDER, &html);
        let searcher = Searcher::new(source, MemoryCache::new());

        let err = searcher.search(&SearchWindow::default(), |_| true).unwrap_err();
        assert!(matches!(err, CheckerError::InvalidDate { .. }));
        assert!(!searcher.cache().has("m1"));
    }

    #[test]
    fn test_source_errors_propagate() {
        let source = FakeSource::new(vec![vec!["ghost"]]);
        let searcher = Searcher::new(source, MemoryCache::new());
        assert!(matches!(
            searcher.search(&SearchWindow::default(), |_| true),
            Err(CheckerError::Source(_))
        ));
    }

    #[test]
    fn test_custom_parser_strategy() {
        struct Fixed;
        impl MessageParser for Fixed {
            fn parse(&self, message: &RawMessage) -> Result<Option<TransactionRecord>> {
                Ok(Some(TransactionRecord {
                    amount: 1,
                    id: format!("custom-{}", message.id),
                    date: crate::parser::validate::parse_date("01/01/2024 00:00")?,
                    phone_number: "0".to_string(),
                    name: None,
                    content: None,
                    raw_text: String::new(),
                    message_body: String::new(),
                }))
            }
        }

        let source = FakeSource::new(vec![vec!["m1"]]).with("m1", MOMO_SENDER, "anything");
        let searcher = Searcher::new(source, MemoryCache::new()).with_parser(Fixed);
        let found = searcher.search(&SearchWindow::default(), |_| true).unwrap();
        assert_eq!(found.map(|r| r.id), Some("custom-m1".to_string()));
    }

    #[test]
    fn test_expected_sender_override() {
        let html = notification("TX1", "1.000");
        let source = FakeSource::new(vec![vec!["m1"]]).with("m1", "Bank <alerts@bank.example>", &html);
        let searcher = Searcher::new(source, MemoryCache::new()).with_expected_sender("alerts@bank.example");
        assert!(searcher.search(&SearchWindow::default(), |_| true).unwrap().is_some());
    }
}
