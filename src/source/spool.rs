//! A [`MessageService`] over a directory of exported messages.
//!
//! Each message is a file named after its id: `<id>.json` (mailbox API
//! document) or `<id>.eml` (RFC 5322). Listings are ordered most recently
//! modified first, ties broken by id, and paginated with an offset token.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::{CheckerError, Result};
use crate::model::message::{ListCriteria, MessagePage, RawMessage};

use super::{document, MessageService};

const JSON_EXTENSION: &str = "json";
const EML_EXTENSION: &str = "eml";

/// Directory-backed message source.
#[derive(Debug, Clone)]
pub struct SpoolService {
    dir: PathBuf,
}

impl SpoolService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All message ids, most recent first.
    fn all_ids(&self) -> Result<Vec<String>> {
        let mut found: Vec<(SystemTime, String)> = Vec::new();
        for item in fs::read_dir(&self.dir).map_err(|e| CheckerError::io(&self.dir, e))? {
            let item = item.map_err(|e| CheckerError::io(&self.dir, e))?;
            let path = item.path();
            let Some(id) = message_id_of(&path) else {
                continue;
            };
            let modified = item
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, id));
        }

        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        // `<id>.json` and `<id>.eml` side by side: keep the newest.
        let mut seen = HashSet::new();
        found.retain(|(_, id)| seen.insert(id.clone()));
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }
}

impl MessageService for SpoolService {
    fn list(&self, criteria: &ListCriteria) -> Result<MessagePage> {
        let mut ids = self.all_ids()?;

        if let Some(ref sender) = criteria.sender {
            ids.retain(|id| match self.get(id) {
                Ok(message) => message.is_from(sender),
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Unreadable spool message left out of listing");
                    false
                }
            });
        }

        let offset = match criteria.page_token.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| CheckerError::Source(format!("invalid page token '{token}'")))?,
            None => 0,
        };
        let page_size = criteria.max_results.max(1) as usize;
        let end = offset.saturating_add(page_size).min(ids.len());

        let page_ids = ids.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_page_token = (end < ids.len()).then(|| end.to_string());

        debug!(
            dir = %self.dir.display(),
            offset,
            count = page_ids.len(),
            more = next_page_token.is_some(),
            "Listed spool messages"
        );
        Ok(MessagePage {
            ids: page_ids,
            next_page_token,
        })
    }

    fn get(&self, id: &str) -> Result<RawMessage> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(CheckerError::InvalidMessage {
                id: id.to_string(),
                reason: "not a spool message id".to_string(),
            });
        }

        let json_path = self.dir.join(format!("{id}.{JSON_EXTENSION}"));
        if json_path.is_file() {
            let json = fs::read_to_string(&json_path).map_err(|e| CheckerError::io(&json_path, e))?;
            return document::from_api_json(id, &json);
        }

        let eml_path = self.dir.join(format!("{id}.{EML_EXTENSION}"));
        if eml_path.is_file() {
            let bytes = fs::read(&eml_path).map_err(|e| CheckerError::io(&eml_path, e))?;
            return document::from_eml(id, &bytes);
        }

        Err(CheckerError::Source(format!(
            "message '{id}' not found in {}",
            self.dir.display()
        )))
    }
}

/// Message id of a spool file, or `None` for anything else in the directory.
fn message_id_of(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(JSON_EXTENSION) && !ext.eq_ignore_ascii_case(EML_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty() && !stem.starts_with('.')).then(|| stem.to_string())
}
