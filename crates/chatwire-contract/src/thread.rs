use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::item::ThreadItem;

// ============================================================================
// Thread metadata
// ============================================================================

/// Lifecycle status of a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Active,
    Locked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Closed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ThreadStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Everything about a thread except its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Unix millis.
    pub created_at: u64,
    #[serde(default)]
    pub status: ThreadStatus,
    /// Caller-owned key/value data. Never interpreted by the core.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ThreadMetadata {
    pub fn new(id: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at,
            status: ThreadStatus::Active,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A thread together with one page of its (visible) items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(flatten)]
    pub metadata: ThreadMetadata,
    pub items: Page<ThreadItem>,
}

impl Thread {
    pub fn empty(metadata: ThreadMetadata) -> Self {
        Self {
            metadata,
            items: Page::empty(),
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Sort order for paginated queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Cursor-based pagination parameters. `after` is the id of the last entry
/// of the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub order: SortOrder,
    pub after: Option<String>,
}

impl PageQuery {
    pub fn new(limit: usize, order: SortOrder) -> Self {
        Self {
            limit,
            order,
            after: None,
        }
    }

    #[must_use]
    pub fn after(mut self, after: Option<String>) -> Self {
        self.after = after;
        self
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(20, SortOrder::Desc)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
            after: None,
        }
    }

    /// Keep only the entries matching `keep`. The cursor is left untouched so
    /// the next page still starts after the last *stored* entry.
    #[must_use]
    pub fn retain(mut self, keep: impl FnMut(&T) -> bool) -> Self {
        self.data.retain(keep);
        self
    }
}

/// Paginate an insertion-ordered slice in memory.
///
/// An `after` cursor that matches nothing yields an empty page.
pub fn paginate<T: Clone>(entries: &[T], id_of: impl Fn(&T) -> &str, query: &PageQuery) -> Page<T> {
    let ordered: Vec<&T> = match query.order {
        SortOrder::Asc => entries.iter().collect(),
        SortOrder::Desc => entries.iter().rev().collect(),
    };

    let start = match &query.after {
        Some(cursor) => match ordered.iter().position(|e| id_of(e) == cursor) {
            Some(pos) => pos + 1,
            None => return Page::empty(),
        },
        None => 0,
    };

    let limit = query.limit.max(1);
    let rest = ordered.get(start..).unwrap_or_default();
    let data: Vec<T> = rest.iter().take(limit).map(|e| (*e).clone()).collect();
    let has_more = rest.len() > data.len();
    let after = data.last().map(|e| id_of(e).to_string());

    Page {
        data,
        has_more,
        after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(page: &Page<String>) -> Vec<&str> {
        page.data.iter().map(String::as_str).collect()
    }

    fn entries() -> Vec<String> {
        (0..5).map(|i| format!("e{i}")).collect()
    }

    #[test]
    fn paginate_ascending_walks_forward() {
        let all = entries();
        let first = paginate(&all, |s| s.as_str(), &PageQuery::new(2, SortOrder::Asc));
        assert_eq!(ids(&first), vec!["e0", "e1"]);
        assert!(first.has_more);
        assert_eq!(first.after.as_deref(), Some("e1"));

        let second = paginate(
            &all,
            |s| s.as_str(),
            &PageQuery::new(2, SortOrder::Asc).after(first.after.clone()),
        );
        assert_eq!(ids(&second), vec!["e2", "e3"]);

        let last = paginate(
            &all,
            |s| s.as_str(),
            &PageQuery::new(2, SortOrder::Asc).after(second.after.clone()),
        );
        assert_eq!(ids(&last), vec!["e4"]);
        assert!(!last.has_more);
    }

    #[test]
    fn paginate_descending_starts_from_newest() {
        let all = entries();
        let page = paginate(&all, |s| s.as_str(), &PageQuery::new(3, SortOrder::Desc));
        assert_eq!(ids(&page), vec!["e4", "e3", "e2"]);
        assert!(page.has_more);
    }

    #[test]
    fn paginate_unknown_cursor_is_empty() {
        let all = entries();
        let page = paginate(
            &all,
            |s| s.as_str(),
            &PageQuery::default().after(Some("nope".into())),
        );
        assert!(page.data.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn thread_metadata_wire_shape() {
        let meta = ThreadMetadata::new("thr_1", 10).with_title("Hello");
        let value = serde_json::to_value(Thread::empty(meta)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "thr_1",
                "title": "Hello",
                "created_at": 10,
                "status": {"type": "active"},
                "items": {"data": [], "has_more": false}
            })
        );
    }

    #[test]
    fn locked_status_keeps_reason() {
        let status: ThreadStatus =
            serde_json::from_value(json!({"type": "locked", "reason": "moderation"})).unwrap();
        assert_eq!(
            status,
            ThreadStatus::Locked {
                reason: Some("moderation".into())
            }
        );
        assert!(!status.is_active());
    }
}
