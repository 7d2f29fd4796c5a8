use serde::{Deserialize, Serialize};

/// A list endpoint response.
///
/// Some endpoints return a bare JSON array, others a paginated page
/// (`{count, next, previous, results}`). Both decode into this type so
/// callers only ever see `items()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Plain(Vec<T>),
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    pub fn items(&self) -> &[T] {
        match self {
            ListResponse::Page { results, .. } => results,
            ListResponse::Plain(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Page { results, .. } => results,
            ListResponse::Plain(items) => items,
        }
    }

    /// Server-side total when paginated, otherwise the number of items
    pub fn total(&self) -> u64 {
        match self {
            ListResponse::Page { count: Some(count), .. } => *count,
            _ => self.items().len() as u64,
        }
    }

    pub fn next_page(&self) -> Option<&str> {
        match self {
            ListResponse::Page { next, .. } => next.as_deref(),
            ListResponse::Plain(_) => None,
        }
    }
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        ListResponse::Plain(Vec::new())
    }
}
