//! Request-scoped query shaping: predicate parameters, paging, sort and mode.

use crate::value::Value;
use std::collections::BTreeMap;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Explicit ordering requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

/// Per-request filter consumed by `Select` and record-count operations
///
/// `parameters` keys are column names or predicate names understood by the query
/// builder (`<column>_from`, `<column>_to`, `<column>_like`). In detail mode every
/// column is projected; otherwise only grid, key and reference-paired columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub parameters: BTreeMap<String, Value>,
    pub table_name: String,
    /// 1-based page number
    pub current_page: u64,
    /// Page size; `None` means unpaginated
    pub page_size: Option<u64>,
    pub detail_mode: bool,
    pub sort: Option<Sort>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            parameters: BTreeMap::new(),
            table_name: String::new(),
            current_page: 1,
            page_size: None,
            detail_mode: false,
            sort: None,
        }
    }
}

impl Filter {
    /// Unpaginated grid-mode filter with no parameters
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn paged(mut self, current_page: u64, page_size: u64) -> Self {
        self.current_page = current_page;
        self.page_size = Some(page_size);
        self
    }

    /// Switch to detail mode (every column projected)
    #[must_use]
    pub fn detail(mut self) -> Self {
        self.detail_mode = true;
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            column: column.into(),
            order,
        });
        self
    }

    /// `(limit, offset)` of the requested page, or `None` when unpaginated
    ///
    /// Pages below 1 are treated as page 1 and a page size of 0 as unpaginated.
    #[must_use]
    pub fn page_window(&self) -> Option<(u64, u64)> {
        let size = self.page_size.filter(|s| *s > 0)?;
        let page = self.current_page.max(1);
        Some((size, (page - 1).saturating_mul(size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unpaginated_grid() {
        let filter = Filter::new("users");
        assert_eq!(filter.current_page, 1);
        assert!(!filter.detail_mode);
        assert_eq!(filter.page_window(), None);
    }

    #[test]
    fn test_page_window() {
        assert_eq!(Filter::new("t").paged(1, 20).page_window(), Some((20, 0)));
        assert_eq!(Filter::new("t").paged(3, 20).page_window(), Some((20, 40)));
        assert_eq!(Filter::new("t").paged(0, 20).page_window(), Some((20, 0)));
        assert_eq!(Filter::new("t").paged(2, 0).page_window(), None);
    }

    #[test]
    fn test_builder_parameters() {
        let filter = Filter::new("users")
            .with_parameter("login", "alice")
            .with_parameter("manager_id", Value::Null)
            .detail();
        assert_eq!(filter.parameters.get("login"), Some(&Value::Text("alice".into())));
        assert_eq!(filter.parameters.get("manager_id"), Some(&Value::Null));
        assert!(filter.detail_mode);
    }
}
