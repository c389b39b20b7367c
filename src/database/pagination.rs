use serde::{Deserialize, Serialize};

use crate::constants::PAGE_SIZE;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|page| *page >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|limit| *limit >= 1).unwrap_or(PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `count` is the window total reported by the query; `path` is used to
    /// build relative page links. `filter_params` is the already-encoded rest
    /// of the caller's query string, appended so following a link keeps the
    /// active filters.
    pub fn from_rows(
        results: Vec<T>,
        count: i64,
        query: &PageQuery,
        path: &str,
        filter_params: &str,
    ) -> Self {
        let page = query.page();
        let limit = query.limit();

        let next = (page * limit < count).then(|| page_url(path, page + 1, limit, filter_params));
        let previous = (page > 1).then(|| page_url(path, page - 1, limit, filter_params));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_url(path: &str, page: i64, limit: i64, filter_params: &str) -> String {
    if filter_params.is_empty() {
        format!("{path}?page={page}&limit={limit}")
    } else {
        format!("{path}?page={page}&limit={limit}&{filter_params}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_six() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn limit_parameter_overrides_page_size() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn nonsense_values_fall_back_to_defaults() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(-4),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), PAGE_SIZE);
    }

    #[test]
    fn first_page_has_no_previous_link() {
        let page = Page::from_rows(
            vec![1, 2, 3, 4, 5, 6],
            14,
            &PageQuery::default(),
            "/api/recipes",
            "",
        );
        assert_eq!(page.previous, None);
        assert_eq!(page.next.as_deref(), Some("/api/recipes?page=2&limit=6"));
    }

    #[test]
    fn last_page_has_no_next_link() {
        let query = PageQuery {
            page: Some(3),
            limit: None,
        };
        let page = Page::from_rows(vec![1, 2], 14, &query, "/api/recipes", "");
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/recipes?page=2&limit=6"));
    }

    #[test]
    fn exact_multiple_has_no_phantom_next_page() {
        let query = PageQuery {
            page: Some(2),
            limit: None,
        };
        let page = Page::from_rows(vec![1, 2, 3, 4, 5, 6], 12, &query, "/api/users", "");
        assert_eq!(page.next, None);
    }

    #[test]
    fn page_links_keep_extra_query_parameters() {
        let query = PageQuery {
            page: Some(2),
            limit: None,
        };
        let page = Page::from_rows(vec![1, 2, 3, 4, 5, 6], 14, &query, "/api/recipes", "tags=breakfast&is_favorited=1");

        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes?page=3&limit=6&tags=breakfast&is_favorited=1")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes?page=1&limit=6&tags=breakfast&is_favorited=1")
        );
    }
}
