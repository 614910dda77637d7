//! In-process query evaluation: filter, sort, paginate.

use std::cmp::Ordering;

use stockroom_core::{DomainError, DomainResult};

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A 1-based page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> DomainResult<Self> {
        if number == 0 {
            return Err(DomainError::validation("page number starts at 1"));
        }
        if size == 0 {
            return Err(DomainError::validation("page size must be positive"));
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn offset(&self) -> usize {
        (self.number as usize - 1).saturating_mul(self.size as usize)
    }
}

/// Filter/sort/paginate specification for `find_many`.
pub struct Query<T> {
    filters: Vec<Predicate<T>>,
    order: Option<Comparator<T>>,
    page: Option<Page>,
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order: None,
            page: None,
        }
    }
}

impl<T> Query<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only records matching `predicate` (filters are AND-ed).
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    pub fn order_by(mut self, cmp: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.order = Some(Box::new(cmp));
        self
    }

    pub fn paginate(mut self, page: Option<Page>) -> Self {
        self.page = page;
        self
    }

    /// Evaluate the query over a collection snapshot.
    pub fn run(&self, docs: Vec<T>) -> Vec<T> {
        let mut matched: Vec<T> = docs
            .into_iter()
            .filter(|d| self.filters.iter().all(|f| f(d)))
            .collect();

        if let Some(cmp) = &self.order {
            matched.sort_by(|a, b| cmp(a, b));
        }

        match self.page {
            Some(page) => matched
                .into_iter()
                .skip(page.offset())
                .take(page.size as usize)
                .collect(),
            None => matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_sorts_and_pages() {
        let docs: Vec<i32> = (1..=25).rev().collect();
        let query = Query::new()
            .filter(|n: &i32| n % 2 == 1)
            .order_by(|a: &i32, b: &i32| a.cmp(b))
            .paginate(Some(Page::new(2, 5).unwrap()));

        assert_eq!(query.run(docs), vec![11, 13, 15, 17, 19]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let query = Query::new().paginate(Some(Page::new(4, 10).unwrap()));
        assert!(query.run((0..25).collect::<Vec<i32>>()).is_empty());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(Page::new(0, 10).is_err());
    }

    #[test]
    fn without_page_returns_everything_matching() {
        let query = Query::new().filter(|n: &i32| *n > 2);
        assert_eq!(query.run(vec![1, 2, 3, 4]), vec![3, 4]);
    }
}
