//! # Listing
//!
//! Client-side search and pagination for list screens (products, clients,
//! expenses). The backend returns whole collections; narrowing them to what
//! fits on screen happens here.
//!
//! ## Usage
//! ```rust
//! use comptoir_core::listing::{filter_by_query, paginate};
//! use comptoir_core::{Money, Product};
//!
//! let products: Vec<Product> = (1..=25)
//!     .map(|i| Product {
//!         reference: format!("R{}", i),
//!         designation: format!("Article {}", i),
//!         unit_price: Money::from_minor(100),
//!         stock: 1,
//!         category: None,
//!     })
//!     .collect();
//!
//! let matches = filter_by_query(&products, "article 1");
//! assert_eq!(matches.len(), 11); // 1, 10..=19
//!
//! let page = paginate(&products, 3, 10);
//! assert_eq!(page.items.len(), 5);
//! assert!(!page.has_next);
//! ```

use serde::Serialize;

use crate::types::{Client, Expense, Product};

/// Anything a list screen can search.
pub trait Searchable {
    /// Text fields matched against a query.
    fn search_fields(&self) -> Vec<&str>;

    /// Case-insensitive substring match on any field. An empty query
    /// matches everything.
    fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl Searchable for Product {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.reference.as_str(), self.designation.as_str()];
        if let Some(category) = &self.category {
            fields.push(category);
        }
        fields
    }
}

impl Searchable for Client {
    fn search_fields(&self) -> Vec<&str> {
        [Some(self.name.as_str()), self.phone.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl Searchable for Expense {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.label.as_str()];
        if let Some(category) = &self.category {
            fields.push(category);
        }
        fields
    }
}

/// Returns the items matching `query`, in their original order.
pub fn filter_by_query<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    items.iter().filter(|item| item.matches(query)).collect()
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
}

/// Slices `items` into page `page` (1-based) of `per_page` entries.
///
/// Page 0 is treated as page 1 and `per_page` 0 as 1. A page past the end
/// is empty with `has_next = false`.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        per_page,
        total,
        total_pages,
        has_next: page < total_pages,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn product(reference: &str, designation: &str, category: Option<&str>) -> Product {
        Product {
            reference: reference.to_string(),
            designation: designation.to_string(),
            unit_price: Money::from_minor(100),
            stock: 3,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let items = vec![
            product("RIZ-1", "Riz blanc 1kg", Some("Epicerie")),
            product("HUI-1", "Huile 1L", Some("Epicerie")),
            product("SAV-1", "Savon", Some("Hygiene")),
        ];

        let found: Vec<_> = filter_by_query(&items, "riz")
            .into_iter()
            .map(|p| p.reference.as_str())
            .collect();
        assert_eq!(found, vec!["RIZ-1"]);

        assert_eq!(filter_by_query(&items, "EPICERIE").len(), 2);
        assert_eq!(filter_by_query(&items, "  ").len(), 3);
        assert!(filter_by_query(&items, "sucre").is_empty());
    }

    #[test]
    fn test_client_search_skips_missing_fields() {
        let client = Client {
            id: Some(1),
            name: "Rakoto".to_string(),
            phone: Some("034 00 000 00".to_string()),
            email: None,
            address: None,
        };
        assert!(client.matches("rako"));
        assert!(client.matches("034"));
        assert!(!client.matches("@"));
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=23).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total, 23);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23]);
        assert!(!last.has_next);

        let beyond = paginate(&items, 9, 10);
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_next);
    }

    #[test]
    fn test_paginate_edge_inputs() {
        let items: Vec<u32> = vec![1, 2, 3];
        let page = paginate(&items, 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items, vec![1]);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }
}
