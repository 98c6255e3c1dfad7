//! The pure filter → sort → paginate pipeline.
//!
//! Stages run in a fixed order: search, category and brand, the feature
//! flags, price range, power buckets, drive layouts, then sort, then the
//! page slice. Sorting happens only after every filter so page offsets index
//! into the filtered ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use storefront_core::Result;

use crate::filter::{FilterState, QueryLimits, SortKey};
use crate::product::Product;

/// One page of matched items.
///
/// Invariant: `has_more == page_offset + items.len() < total_matched`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    /// The page, in result order.
    pub items: Vec<T>,
    /// Number of items that passed every filter, before slicing.
    pub total_matched: usize,
    /// Whether items remain after this page.
    pub has_more: bool,
    /// Offset this page starts at.
    pub page_offset: usize,
}

impl<T> QueryResult<T> {
    /// Returns the offset of the following page, if there is one.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more.then(|| self.page_offset + self.items.len())
    }

    /// Returns true if nothing matched the filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_matched == 0
    }

    /// Maps each item, keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResult<U> {
        QueryResult {
            items: self.items.into_iter().map(f).collect(),
            total_matched: self.total_matched,
            has_more: self.has_more,
            page_offset: self.page_offset,
        }
    }
}

/// Runs a query with the default limits.
///
/// # Errors
///
/// Returns `Error::InvalidQueryRequest` if `filter` fails validation.
pub fn query(products: &[Product], filter: &FilterState) -> Result<QueryResult<Product>> {
    query_with_limits(products, filter, &QueryLimits::default())
}

/// Runs a query against an in-memory product list.
///
/// # Errors
///
/// Returns `Error::InvalidQueryRequest` if `filter` fails validation.
pub fn query_with_limits(
    products: &[Product],
    filter: &FilterState,
    limits: &QueryLimits,
) -> Result<QueryResult<Product>> {
    filter.validate(limits)?;

    let mut matched = filter_products(products, filter);
    sort_products(&mut matched, filter.sort_key());
    Ok(paginate(&matched, filter.page_offset(), filter.page_size()))
}

/// Applies every filter stage, preserving repository order.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], filter: &FilterState) -> Vec<&'a Product> {
    let term = filter.normalized_search();
    products
        .iter()
        .filter(|p| matches_search(p, &term))
        .filter(|p| matches_category(p, filter))
        .filter(|p| matches_flags(p, filter))
        .filter(|p| matches_price(p, filter))
        .filter(|p| matches_power(p, filter))
        .filter(|p| matches_drive(p, filter))
        .collect()
}

/// Case-insensitive substring match on name, model, slug and description.
///
/// `term` must already be normalized; an empty term matches everything.
fn matches_search(product: &Product, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let fields = [
        Some(product.name.as_str()),
        product.model.as_deref(),
        Some(product.slug.as_str()),
        product.description.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
}

fn matches_category(product: &Product, filter: &FilterState) -> bool {
    if let Some(key) = filter.category_key() {
        if product.category != key {
            return false;
        }
    }
    let brands = filter.manufacturers();
    brands.is_empty()
        || product.manufacturer.as_deref().is_some_and(|m| {
            brands.iter().any(|brand| brand.eq_ignore_ascii_case(m))
        })
}

fn matches_flags(product: &Product, filter: &FilterState) -> bool {
    (!filter.is_stock_only() || product.in_stock)
        && (!filter.is_featured_only() || product.is_featured)
        && (!filter.is_cabin_only() || product.cabin())
        && (!filter.is_new_only() || product.is_new)
}

fn matches_price(product: &Product, filter: &FilterState) -> bool {
    filter.price_min().is_none_or(|min| product.price >= min)
        && filter.price_max().is_none_or(|max| product.price <= max)
}

/// Union across the selected buckets; no selection matches everything.
fn matches_power(product: &Product, filter: &FilterState) -> bool {
    let buckets = filter.power_buckets();
    if buckets.is_empty() {
        return true;
    }
    product
        .power_hp()
        .is_some_and(|hp| buckets.iter().any(|bucket| bucket.contains(hp)))
}

/// Union across the selected drive layouts; no selection matches everything.
fn matches_drive(product: &Product, filter: &FilterState) -> bool {
    let drives = filter.drives();
    drives.is_empty()
        || product.drive.as_deref().is_some_and(|drive| {
            drives.iter().any(|wanted| wanted.eq_ignore_ascii_case(drive.trim()))
        })
}

/// Stable sort by `key`.
///
/// Products missing the sort attribute (no timestamp, no parsable power)
/// go last in both directions.
pub fn sort_products(products: &mut [&Product], key: SortKey) {
    match key {
        SortKey::Newest => {
            products.sort_by(|a, b| missing_last(a.created_at, b.created_at, |x, y| y.cmp(&x)));
        }
        SortKey::PriceAsc => products.sort_by_key(|p| p.price),
        SortKey::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::PowerAsc => products.sort_by(|a, b| {
            missing_last(a.power_hp(), b.power_hp(), |x, y| x.total_cmp(&y))
        }),
        SortKey::PowerDesc => products.sort_by(|a, b| {
            missing_last(a.power_hp(), b.power_hp(), |x, y| y.total_cmp(&x))
        }),
        SortKey::Name => products.sort_by_cached_key(|p| p.name.to_lowercase()),
    }
}

fn missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Slices `[offset, offset + size)` out of the ordered matches.
fn paginate(matched: &[&Product], offset: usize, size: usize) -> QueryResult<Product> {
    let total = matched.len();
    let start = offset.min(total);
    let end = offset.saturating_add(size).min(total);
    let items: Vec<Product> = matched[start..end].iter().map(|p| (*p).clone()).collect();
    let has_more = offset.saturating_add(items.len()) < total;

    QueryResult {
        items,
        total_matched: total,
        has_more,
        page_offset: offset,
    }
}
