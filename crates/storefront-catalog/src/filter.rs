//! Declarative catalog filter state.
//!
//! A [`FilterState`] describes one query: search, filters, ordering and the
//! page window. It is an immutable value; every `with_*` method consumes the
//! state and returns a new one, so the engine never sees a state change
//! underneath it.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::config::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_MAX_SEARCH_LEN, DEFAULT_PAGE_SIZE};
use storefront_core::{Error, Result, StorefrontConfig};

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SortKey {
    /// Creation timestamp, newest first.
    #[default]
    Newest,
    /// Price, cheapest first.
    PriceAsc,
    /// Price, most expensive first.
    PriceDesc,
    /// Engine power, weakest first.
    PowerAsc,
    /// Engine power, strongest first.
    PowerDesc,
    /// Name, alphabetical.
    Name,
}

impl SortKey {
    /// Returns the wire name of this key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::PowerAsc => "power_asc",
            Self::PowerDesc => "power_desc",
            Self::Name => "name",
        }
    }

    /// Parses a wire name; unknown names fall back to [`SortKey::Newest`].
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "power_asc" => Self::PowerAsc,
            "power_desc" => Self::PowerDesc,
            "name" => Self::Name,
            _ => Self::Newest,
        }
    }
}

impl FromStr for SortKey {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse_or_default(s))
    }
}

impl From<String> for SortKey {
    fn from(raw: String) -> Self {
        Self::parse_or_default(&raw)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed engine-power ranges offered as checkboxes.
///
/// Lower bounds are inclusive, upper bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PowerBucket {
    /// `[20, 30)` hp.
    Hp20To30,
    /// `[30, 40)` hp.
    Hp30To40,
    /// `[40, 50)` hp.
    Hp40To50,
    /// `[50, ∞)` hp.
    Hp50Plus,
}

impl PowerBucket {
    /// All buckets in ascending order.
    pub const ALL: [Self; 4] = [Self::Hp20To30, Self::Hp30To40, Self::Hp40To50, Self::Hp50Plus];

    /// Returns `(lower, upper)` bounds; `upper` is `None` for the open bucket.
    #[must_use]
    pub const fn bounds(self) -> (f64, Option<f64>) {
        match self {
            Self::Hp20To30 => (20.0, Some(30.0)),
            Self::Hp30To40 => (30.0, Some(40.0)),
            Self::Hp40To50 => (40.0, Some(50.0)),
            Self::Hp50Plus => (50.0, None),
        }
    }

    /// Returns true if `hp` falls in this bucket.
    #[must_use]
    pub fn contains(self, hp: f64) -> bool {
        let (lower, upper) = self.bounds();
        hp >= lower && upper.is_none_or(|upper| hp < upper)
    }

    /// Returns the wire label (`"20-30"`, `"50+"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hp20To30 => "20-30",
            Self::Hp30To40 => "30-40",
            Self::Hp40To50 => "40-50",
            Self::Hp50Plus => "50+",
        }
    }
}

impl FromStr for PowerBucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.label() == s.trim())
            .ok_or_else(|| Error::InvalidQueryRequest(format!("unknown power range: {s:?}")))
    }
}

impl TryFrom<String> for PowerBucket {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<PowerBucket> for String {
    fn from(bucket: PowerBucket) -> Self {
        bucket.label().to_string()
    }
}

/// Bounds the engine enforces on incoming filter states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Largest accepted page size.
    pub max_page_size: usize,
    /// Longest accepted search term, in characters.
    pub max_search_len: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_search_len: DEFAULT_MAX_SEARCH_LEN,
        }
    }
}

impl From<&StorefrontConfig> for QueryLimits {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            max_page_size: config.max_page_size,
            max_search_len: config.max_search_len,
        }
    }
}

/// Search, filter, sort and pagination parameters of one catalog query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FilterState {
    search_term: String,
    category_key: Option<String>,
    manufacturers: Vec<String>,
    stock_only: bool,
    featured_only: bool,
    price_min: Option<u64>,
    price_max: Option<u64>,
    power_buckets: Vec<PowerBucket>,
    drives: Vec<String>,
    cabin_only: bool,
    new_only: bool,
    sort_key: SortKey,
    page_offset: usize,
    page_size: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FilterState {
    /// Creates an unfiltered, newest-first state for the first page.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            category_key: None,
            manufacturers: Vec::new(),
            stock_only: false,
            featured_only: false,
            price_min: None,
            price_max: None,
            power_buckets: Vec::new(),
            drives: Vec::new(),
            cabin_only: false,
            new_only: false,
            sort_key: SortKey::Newest,
            page_offset: 0,
            page_size,
        }
    }

    /// Decodes a filter state sent by the UI layer.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQueryRequest` if the document has an
    /// unrecognized shape (unknown fields, wrong types, unknown power range).
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::InvalidQueryRequest(format!("unrecognized filter shape: {e}")))
    }

    /// Sets the search term.
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    /// Restricts results to one category.
    #[must_use]
    pub fn with_category(mut self, key: impl Into<String>) -> Self {
        self.category_key = Some(key.into());
        self
    }

    /// Adds a manufacturer to the brand selection.
    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        let manufacturer = manufacturer.into();
        if !self.manufacturers.contains(&manufacturer) {
            self.manufacturers.push(manufacturer);
        }
        self
    }

    /// Drops out-of-stock products when `enabled`.
    #[must_use]
    pub fn stock_only(mut self, enabled: bool) -> Self {
        self.stock_only = enabled;
        self
    }

    /// Keeps only featured products when `enabled`.
    #[must_use]
    pub fn featured_only(mut self, enabled: bool) -> Self {
        self.featured_only = enabled;
        self
    }

    /// Sets the inclusive price range; `None` leaves a side open.
    #[must_use]
    pub fn with_price_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    /// Adds a power bucket to the selection.
    #[must_use]
    pub fn with_power_bucket(mut self, bucket: PowerBucket) -> Self {
        if !self.power_buckets.contains(&bucket) {
            self.power_buckets.push(bucket);
        }
        self
    }

    /// Adds a drive layout to the selection. Layouts compare
    /// case-insensitively.
    #[must_use]
    pub fn with_drive(mut self, drive: impl Into<String>) -> Self {
        let drive = drive.into();
        let drive = drive.trim();
        if !drive.is_empty() && !self.drives.iter().any(|d| d.eq_ignore_ascii_case(drive)) {
            self.drives.push(drive.to_string());
        }
        self
    }

    /// Keeps only products with a cabin when `enabled`.
    #[must_use]
    pub fn cabin_only(mut self, enabled: bool) -> Self {
        self.cabin_only = enabled;
        self
    }

    /// Keeps only new arrivals when `enabled`.
    #[must_use]
    pub fn new_only(mut self, enabled: bool) -> Self {
        self.new_only = enabled;
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    /// Sets the page window start.
    #[must_use]
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.page_offset = offset;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the state for the following page.
    #[must_use]
    pub fn next_page(&self) -> Self {
        self.clone()
            .at_offset(self.page_offset.saturating_add(self.page_size))
    }

    /// Returns the raw search term.
    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Returns the trimmed, lowercased search term.
    #[must_use]
    pub fn normalized_search(&self) -> String {
        self.search_term.trim().to_lowercase()
    }

    /// Returns the category restriction.
    #[must_use]
    pub fn category_key(&self) -> Option<&str> {
        self.category_key.as_deref()
    }

    /// Returns the selected manufacturers.
    #[must_use]
    pub fn manufacturers(&self) -> &[String] {
        &self.manufacturers
    }

    /// Returns whether out-of-stock products are dropped.
    #[must_use]
    pub fn is_stock_only(&self) -> bool {
        self.stock_only
    }

    /// Returns whether only featured products are kept.
    #[must_use]
    pub fn is_featured_only(&self) -> bool {
        self.featured_only
    }

    /// Returns the lower price bound.
    #[must_use]
    pub fn price_min(&self) -> Option<u64> {
        self.price_min
    }

    /// Returns the upper price bound.
    #[must_use]
    pub fn price_max(&self) -> Option<u64> {
        self.price_max
    }

    /// Returns the selected power buckets.
    #[must_use]
    pub fn power_buckets(&self) -> &[PowerBucket] {
        &self.power_buckets
    }

    /// Returns the selected drive layouts.
    #[must_use]
    pub fn drives(&self) -> &[String] {
        &self.drives
    }

    /// Returns whether only products with a cabin are kept.
    #[must_use]
    pub fn is_cabin_only(&self) -> bool {
        self.cabin_only
    }

    /// Returns whether only new arrivals are kept.
    #[must_use]
    pub fn is_new_only(&self) -> bool {
        self.new_only
    }

    /// Returns the ordering.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Returns the page window start.
    #[must_use]
    pub fn page_offset(&self) -> usize {
        self.page_offset
    }

    /// Returns the page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of active filters, for the filter badge.
    ///
    /// Each selected bucket, brand or drive counts once, as do a price
    /// range, a category and every enabled flag. Search and ordering are
    /// not filters.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        let mut count = self.power_buckets.len() + self.manufacturers.len() + self.drives.len();
        if self.price_min.is_some() || self.price_max.is_some() {
            count += 1;
        }
        count += usize::from(self.stock_only);
        count += usize::from(self.featured_only);
        count += usize::from(self.cabin_only);
        count += usize::from(self.new_only);
        count += usize::from(self.category_key.is_some());
        count
    }

    /// Checks the state against the request contract.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQueryRequest` if the page size is zero or above
    /// the limit, the price range is inverted, or the search term is too long.
    pub fn validate(&self, limits: &QueryLimits) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidQueryRequest(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.page_size > limits.max_page_size {
            return Err(Error::InvalidQueryRequest(format!(
                "page_size {} exceeds maximum {}",
                self.page_size, limits.max_page_size
            )));
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(Error::InvalidQueryRequest(format!(
                    "price_min {min} is greater than price_max {max}"
                )));
            }
        }
        let search_len = self.search_term.trim().chars().count();
        if search_len > limits.max_search_len {
            return Err(Error::InvalidQueryRequest(format!(
                "search term is {search_len} characters, maximum is {}",
                limits.max_search_len
            )));
        }
        Ok(())
    }
}
