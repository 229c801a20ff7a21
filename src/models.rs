//! Domain models for the code catalog and the view-models derived from it.
//! The raw record mirrors one row of the remote catalog after its flags have
//! been decoded; the searchable entry is what the selector shows and filters.

use std::fmt;

use serde::Deserialize;

/// Wire value that marks a record as an ETF (`is_etf`).
pub const ETF_SENTINEL: &str = "1";
/// Wire value that marks a record as a SPAC (`is_spac`).
pub const SPAC_SENTINEL: &str = "Y";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One entry of the remote catalog with its category flags already decoded.
pub struct CatalogRecord {
    /// Unique instrument code. Doubles as the primary key of the catalog.
    pub code: String,
    /// Human-readable instrument name.
    pub name: String,
    /// Exchange/market tag exactly as the server reports it.
    pub market: String,
    pub is_etf: bool,
    pub is_spac: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Display-ready view of a [`CatalogRecord`]. `value` is the code that gets
/// reported upward when the entry is chosen; `label` is what the list shows
/// and what the search box matches against.
pub struct SearchableEntry {
    pub value: String,
    pub label: String,
    pub market: String,
    pub is_etf: bool,
    pub is_spac: bool,
}

impl From<&CatalogRecord> for SearchableEntry {
    /// Build the view-model without touching the source record. Labels read
    /// `Name(CODE)`.
    fn from(record: &CatalogRecord) -> Self {
        Self {
            value: record.code.clone(),
            label: format!("{}({})", record.name, record.code),
            market: record.market.clone(),
            is_etf: record.is_etf,
            is_spac: record.is_spac,
        }
    }
}

impl fmt::Display for SearchableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Mutually exclusive category filter offered next to the selector.
pub enum CategoryFilter {
    #[default]
    All,
    Etf,
    Spac,
}

impl CategoryFilter {
    /// Every option in the order the radio group renders them.
    pub const OPTIONS: [CategoryFilter; 3] =
        [CategoryFilter::All, CategoryFilter::Etf, CategoryFilter::Spac];

    /// Whether `entry` belongs to this category.
    pub fn matches(self, entry: &SearchableEntry) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Etf => entry.is_etf,
            CategoryFilter::Spac => entry.is_spac,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryFilter::All => "ALL",
            CategoryFilter::Etf => "ETF",
            CategoryFilter::Spac => "SPAC",
        }
    }

    /// Step through the options, wrapping at both ends.
    pub fn cycle(self, offset: isize) -> Self {
        let len = Self::OPTIONS.len() as isize;
        let index = Self::OPTIONS.iter().position(|c| *c == self).unwrap_or(0) as isize;
        Self::OPTIONS[(index + offset).rem_euclid(len) as usize]
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Full record for a single code as served by `<endpoint>/<code>`. The list
/// endpoint omits `extend_code` and `memedan` from what the selector needs,
/// so they only show up here.
pub struct CodeDetail {
    pub code: String,
    #[serde(default)]
    pub extend_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Order quantity unit.
    #[serde(default)]
    pub memedan: Option<i64>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub is_etf: Option<String>,
    #[serde(default)]
    pub is_spac: Option<String>,
}

impl CodeDetail {
    pub fn is_etf(&self) -> bool {
        self.is_etf.as_deref().map(str::trim) == Some(ETF_SENTINEL)
    }

    pub fn is_spac(&self) -> bool {
        self.is_spac.as_deref().map(str::trim) == Some(SPAC_SENTINEL)
    }
}
