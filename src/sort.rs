//! Sort grammar, whitelist enforcement and the sort-capability decorator.
//!
//! Sort text is a comma-separated list of `property:direction` pairs, for
//! example `"name:asc, age:desc"`. Directions are case-insensitive. Empty
//! entries are skipped, so `""` and `" , "` both mean "no sort requested".

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{SortError, SortErrorKind};
use crate::pageable::{Pageable, PageableMut, Paging};
use crate::strategy::ResolvedStrategy;
use crate::value::Value;

/// Ordering direction of one sort condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl FromStr for SortDirection {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let direction = s.trim();
        if direction.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if direction.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(SortError::new(SortErrorKind::InvalidDirection {
                direction: direction.to_string(),
            }))
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// One `property:direction` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortCondition {
    property: String,
    direction: SortDirection,
}

impl SortCondition {
    /// Creates a condition.
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    /// Creates an ascending condition.
    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    /// Creates a descending condition.
    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    /// Returns the sorted property.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Returns the direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl FromStr for SortCondition {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            SortError::new(SortErrorKind::MalformedCondition {
                condition: s.trim().to_string(),
            })
        };
        let (property, direction) = s.split_once(':').ok_or_else(malformed)?;
        let property = property.trim();
        if property.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(property, direction.parse()?))
    }
}

impl fmt::Display for SortCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.property, self.direction)
    }
}

/// Parses sort text into an ordered list of conditions.
///
/// # Errors
///
/// Fails on the first entry that is not `property:direction` or whose
/// direction is neither `asc` nor `desc`.
///
/// # Examples
///
/// ```
/// use paging_core::{parse_sort, SortCondition};
///
/// let conditions = parse_sort("name:asc, age:DESC").unwrap();
/// assert_eq!(conditions, vec![SortCondition::asc("name"), SortCondition::desc("age")]);
///
/// assert!(parse_sort("name:up").is_err());
/// assert!(parse_sort("  ").unwrap().is_empty());
/// ```
pub fn parse_sort(text: &str) -> Result<Vec<SortCondition>, SortError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

/// Joins conditions back into canonical sort text (`name:asc,age:desc`).
pub fn format_sort(conditions: &[SortCondition]) -> String {
    conditions
        .iter()
        .map(SortCondition::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// The set of properties a call target allows sorting on.
///
/// An empty whitelist places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortWhitelist {
    properties: BTreeSet<String>,
}

impl SortWhitelist {
    /// Creates a whitelist from property names.
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` when no restriction applies.
    pub fn is_unrestricted(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns `true` when sorting on `property` is allowed.
    pub fn permits(&self, property: &str) -> bool {
        self.is_unrestricted() || self.properties.contains(property)
    }

    /// Checks every condition against the whitelist.
    ///
    /// # Errors
    ///
    /// Names the first property that is not allowed.
    pub fn check(&self, conditions: &[SortCondition]) -> Result<(), SortError> {
        match conditions.iter().find(|c| !self.permits(c.property())) {
            Some(illegal) => Err(SortError::new(SortErrorKind::PropertyNotAllowed {
                property: illegal.property().to_string(),
            })),
            None => Ok(()),
        }
    }
}

/// Paging value with a structured, whitelisted sort.
///
/// The sort text is always regenerated from the condition list, so setting
/// `"name: ASC ,age:desc"` reads back as `"name:asc,age:desc"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedPagingValue {
    page_size: u32,
    page_num: u32,
    conditions: Vec<SortCondition>,
    whitelist: Arc<SortWhitelist>,
}

impl SortedPagingValue {
    /// Returns the page size.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the page number.
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    /// Returns the sort conditions in order.
    pub fn conditions(&self) -> &[SortCondition] {
        &self.conditions
    }

    /// Returns the sort text rebuilt from the condition list.
    pub fn sort(&self) -> String {
        format_sort(&self.conditions)
    }

    /// Replaces the condition list.
    ///
    /// # Errors
    ///
    /// Rejects conditions outside the call target's whitelist, leaving the
    /// current list untouched.
    pub fn set_conditions(&mut self, conditions: Vec<SortCondition>) -> Result<(), SortError> {
        self.whitelist.check(&conditions)?;
        self.conditions = conditions;
        Ok(())
    }
}

impl Pageable for SortedPagingValue {
    fn page_size(&self) -> Option<u32> {
        Some(self.page_size)
    }

    fn page_num(&self) -> Option<u32> {
        Some(self.page_num)
    }

    fn sort(&self) -> Option<String> {
        Some(SortedPagingValue::sort(self))
    }
}

impl PageableMut for SortedPagingValue {
    fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
    }

    fn set_page_num(&mut self, page_num: u32) {
        self.page_num = page_num;
    }

    fn set_sort(&mut self, sort: &str) -> Result<(), SortError> {
        let conditions = parse_sort(sort)?;
        self.set_conditions(conditions)
    }
}

/// Decorator adding sort parsing and whitelist enforcement to a strategy.
#[derive(Debug, Clone)]
pub struct SortableStrategy {
    inner: ResolvedStrategy,
    whitelist: Arc<SortWhitelist>,
}

impl SortableStrategy {
    /// Wraps `inner`, restricting sorts to `whitelist`.
    pub fn new(inner: ResolvedStrategy, whitelist: SortWhitelist) -> Self {
        Self {
            inner,
            whitelist: Arc::new(whitelist),
        }
    }

    /// Returns the wrapped strategy.
    pub fn inner(&self) -> &ResolvedStrategy {
        &self.inner
    }

    /// Extracts paging from `args` and validates its sort.
    ///
    /// The result is always [`Paging::Sorted`], with an empty condition list
    /// when no sort was given, so later sort changes stay whitelisted.
    ///
    /// # Errors
    ///
    /// Returns a [`SortError`] for malformed sort text or a property outside
    /// the whitelist. Neither falls back to the default sort.
    pub fn extract(&self, args: &[Value]) -> Result<Option<Paging>, SortError> {
        let Some(value) = self.inner.extract(args) else {
            return Ok(None);
        };
        let conditions = parse_sort(&value.sort)?;
        self.whitelist.check(&conditions)?;
        Ok(Some(Paging::Sorted(SortedPagingValue {
            page_size: value.page_size,
            page_num: value.page_num,
            conditions,
            whitelist: Arc::clone(&self.whitelist),
        })))
    }
}
