use std::fmt;

use crate::error::SortError;
use crate::sort::SortedPagingValue;
use crate::value::{Reflect, TypeShape, Value};

/// Read access to paging parameters carried by an object.
///
/// Any argument whose [`Reflect::as_pageable`] returns `Some` can serve as a
/// paging source without further configuration.
pub trait Pageable: fmt::Debug + Send + Sync {
    /// Requested page size, if set.
    fn page_size(&self) -> Option<u32>;

    /// Requested page number, if set.
    fn page_num(&self) -> Option<u32>;

    /// Requested sort text, if set.
    fn sort(&self) -> Option<String>;
}

/// Write access to paging parameters.
pub trait PageableMut: Pageable {
    /// Replaces the page size.
    fn set_page_size(&mut self, page_size: u32);

    /// Replaces the page number.
    fn set_page_num(&mut self, page_num: u32);

    /// Replaces the sort text.
    ///
    /// # Errors
    ///
    /// Implementations that keep a structured sort reject text they cannot parse.
    fn set_sort(&mut self, sort: &str) -> Result<(), SortError>;
}

/// Stock paging carrier.
///
/// Add a `PageRequest` parameter to a call target and the engine will find it
/// without any argument index or names in the declaration.
///
/// # Examples
///
/// ```
/// use paging_core::{PageRequest, Pageable};
///
/// let request = PageRequest::new().with_page_num(3);
///
/// assert_eq!(request.page_num(), Some(3));
/// assert_eq!(request.page_size(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    page_size: Option<u32>,
    page_num: Option<u32>,
    sort: Option<String>,
}

impl PageRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the page number.
    pub fn with_page_num(mut self, page_num: u32) -> Self {
        self.page_num = Some(page_num);
        self
    }

    /// Sets the sort text.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Static shape of `PageRequest` parameters.
    pub fn shape() -> TypeShape {
        TypeShape::new("PageRequest")
            .with_fields(["page_size", "page_num", "sort"])
            .pageable()
    }
}

impl Pageable for PageRequest {
    fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    fn page_num(&self) -> Option<u32> {
        self.page_num
    }

    fn sort(&self) -> Option<String> {
        self.sort.clone()
    }
}

impl PageableMut for PageRequest {
    fn set_page_size(&mut self, page_size: u32) {
        self.page_size = Some(page_size);
    }

    fn set_page_num(&mut self, page_num: u32) {
        self.page_num = Some(page_num);
    }

    fn set_sort(&mut self, sort: &str) -> Result<(), SortError> {
        self.sort = Some(sort.to_string());
        Ok(())
    }
}

impl Reflect for PageRequest {
    fn type_name(&self) -> &str {
        "PageRequest"
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "page_size" => Some(self.page_size.into()),
            "page_num" => Some(self.page_num.into()),
            "sort" => Some(self.sort.clone().into()),
            _ => None,
        }
    }

    fn as_pageable(&self) -> Option<&dyn Pageable> {
        Some(self)
    }
}

/// Paging parameters resolved for one invocation.
///
/// Every field is populated: absent inputs have already been replaced by the
/// declaration's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingValue {
    /// Page size
    pub page_size: u32,
    /// One-based page number
    pub page_num: u32,
    /// Sort text, possibly empty
    pub sort: String,
}

impl PagingValue {
    /// Creates a paging value.
    pub fn new(page_size: u32, page_num: u32, sort: impl Into<String>) -> Self {
        Self {
            page_size,
            page_num,
            sort: sort.into(),
        }
    }

    /// Zero-based offset of the first row of the page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_num.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Pageable for PagingValue {
    fn page_size(&self) -> Option<u32> {
        Some(self.page_size)
    }

    fn page_num(&self) -> Option<u32> {
        Some(self.page_num)
    }

    fn sort(&self) -> Option<String> {
        Some(self.sort.clone())
    }
}

impl PageableMut for PagingValue {
    fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
    }

    fn set_page_num(&mut self, page_num: u32) {
        self.page_num = page_num;
    }

    fn set_sort(&mut self, sort: &str) -> Result<(), SortError> {
        self.sort = sort.to_string();
        Ok(())
    }
}

/// The value published to the call-scoped context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paging {
    /// Paging without structured sort conditions
    Plain(PagingValue),
    /// Paging whose sort text was parsed and checked against a whitelist
    Sorted(SortedPagingValue),
}

impl Paging {
    /// Returns the page size.
    pub fn page_size(&self) -> u32 {
        match self {
            Paging::Plain(p) => p.page_size,
            Paging::Sorted(p) => p.page_size(),
        }
    }

    /// Returns the page number.
    pub fn page_num(&self) -> u32 {
        match self {
            Paging::Plain(p) => p.page_num,
            Paging::Sorted(p) => p.page_num(),
        }
    }

    /// Returns the sort text.
    ///
    /// For sorted paging the text is regenerated from the condition list.
    pub fn sort(&self) -> String {
        match self {
            Paging::Plain(p) => p.sort.clone(),
            Paging::Sorted(p) => p.sort(),
        }
    }

    /// Returns the structured sort, if the value was sorted.
    pub fn as_sorted(&self) -> Option<&SortedPagingValue> {
        match self {
            Paging::Sorted(p) => Some(p),
            Paging::Plain(_) => None,
        }
    }

    /// Zero-based offset of the first row of the page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_num().saturating_sub(1)) * u64::from(self.page_size())
    }
}

impl Pageable for Paging {
    fn page_size(&self) -> Option<u32> {
        Some(Paging::page_size(self))
    }

    fn page_num(&self) -> Option<u32> {
        Some(Paging::page_num(self))
    }

    fn sort(&self) -> Option<String> {
        Some(Paging::sort(self))
    }
}

impl PageableMut for Paging {
    fn set_page_size(&mut self, page_size: u32) {
        match self {
            Paging::Plain(p) => p.set_page_size(page_size),
            Paging::Sorted(p) => p.set_page_size(page_size),
        }
    }

    fn set_page_num(&mut self, page_num: u32) {
        match self {
            Paging::Plain(p) => p.set_page_num(page_num),
            Paging::Sorted(p) => p.set_page_num(page_num),
        }
    }

    fn set_sort(&mut self, sort: &str) -> Result<(), SortError> {
        match self {
            Paging::Plain(p) => p.set_sort(sort),
            Paging::Sorted(p) => p.set_sort(sort),
        }
    }
}

impl From<PagingValue> for Paging {
    fn from(value: PagingValue) -> Self {
        Paging::Plain(value)
    }
}

impl From<SortedPagingValue> for Paging {
    fn from(value: SortedPagingValue) -> Self {
        Paging::Sorted(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_exposes_carrier_shape() {
        let request = PageRequest::new().with_page_size(25).with_sort("id:desc");
        let value = Value::object(request);

        let carrier = value.as_pageable().expect("PageRequest is a carrier");
        assert_eq!(carrier.page_size(), Some(25));
        assert_eq!(carrier.page_num(), None);
        assert_eq!(carrier.sort().as_deref(), Some("id:desc"));

        assert!(PageRequest::shape().is_pageable());
    }

    #[test]
    fn page_request_fields_are_reflected() {
        let value = Value::object(PageRequest::new().with_page_num(2));

        assert_eq!(value.field("page_num").and_then(|v| v.as_int()), Some(2));
        assert!(value.field("page_size").is_some_and(|v| v.is_null()));
        assert!(value.field("limit").is_none());
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PagingValue::new(10, 1, "").offset(), 0);
        assert_eq!(PagingValue::new(10, 3, "").offset(), 20);
        assert_eq!(PagingValue::new(10, 0, "").offset(), 0);
    }

    #[test]
    fn plain_paging_setters_replace_values() {
        let mut paging = Paging::from(PagingValue::new(10, 1, ""));

        paging.set_page_num(4);
        paging.set_page_size(50);
        paging.set_sort("anything goes").expect("plain sort is free text");

        assert_eq!(paging.page_num(), 4);
        assert_eq!(paging.page_size(), 50);
        assert_eq!(paging.sort(), "anything goes");
        assert!(paging.as_sorted().is_none());
    }
}
