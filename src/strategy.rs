//! Extraction strategies.
//!
//! A [`ResolvedStrategy`] is computed once per call target and then applied
//! to the arguments of every invocation. It owns indices, field names and
//! defaults only; it never holds on to argument values.

use crate::pageable::PagingValue;
use crate::value::{arg_at, is_blank, Value};

/// Defaults substituted for absent paging inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDefaults {
    page_size: u32,
    page_num: u32,
    sort: String,
}

impl PageDefaults {
    /// Creates a set of defaults.
    pub fn new(page_size: u32, page_num: u32, sort: impl Into<String>) -> Self {
        Self {
            page_size,
            page_num,
            sort: sort.into(),
        }
    }

    /// Fills each absent input independently.
    ///
    /// Blank sort text counts as absent.
    fn apply(
        &self,
        page_size: Option<u32>,
        page_num: Option<u32>,
        sort: Option<String>,
    ) -> PagingValue {
        PagingValue {
            page_size: page_size.unwrap_or(self.page_size),
            page_num: page_num.unwrap_or(self.page_num),
            sort: sort
                .filter(|s| !is_blank(s))
                .unwrap_or_else(|| self.sort.clone()),
        }
    }
}

/// Field or key names read from a paging argument.
///
/// `None` means the declaration gave no name for that input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingFields {
    /// Field holding the page size
    pub page_size: Option<String>,
    /// Field holding the page number
    pub page_num: Option<String>,
    /// Field holding the sort text
    pub sort: Option<String>,
}

/// Argument positions of top-level paging parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingPositions {
    /// Position of the page size argument
    pub page_size: Option<usize>,
    /// Position of the page number argument
    pub page_num: Option<usize>,
    /// Position of the sort argument
    pub sort: Option<usize>,
}

/// How paging parameters are found for one call target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedStrategy {
    /// The argument at `index` is itself a paging carrier
    ByCarrierArgument {
        /// Argument position
        index: usize,
        /// Defaults for absent inputs
        defaults: PageDefaults,
    },
    /// Named fields of the object argument at `index` hold the inputs
    ByArgumentFields {
        /// Argument position
        index: usize,
        /// Field names, checked against the parameter's shape
        fields: PagingFields,
        /// Defaults for absent inputs
        defaults: PageDefaults,
    },
    /// Keys of the mapping argument at `index` hold the inputs
    ByMapArgument {
        /// Argument position
        index: usize,
        /// Keys to look up
        keys: PagingFields,
        /// Defaults for absent inputs
        defaults: PageDefaults,
    },
    /// Distinct top-level arguments hold the inputs
    ByNamedParameters {
        /// Resolved argument positions
        positions: PagingPositions,
        /// Defaults for absent inputs
        defaults: PageDefaults,
    },
    /// The call target is not paged
    NoPaging,
}

impl ResolvedStrategy {
    /// Short name of the variant, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ByCarrierArgument { .. } => "carrier-argument",
            Self::ByArgumentFields { .. } => "argument-fields",
            Self::ByMapArgument { .. } => "map-argument",
            Self::ByNamedParameters { .. } => "named-parameters",
            Self::NoPaging => "no-paging",
        }
    }

    /// Reads this invocation's paging parameters.
    ///
    /// Returns `None` when the paging argument itself is absent or the target
    /// is not paged. Absent or mistyped inputs fall back to defaults.
    pub fn extract(&self, args: &[Value]) -> Option<PagingValue> {
        match self {
            Self::ByCarrierArgument { index, defaults } => {
                let carrier = arg_at(args, *index)?.as_pageable()?;
                Some(defaults.apply(carrier.page_size(), carrier.page_num(), carrier.sort()))
            }
            Self::ByArgumentFields {
                index,
                fields,
                defaults,
            }
            | Self::ByMapArgument {
                index,
                keys: fields,
                defaults,
            } => {
                let arg = arg_at(args, *index)?;
                let read = |name: &Option<String>| name.as_deref().and_then(|n| arg.field(n));
                Some(defaults.apply(
                    read(&fields.page_size).and_then(|v| v.as_page_number()),
                    read(&fields.page_num).and_then(|v| v.as_page_number()),
                    read(&fields.sort).and_then(|v| v.as_text().map(str::to_string)),
                ))
            }
            Self::ByNamedParameters {
                positions,
                defaults,
            } => {
                let read = |position: Option<usize>| position.and_then(|i| arg_at(args, i));
                Some(defaults.apply(
                    read(positions.page_size).and_then(Value::as_page_number),
                    read(positions.page_num).and_then(Value::as_page_number),
                    read(positions.sort)
                        .and_then(Value::as_text)
                        .map(str::to_string),
                ))
            }
            Self::NoPaging => None,
        }
    }

    /// Returns the argument a carrier strategy expected to page by, when it
    /// is present but does not expose the carrier shape at runtime.
    pub fn mismatched_carrier<'a>(&self, args: &'a [Value]) -> Option<&'a Value> {
        match self {
            Self::ByCarrierArgument { index, .. } => {
                arg_at(args, *index).filter(|arg| arg.as_pageable().is_none())
            }
            _ => None,
        }
    }
}
