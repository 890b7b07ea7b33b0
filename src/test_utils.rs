//! Proptest strategies shared by the unit test modules.

use proptest::prelude::*;

use crate::pageable::PageRequest;
use crate::sort::{SortCondition, SortDirection};

/// Property names as they appear in sort text.
pub fn arb_property() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("valid regex")
}

/// Either sort direction.
pub fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

/// Up to four sort conditions.
pub fn arb_sort_conditions() -> impl Strategy<Value = Vec<SortCondition>> {
    prop::collection::vec(
        (arb_property(), arb_direction()).prop_map(|(p, d)| SortCondition::new(p, d)),
        0..4,
    )
}

/// Carriers with any mix of set and unset fields.
pub fn arb_page_request() -> impl Strategy<Value = PageRequest> {
    (
        prop::option::of(1u32..1000),
        prop::option::of(1u32..1000),
        prop::option::of(arb_sort_conditions()),
    )
        .prop_map(|(size, num, sort)| {
            let mut request = PageRequest::new();
            if let Some(size) = size {
                request = request.with_page_size(size);
            }
            if let Some(num) = num {
                request = request.with_page_num(num);
            }
            if let Some(sort) = sort {
                request = request.with_sort(crate::sort::format_sort(&sort));
            }
            request
        })
}
