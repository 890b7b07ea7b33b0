//! Integration property tests for paging-core.
//!
//! These tests validate cross-module invariants of the interceptor using
//! property-based testing.

use std::sync::Arc;

use paging_core::{
    context, format_sort, parse_sort, CallTarget, Invocation, PageRequest, Paging,
    PagingDeclaration, PagingError, PagingInterceptor, ParamType, SortCondition, SortDirection,
    Value,
};
use proptest::prelude::*;

struct PagedCall {
    target: Arc<CallTarget>,
    args: Vec<Value>,
    fail: bool,
}

impl Invocation for PagedCall {
    type Output = Option<Paging>;
    type Error = PagingError;

    fn target(&self) -> &Arc<CallTarget> {
        &self.target
    }

    fn arguments(&self) -> &[Value] {
        &self.args
    }

    fn proceed(self) -> Result<Option<Paging>, PagingError> {
        let seen = context::current_paging().ok();
        if self.fail {
            return Err(PagingError::Hook(paging_core::HookError::new("wrapped call failed")));
        }
        Ok(seen)
    }
}

// Strategy: Generate sort properties
fn arb_property() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z_]{0,8}").unwrap()
}

// Strategy: Generate sort condition lists
fn arb_conditions() -> impl Strategy<Value = Vec<SortCondition>> {
    prop::collection::vec(
        (arb_property(), prop::bool::ANY).prop_map(|(property, desc)| {
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            SortCondition::new(property, direction)
        }),
        0..4,
    )
}

fn carrier_target(default_size: u32, default_num: u32) -> Arc<CallTarget> {
    Arc::new(
        CallTarget::builder("svc::paged")
            .named_param("page", ParamType::Object(PageRequest::shape()))
            .declare(
                PagingDeclaration::builder()
                    .default_page_size(default_size)
                    .default_page_num(default_num)
                    .build()
                    .unwrap(),
            )
            .build(),
    )
}

proptest! {
    /// Property: the published value carries present inputs and defaults absent ones
    #[test]
    fn proptest_published_value_matches_inputs(
        default_size in 1u32..100,
        default_num in 1u32..100,
        size in prop::option::of(1u32..1000),
        num in prop::option::of(1u32..1000),
    ) {
        let interceptor = PagingInterceptor::new();
        let mut request = PageRequest::new();
        if let Some(size) = size {
            request = request.with_page_size(size);
        }
        if let Some(num) = num {
            request = request.with_page_num(num);
        }
        let paged_call = PagedCall {
            target: carrier_target(default_size, default_num),
            args: vec![Value::object(request)],
            fail: false,
        };

        let seen = interceptor.intercept(paged_call).unwrap().unwrap();

        prop_assert_eq!(seen.page_size(), size.unwrap_or(default_size));
        prop_assert_eq!(seen.page_num(), num.unwrap_or(default_num));
    }

    /// Property: nothing stays published after any invocation
    ///
    /// Whether the wrapped call succeeds or fails, the context is empty
    /// once `intercept` returns.
    #[test]
    fn proptest_context_is_empty_after_every_call(
        fails in prop::collection::vec(any::<bool>(), 1..8)
    ) {
        let interceptor = PagingInterceptor::new();
        let target = carrier_target(10, 1);

        for fail in fails {
            let paged_call = PagedCall {
                target: Arc::clone(&target),
                args: vec![Value::object(PageRequest::new())],
                fail,
            };
            let result = interceptor.intercept(paged_call);
            prop_assert_eq!(result.is_err(), fail);
            prop_assert!(!context::has_current_paging());
        }
        prop_assert_eq!(interceptor.cache_stats().resolutions, 1);
    }

    /// Property: accepted sort text is republished in canonical form
    #[test]
    fn proptest_sort_is_published_canonically(conditions in arb_conditions()) {
        let interceptor = PagingInterceptor::new();
        let spaced = conditions
            .iter()
            .map(|c| format!(" {}:{} ", c.property(), c.direction().to_string().to_uppercase()))
            .collect::<Vec<_>>()
            .join(",");
        let paged_call = PagedCall {
            target: carrier_target(10, 1),
            args: vec![Value::object(PageRequest::new().with_sort(spaced))],
            fail: false,
        };

        let seen = interceptor.intercept(paged_call).unwrap().unwrap();

        prop_assert_eq!(seen.sort(), format_sort(&conditions));
        prop_assert_eq!(parse_sort(&seen.sort()).unwrap(), conditions);
    }
}
