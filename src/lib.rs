//! Automatic paging for intercepted calls.
//!
//! A call target declares how its arguments carry paging parameters. On every
//! invocation the interceptor derives a paging value from the live arguments,
//! publishes it for the duration of the call, and optionally runs paging
//! hooks around it:
//! - **Resolution**: each call target's extraction strategy is decided once
//!   and cached, including configuration failures
//! - **Extraction**: from a carrier argument, fields of one argument, keys of
//!   a map argument, or named parameters
//! - **Sorting**: sort text is parsed into conditions and checked against a
//!   per-declaration whitelist
//! - **Context**: the value is visible through [`context::current_paging`]
//!   only while the wrapped call runs
//!
//! # Core Types
//!
//! - [`PagingDeclaration`]: Per-target paging configuration
//! - [`CallTarget`]: A method signature with an optional declaration
//! - [`PagingInterceptor`]: Runs [`Invocation`]s with paging applied
//! - [`Paging`]: The value published to the call-scoped context
//! - [`PagingHooks`]: Start and clear paging in a data layer
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//! use paging_core::{
//!     CallTarget, PagingDeclaration, PagingInterceptor, ParamType, ResolvedStrategy,
//! };
//!
//! let declaration = PagingDeclaration::builder()
//!     .arg_index(0)
//!     .page_size_param("limit")
//!     .page_num_param("page")
//!     .build()
//!     .expect("valid declaration");
//! let target = CallTarget::builder("OrderService::search")
//!     .named_param("filters", ParamType::Map)
//!     .declare(declaration)
//!     .build();
//!
//! let interceptor = PagingInterceptor::new();
//! let ops = interceptor.resolve(&target).expect("resolvable");
//! assert!(matches!(ops.strategy(), ResolvedStrategy::ByMapArgument { .. }));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod condition;
pub mod context;
mod declaration;
mod error;
mod interceptor;
mod logging;
mod pageable;
mod resolver;
mod sort;
mod strategy;
mod target;
mod value;

#[cfg(test)]
mod test_utils;

pub use cache::{CacheStats, ResolutionCache};
pub use condition::{ArgumentConditionEvaluator, ConditionEvaluator};
pub use context::ContextGuard;
pub use declaration::{
    ApplyCondition, PagingDeclaration, PagingDeclarationBuilder, ALWAYS_APPLY, NEVER_APPLY,
};
pub use error::{
    ConfigError, ConfigErrorKind, ContextError, EvalError, HookError, PagingError, SortError,
    SortErrorKind,
};
pub use interceptor::{
    Invocation, NoHooks, Outcome, PagingHooks, PagingInterceptor, PagingInterceptorBuilder,
    PagingOps,
};
pub use pageable::{PageRequest, Pageable, PageableMut, Paging, PagingValue};
pub use resolver::resolve;
pub use sort::{
    format_sort, parse_sort, SortCondition, SortDirection, SortWhitelist, SortableStrategy,
    SortedPagingValue,
};
pub use strategy::{PageDefaults, PagingFields, PagingPositions, ResolvedStrategy};
pub use target::{CallTarget, CallTargetBuilder, TargetId};
pub use value::{arg_at, is_blank, ParamType, Record, Reflect, TypeShape, Value};
