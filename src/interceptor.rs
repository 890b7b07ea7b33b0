//! Invocation orchestration.
//!
//! One intercepted call goes through these steps:
//!
//! ```text
//! resolve (cached) -> extract -> publish -> gate -> start_page
//!                        |            -> proceed -> clear_page -> unpublish
//!                        |
//!                        +-- nothing extracted: proceed directly
//! ```
//!
//! The published value is removed on every exit path, including failures of
//! the gating condition, the `start_page` hook, the wrapped call, and panics.

use std::any::Any;
use std::sync::Arc;

use crate::cache::{CacheStats, ResolutionCache};
use crate::condition::{ArgumentConditionEvaluator, ConditionEvaluator};
use crate::context;
use crate::declaration::{ApplyCondition, PagingDeclaration};
use crate::error::{ConfigError, EvalError, HookError, PagingError, SortError};
use crate::logging::PagingLog;
use crate::pageable::Paging;
use crate::resolver;
use crate::sort::SortableStrategy;
use crate::strategy::ResolvedStrategy;
use crate::target::CallTarget;
use crate::value::Value;

/// One intercepted call, as seen by the interceptor.
///
/// Engine failures reach the caller through `From<PagingError>` on the
/// call's own error type. Failures of [`Invocation::proceed`] are returned
/// untouched.
pub trait Invocation {
    /// Value returned by the wrapped call
    type Output;
    /// Error returned by the wrapped call
    type Error: From<PagingError>;

    /// The call target being invoked.
    fn target(&self) -> &Arc<CallTarget>;

    /// This invocation's argument values, in parameter order.
    fn arguments(&self) -> &[Value];

    /// Runs the wrapped call.
    fn proceed(self) -> Result<Self::Output, Self::Error>;
}

/// Result of the wrapped call, handed to [`PagingHooks::clear_page`].
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// The call returned this value
    Returned(&'a dyn Any),
    /// The call failed with this error
    Failed(&'a dyn Any),
}

impl<'a> Outcome<'a> {
    /// Returns `true` if the call returned normally.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Returned(_))
    }

    /// Returns the returned value if it has type `T`.
    pub fn returned<T: Any>(&self) -> Option<&'a T> {
        match self {
            Outcome::Returned(value) => value.downcast_ref(),
            Outcome::Failed(_) => None,
        }
    }

    /// Returns the error if it has type `E`.
    pub fn failed<E: Any>(&self) -> Option<&'a E> {
        match self {
            Outcome::Failed(error) => error.downcast_ref(),
            Outcome::Returned(_) => None,
        }
    }
}

/// Extension points around an actively paged call.
///
/// Both hooks run only when the gating condition holds. The defaults do
/// nothing; implement them to start and finish paging in a data layer.
pub trait PagingHooks: Send + Sync {
    /// Runs before the wrapped call. Changes to `paging` are published.
    ///
    /// # Errors
    ///
    /// An error aborts the invocation before the wrapped call runs.
    fn start_page(
        &self,
        _paging: &mut Paging,
        _target: &CallTarget,
        _args: &[Value],
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after the wrapped call, whether it succeeded or failed.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored; they never replace the
    /// wrapped call's result.
    fn clear_page(
        &self,
        _paging: &Paging,
        _target: &CallTarget,
        _outcome: Outcome<'_>,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl PagingHooks for NoHooks {}

/// Everything the interceptor needs to page one call target.
///
/// Built once per call target and shared read-only by all its invocations.
#[derive(Debug)]
pub struct PagingOps {
    condition: ApplyCondition,
    source: PagingSource,
}

#[derive(Debug)]
enum PagingSource {
    Plain(ResolvedStrategy),
    Sortable(SortableStrategy),
}

impl PagingOps {
    fn new(declaration: &PagingDeclaration, strategy: ResolvedStrategy, sortable: bool) -> Self {
        let source = if sortable {
            PagingSource::Sortable(SortableStrategy::new(
                strategy,
                declaration.sort_whitelist().clone(),
            ))
        } else {
            PagingSource::Plain(strategy)
        };
        Self {
            condition: declaration.condition().clone(),
            source,
        }
    }

    fn no_paging() -> Self {
        Self {
            condition: ApplyCondition::Never,
            source: PagingSource::Plain(ResolvedStrategy::NoPaging),
        }
    }

    /// Returns the gating condition.
    pub fn condition(&self) -> &ApplyCondition {
        &self.condition
    }

    /// Returns the resolved extraction strategy.
    pub fn strategy(&self) -> &ResolvedStrategy {
        match &self.source {
            PagingSource::Plain(strategy) => strategy,
            PagingSource::Sortable(sortable) => sortable.inner(),
        }
    }

    /// Returns `true` when sort text is parsed and whitelisted.
    pub fn validates_sort(&self) -> bool {
        matches!(self.source, PagingSource::Sortable(_))
    }

    /// Extracts this invocation's paging value.
    ///
    /// # Errors
    ///
    /// Returns a [`SortError`] when sort validation is on and the sort is
    /// malformed or not whitelisted.
    pub fn extract(&self, args: &[Value]) -> Result<Option<Paging>, SortError> {
        match &self.source {
            PagingSource::Plain(strategy) => Ok(strategy.extract(args).map(Paging::Plain)),
            PagingSource::Sortable(sortable) => sortable.extract(args),
        }
    }
}

/// Augments intercepted calls with automatically derived paging.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use paging_core::{
///     context, CallTarget, Invocation, PageRequest, PagingDeclaration, PagingError,
///     PagingInterceptor, ParamType, Value,
/// };
///
/// struct Call {
///     target: Arc<CallTarget>,
///     args: Vec<Value>,
/// }
///
/// impl Invocation for Call {
///     type Output = u32;
///     type Error = PagingError;
///
///     fn target(&self) -> &Arc<CallTarget> {
///         &self.target
///     }
///
///     fn arguments(&self) -> &[Value] {
///         &self.args
///     }
///
///     fn proceed(self) -> Result<u32, PagingError> {
///         // The wrapped body reads the published paging value.
///         Ok(context::current_paging().map(|p| p.page_size()).unwrap_or(0))
///     }
/// }
///
/// let target = Arc::new(
///     CallTarget::builder("UserService::page_users")
///         .named_param("page", ParamType::Object(PageRequest::shape()))
///         .declare(PagingDeclaration::builder().default_page_size(25).build().unwrap())
///         .build(),
/// );
/// let interceptor = PagingInterceptor::new();
///
/// let call = Call { target, args: vec![Value::object(PageRequest::new())] };
/// assert_eq!(interceptor.intercept(call).unwrap(), 25);
/// assert!(!context::has_current_paging());
/// ```
pub struct PagingInterceptor<H = NoHooks> {
    cache: ResolutionCache<PagingOps>,
    evaluator: Box<dyn ConditionEvaluator>,
    hooks: H,
    sort_validation: bool,
}

impl PagingInterceptor {
    /// Creates an interceptor with the stock evaluator, no hooks and sort validation on.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring an interceptor.
    pub fn builder() -> PagingInterceptorBuilder<NoHooks> {
        PagingInterceptorBuilder {
            evaluator: Box::new(ArgumentConditionEvaluator::new()),
            hooks: NoHooks,
            sort_validation: true,
        }
    }
}

impl Default for PagingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PagingHooks> PagingInterceptor<H> {
    /// Runs `invocation` with its paging value published.
    ///
    /// # Errors
    ///
    /// Configuration, sort, condition and `start_page` failures are converted
    /// into `I::Error` and returned before the wrapped call runs. Failures of
    /// the wrapped call are returned as they are.
    pub fn intercept<I>(&self, invocation: I) -> Result<I::Output, I::Error>
    where
        I: Invocation,
        I::Output: 'static,
        I::Error: 'static,
    {
        let target = Arc::clone(invocation.target());
        let log = PagingLog::new(target.id());

        let ops = self.resolve(&target).map_err(PagingError::from)?;
        let extracted = ops
            .extract(invocation.arguments())
            .map_err(PagingError::from)?;
        let Some(paging) = extracted else {
            match ops.strategy().mismatched_carrier(invocation.arguments()) {
                Some(arg) => log.debug(format_args!(
                    "argument of type '{}' is not a paging carrier, calling through",
                    arg.type_name()
                )),
                None => log.debug(format_args!("no paging value, calling through")),
            }
            return invocation.proceed();
        };

        let guard = context::publish(paging);
        let active = self
            .should_apply(ops.condition(), &target, invocation.arguments())
            .map_err(PagingError::from)?;
        if active {
            let args = invocation.arguments();
            if let Ok(Err(e)) =
                context::with_current_paging(|paging| self.hooks.start_page(paging, &target, args))
            {
                return Err(PagingError::from(e).into());
            }
        }
        log.debug(format_args!("published paging, active: {}", active));

        let result = invocation.proceed();

        if active {
            if let Some(paging) = guard.current() {
                let outcome = match &result {
                    Ok(value) => Outcome::Returned(value),
                    Err(error) => Outcome::Failed(error),
                };
                if let Err(e) = self.hooks.clear_page(&paging, &target, outcome) {
                    log.warn(format_args!("clear_page hook failed: {}", e));
                }
            }
        }
        drop(guard);
        log.debug(format_args!("paging context cleared"));
        result
    }

    /// Returns the cached paging operations for `target`, resolving them on first use.
    ///
    /// Targets without a declaration resolve to [`ResolvedStrategy::NoPaging`].
    ///
    /// # Errors
    ///
    /// Returns the resolution's [`ConfigError`], now and on every later call.
    pub fn resolve(&self, target: &CallTarget) -> Result<Arc<PagingOps>, ConfigError> {
        self.cache.get_or_resolve(target, |target| {
            let Some(declaration) = target.declaration() else {
                return Ok(PagingOps::no_paging());
            };
            let log = PagingLog::new(target.id());
            match resolver::resolve(declaration, target) {
                Ok(strategy) => {
                    log.info(format_args!("applying auto paging by {}", strategy.name()));
                    Ok(PagingOps::new(declaration, strategy, self.sort_validation))
                }
                Err(e) => {
                    log.warn(format_args!("cannot apply auto paging: {}", e));
                    Err(e)
                }
            }
        })
    }

    /// Returns resolution cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns the hooks.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    fn should_apply(
        &self,
        condition: &ApplyCondition,
        target: &CallTarget,
        args: &[Value],
    ) -> Result<bool, EvalError> {
        match condition {
            ApplyCondition::Always => Ok(true),
            ApplyCondition::Never => Ok(false),
            ApplyCondition::Expression(expression) => {
                self.evaluator.evaluate(expression, target, args)
            }
        }
    }
}

/// Builder for [`PagingInterceptor`].
pub struct PagingInterceptorBuilder<H> {
    evaluator: Box<dyn ConditionEvaluator>,
    hooks: H,
    sort_validation: bool,
}

impl<H: PagingHooks> PagingInterceptorBuilder<H> {
    /// Replaces the condition evaluator.
    pub fn evaluator(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Installs paging hooks.
    pub fn hooks<H2: PagingHooks>(self, hooks: H2) -> PagingInterceptorBuilder<H2> {
        PagingInterceptorBuilder {
            evaluator: self.evaluator,
            hooks,
            sort_validation: self.sort_validation,
        }
    }

    /// Turns sort parsing and whitelist enforcement on or off.
    pub fn sort_validation(mut self, enabled: bool) -> Self {
        self.sort_validation = enabled;
        self
    }

    /// Builds the interceptor.
    pub fn build(self) -> PagingInterceptor<H> {
        PagingInterceptor {
            cache: ResolutionCache::new(),
            evaluator: self.evaluator,
            hooks: self.hooks,
            sort_validation: self.sort_validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigErrorKind, SortErrorKind};
    use crate::pageable::{PageRequest, PageableMut};
    use crate::value::ParamType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Call<F> {
        target: Arc<CallTarget>,
        args: Vec<Value>,
        body: F,
    }

    impl<F, T> Invocation for Call<F>
    where
        F: FnOnce(Vec<Value>) -> Result<T, PagingError>,
    {
        type Output = T;
        type Error = PagingError;

        fn target(&self) -> &Arc<CallTarget> {
            &self.target
        }

        fn arguments(&self) -> &[Value] {
            &self.args
        }

        fn proceed(self) -> Result<T, PagingError> {
            (self.body)(self.args)
        }
    }

    fn call<F, T>(target: &Arc<CallTarget>, args: Vec<Value>, body: F) -> Call<F>
    where
        F: FnOnce(Vec<Value>) -> Result<T, PagingError>,
    {
        Call {
            target: Arc::clone(target),
            args,
            body,
        }
    }

    fn carrier_target(declaration: PagingDeclaration) -> Arc<CallTarget> {
        Arc::new(
            CallTarget::builder("svc::page")
                .named_param("page", ParamType::Object(PageRequest::shape()))
                .declare(declaration)
                .build(),
        )
    }

    fn published() -> Result<Paging, PagingError> {
        context::current_paging().map_err(|_| PagingError::Hook(HookError::new("not published")))
    }

    #[derive(Default)]
    struct Recording {
        started: AtomicUsize,
        cleared: Mutex<Vec<(u32, bool)>>,
    }

    impl PagingHooks for Recording {
        fn start_page(
            &self,
            paging: &mut Paging,
            _target: &CallTarget,
            _args: &[Value],
        ) -> Result<(), HookError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            paging.set_page_size(99);
            Ok(())
        }

        fn clear_page(
            &self,
            paging: &Paging,
            _target: &CallTarget,
            outcome: Outcome<'_>,
        ) -> Result<(), HookError> {
            self.cleared
                .lock()
                .expect("not poisoned")
                .push((paging.page_size(), outcome.is_success()));
            Err(HookError::new("cleanup failed"))
        }
    }

    #[test]
    fn publishes_during_call_only() {
        let interceptor = PagingInterceptor::new();
        let target = carrier_target(PagingDeclaration::builder().build().expect("valid"));
        let args = vec![Value::object(PageRequest::new().with_page_num(3))];

        let seen = interceptor
            .intercept(call(&target, args, |_| published()))
            .expect("call succeeds");

        assert_eq!((seen.page_size(), seen.page_num(), seen.sort()), (10, 3, String::new()));
        assert!(seen.as_sorted().is_some());
        assert!(!context::has_current_paging());
    }

    #[test]
    fn absent_carrier_skips_publication() {
        let interceptor = PagingInterceptor::new();
        let target = carrier_target(PagingDeclaration::builder().build().expect("valid"));

        let had_paging = interceptor
            .intercept(call(&target, vec![Value::Null], |_| {
                Ok(context::has_current_paging())
            }))
            .expect("call succeeds");

        assert!(!had_paging);
    }

    #[test]
    fn undeclared_target_is_passed_through() {
        let interceptor = PagingInterceptor::new();
        let target = Arc::new(CallTarget::builder("svc::plain").build());

        let value = interceptor
            .intercept(call(&target, vec![], |_| Ok(7)))
            .expect("call succeeds");

        assert_eq!(value, 7);
        let ops = interceptor.resolve(&target).expect("cached");
        assert_eq!(ops.strategy(), &ResolvedStrategy::NoPaging);
    }

    #[test]
    fn configuration_errors_surface_before_the_call() {
        let interceptor = PagingInterceptor::new();
        let target = Arc::new(
            CallTarget::builder("svc::broken")
                .named_param("id", ParamType::Int)
                .declare(PagingDeclaration::builder().build().expect("valid"))
                .build(),
        );
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let error = interceptor
                .intercept(call(&target, vec![Value::Int(1)], |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .expect_err("declaration is unsatisfiable");
            match error {
                PagingError::Config(e) => assert_eq!(e.kind(), &ConfigErrorKind::NoPagingSource),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(interceptor.cache_stats().resolutions, 1);
    }

    #[test]
    fn never_condition_publishes_without_hooks() {
        let interceptor = PagingInterceptor::builder()
            .hooks(Recording::default())
            .build();
        let target = carrier_target(PagingDeclaration::manual().build().expect("valid"));

        let seen = interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| {
                published()
            }))
            .expect("call succeeds");

        assert_eq!(seen.page_size(), 10);
        assert_eq!(interceptor.hooks().started.load(Ordering::SeqCst), 0);
        assert!(interceptor.hooks().cleared.lock().expect("not poisoned").is_empty());
    }

    #[test]
    fn active_hooks_run_around_the_call() {
        let interceptor = PagingInterceptor::builder()
            .hooks(Recording::default())
            .build();
        let target = carrier_target(PagingDeclaration::builder().build().expect("valid"));

        let seen = interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| {
                published()
            }))
            .expect("clear_page failure is swallowed");

        assert_eq!(seen.page_size(), 99);
        assert_eq!(interceptor.hooks().started.load(Ordering::SeqCst), 1);
        assert_eq!(
            *interceptor.hooks().cleared.lock().expect("not poisoned"),
            vec![(99, true)]
        );
    }

    #[test]
    fn wrapped_failure_passes_through_unchanged() {
        let interceptor = PagingInterceptor::builder()
            .hooks(Recording::default())
            .build();
        let target = carrier_target(PagingDeclaration::builder().build().expect("valid"));
        let failure = PagingError::Hook(HookError::new("database down"));

        let error = interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| {
                Err::<(), _>(PagingError::Hook(HookError::new("database down")))
            }))
            .expect_err("wrapped call fails");

        assert_eq!(error, failure);
        assert!(!context::has_current_paging());
        assert_eq!(
            *interceptor.hooks().cleared.lock().expect("not poisoned"),
            vec![(99, false)]
        );
    }

    #[test]
    fn condition_gates_hooks() {
        let interceptor = PagingInterceptor::builder()
            .hooks(Recording::default())
            .build();
        let declaration = PagingDeclaration::builder()
            .condition("#page.page_num == null")
            .build()
            .expect("valid");
        let target = carrier_target(declaration);

        interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| Ok(())))
            .expect("call succeeds");
        interceptor
            .intercept(call(
                &target,
                vec![Value::object(PageRequest::new().with_page_num(2))],
                |_| Ok(()),
            ))
            .expect("call succeeds");

        assert_eq!(interceptor.hooks().started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn condition_failure_aborts_and_clears() {
        let interceptor = PagingInterceptor::new();
        let declaration = PagingDeclaration::builder()
            .condition("#nope == null")
            .build()
            .expect("valid");
        let target = carrier_target(declaration);
        let calls = AtomicUsize::new(0);

        let error = interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .expect_err("unknown parameter");

        assert!(matches!(error, PagingError::Condition(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!context::has_current_paging());
    }

    #[test]
    fn start_page_failure_aborts_and_clears() {
        struct Refuse;

        impl PagingHooks for Refuse {
            fn start_page(
                &self,
                _paging: &mut Paging,
                _target: &CallTarget,
                _args: &[Value],
            ) -> Result<(), HookError> {
                Err(HookError::new("no connection"))
            }
        }

        let interceptor = PagingInterceptor::builder().hooks(Refuse).build();
        let target = carrier_target(PagingDeclaration::builder().build().expect("valid"));

        let error = interceptor
            .intercept(call(&target, vec![Value::object(PageRequest::new())], |_| Ok(())))
            .expect_err("hook refuses");

        assert_eq!(error, PagingError::Hook(HookError::new("no connection")));
        assert!(!context::has_current_paging());
    }

    #[test]
    fn whitelist_violation_is_a_hard_error() {
        let interceptor = PagingInterceptor::new();
        let declaration = PagingDeclaration::builder()
            .default_sort("id:desc")
            .sort_whitelist(["id", "name"])
            .build()
            .expect("valid");
        let target = carrier_target(declaration);
        let args = vec![Value::object(PageRequest::new().with_sort("name:asc, age:desc"))];

        let error = interceptor
            .intercept(call(&target, args, |_| Ok(())))
            .expect_err("age is not whitelisted");

        assert_eq!(
            error,
            PagingError::Sort(SortError::new(SortErrorKind::PropertyNotAllowed {
                property: "age".to_string()
            }))
        );
    }

    #[test]
    fn sort_validation_can_be_disabled() {
        let interceptor = PagingInterceptor::builder().sort_validation(false).build();
        let target = carrier_target(
            PagingDeclaration::builder()
                .sort_whitelist(["id"])
                .build()
                .expect("valid"),
        );
        let args = vec![Value::object(PageRequest::new().with_sort("free text"))];

        let seen = interceptor
            .intercept(call(&target, args, |_| published()))
            .expect("no validation");

        assert_eq!(seen.sort(), "free text");
        assert!(!interceptor.resolve(&target).expect("cached").validates_sort());
    }

    #[test]
    fn outcome_downcasts() {
        let value = 5u32;
        let returned = Outcome::Returned(&value);
        assert_eq!(returned.returned::<u32>(), Some(&5));
        assert_eq!(returned.returned::<i64>(), None);
        assert_eq!(returned.failed::<u32>(), None);
    }
}
