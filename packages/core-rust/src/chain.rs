//! Chain executor: drives an ordered interceptor list towards a target.
//!
//! Control only moves forward through explicit continuation calls:
//!
//! 1. `proceed` dispatches interceptor #0.
//! 2. An interceptor calls [`Chain::next`] to dispatch #k+1, or, from the last
//!    position, to invoke the target.
//! 3. An interceptor that returns [`Flow::Halt`] without calling `next`
//!    short-circuits the run; the target never fires.
//!
//! Each interceptor frame may consume its continuation once. A second call,
//! or any call after the run reached a terminal state, is an
//! [`IntegrityError`] and never re-invokes the target.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::boundary::classify;
use crate::error::{ChainError, IntegrityError};
use crate::interceptor::Interceptor;
use crate::target::Target;

type BoxedTarget<'a, C, R> = Box<dyn FnOnce(C) -> Result<R, ChainError> + 'a>;

// ---------------------------------------------------------------------------
// State and flow types
// ---------------------------------------------------------------------------

/// Lifecycle of a single chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotStarted,
    Running,
    /// The target fired.
    Completed,
    /// An interceptor halted before the target fired.
    ShortCircuited,
}

impl ChainState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::ShortCircuited)
    }
}

/// Proof that a frame consumed its continuation. Only [`Chain::next`] creates one.
#[derive(Debug)]
#[must_use]
pub struct Proceeded(());

/// What an interceptor did with its turn.
#[derive(Debug)]
#[must_use]
pub enum Flow<R> {
    /// The interceptor called `next` and everything downstream has run.
    Proceeded(Proceeded),
    /// Stop here. A `Some` value is stored in the result slot; when returned
    /// after `next` it replaces the downstream result.
    Halt(Option<R>),
}

impl<R> Flow<R> {
    /// Halt without a value.
    pub fn halt() -> Self {
        Self::Halt(None)
    }

    /// Halt and answer with `value`.
    pub fn respond(value: R) -> Self {
        Self::Halt(Some(value))
    }
}

impl<R> From<Proceeded> for Flow<R> {
    fn from(token: Proceeded) -> Self {
        Self::Proceeded(token)
    }
}

/// Result of a successful chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome<R> {
    pub state: ChainState,
    pub result: Option<R>,
}

impl<R> ChainOutcome<R> {
    #[must_use]
    pub fn target_invoked(&self) -> bool {
        self.state == ChainState::Completed
    }

    pub fn into_result(self) -> Option<R> {
        self.result
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Control handle passed to every interceptor of one run.
pub struct Chain<'a, C, R> {
    interceptors: &'a [Arc<dyn Interceptor<C, R>>],
    /// Highest position dispatched so far. Only moves forward.
    cursor: Option<usize>,
    /// Position of the interceptor whose `apply` is on top of the stack.
    frame: Option<usize>,
    target: Option<BoxedTarget<'a, C, R>>,
    state: ChainState,
    result: Option<R>,
    violation: Option<IntegrityError>,
}

impl<'a, C, R> Chain<'a, C, R> {
    fn new<T>(interceptors: &'a [Arc<dyn Interceptor<C, R>>], target: T) -> Self
    where
        T: Target<C, R> + 'a,
    {
        Self {
            interceptors,
            cursor: None,
            frame: None,
            target: Some(Box::new(move |ctx: C| target.invoke(ctx))),
            state: ChainState::NotStarted,
            result: None,
            violation: None,
        }
    }

    /// Hand `ctx` downstream: dispatch the next interceptor, or fire the
    /// target when called from the last position.
    ///
    /// Failures raised downstream are classified before they reach the caller.
    ///
    /// # Errors
    ///
    /// - `IntegrityError` when the run is already terminal or this frame has
    ///   already continued.
    /// - Any (classified) failure from downstream interceptors or the target.
    pub fn next(&mut self, ctx: C) -> Result<Proceeded, ChainError> {
        if let Some(violation) = &self.violation {
            return Err(violation.clone().into());
        }
        if self.state.is_terminal() {
            return Err(self.violate(IntegrityError::ContinuationAfterTerminal {
                state: self.state,
            }));
        }
        let Some(position) = self.frame else {
            return Err(self.violate(IntegrityError::ContinuationAfterTerminal {
                state: self.state,
            }));
        };
        if self.cursor.is_some_and(|cursor| cursor > position) {
            return Err(self.violate(IntegrityError::ContinuationReused { position }));
        }

        let downstream = if position + 1 < self.interceptors.len() {
            self.dispatch(position + 1, ctx)
        } else {
            self.fire_target(ctx)
        };

        match downstream {
            Ok(()) => Ok(Proceeded(())),
            Err(err) => Err(classify(err)),
        }
    }

    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Position of the most recently dispatched interceptor.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    #[must_use]
    pub fn target_invoked(&self) -> bool {
        self.target.is_none()
    }

    /// Current content of the result slot.
    #[must_use]
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    /// Mutable access to the result slot, for after-logic that rewrites responses.
    pub fn result_mut(&mut self) -> Option<&mut R> {
        self.result.as_mut()
    }

    fn run(mut self, ctx: C) -> Result<ChainOutcome<R>, ChainError> {
        self.state = ChainState::Running;

        if self.interceptors.is_empty() {
            self.fire_target(ctx)?;
            return Ok(self.finish());
        }

        let outcome = self.dispatch(0, ctx);
        if let Some(violation) = self.violation.take() {
            return Err(violation.into());
        }
        outcome?;
        Ok(self.finish())
    }

    fn finish(mut self) -> ChainOutcome<R> {
        if !self.state.is_terminal() {
            self.state = ChainState::ShortCircuited;
        }
        ChainOutcome {
            state: self.state,
            result: self.result,
        }
    }

    fn dispatch(&mut self, position: usize, ctx: C) -> Result<(), ChainError> {
        let interceptors = self.interceptors;
        let interceptor = &interceptors[position];
        self.cursor = Some(position);
        debug!(position, interceptor = interceptor.name(), "dispatching interceptor");

        let caller = self.frame.replace(position);
        let flow = interceptor.apply(ctx, self);
        self.frame = caller;

        if let Flow::Halt(value) = flow? {
            if value.is_some() {
                self.result = value;
            }
            if !self.target_invoked() {
                debug!(position, interceptor = interceptor.name(), "chain short-circuited");
                self.state = ChainState::ShortCircuited;
            }
        }
        Ok(())
    }

    fn fire_target(&mut self, ctx: C) -> Result<(), ChainError> {
        let Some(target) = self.target.take() else {
            return Err(self.violate(IntegrityError::TargetAlreadyInvoked));
        };
        self.state = ChainState::Completed;
        debug!(interceptors = self.interceptors.len(), "invoking target");
        self.result = Some(target(ctx)?);
        Ok(())
    }

    fn violate(&mut self, violation: IntegrityError) -> ChainError {
        warn!(error = %violation, "interceptor chain misuse");
        if self.violation.is_none() {
            self.violation = Some(violation.clone());
        }
        violation.into()
    }
}

impl<C, R> std::fmt::Debug for Chain<'_, C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.interceptors.len())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("target_invoked", &self.target_invoked())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run `interceptors` in order around `target`.
///
/// With an empty list the target fires immediately with `ctx`, and its
/// failure is returned unchanged. Failures of interceptor #0 are returned
/// unclassified; use [`execute`] for the fully classified form.
///
/// # Errors
///
/// Any failure raised during the run, or an `IntegrityError` on chain misuse.
pub fn proceed<'a, C, R, T>(
    interceptors: &'a [Arc<dyn Interceptor<C, R>>],
    ctx: C,
    target: T,
) -> Result<ChainOutcome<R>, ChainError>
where
    T: Target<C, R> + 'a,
{
    Chain::new(interceptors, target).run(ctx)
}

/// [`proceed`] wrapped in the outer error boundary: only `Domain` or
/// `Integrity` failures escape.
///
/// # Errors
///
/// A classified [`ChainError`].
pub fn execute<'a, C, R, T>(
    interceptors: &'a [Arc<dyn Interceptor<C, R>>],
    ctx: C,
    target: T,
) -> Result<ChainOutcome<R>, ChainError>
where
    T: Target<C, R> + 'a,
{
    proceed(interceptors, ctx, target).map_err(classify)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::*;
    use crate::boundary::UNEXPECTED_FAILURE_MESSAGE;
    use crate::context::RequestContext;
    use crate::error::DomainError;
    use crate::target::TargetInvocation;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records before/after entries around its continuation.
    struct Recorder {
        label: &'static str,
        log: Log,
    }

    impl Interceptor for Recorder {
        fn apply(
            &self,
            ctx: RequestContext,
            chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            self.log.lock().push(format!("{}-before", self.label));
            let proceeded = chain.next(ctx)?;
            self.log.lock().push(format!("{}-after", self.label));
            Ok(proceeded.into())
        }
    }

    /// Never continues; optionally answers with a value.
    struct Gate {
        log: Log,
        answer: Option<Value>,
    }

    impl Interceptor for Gate {
        fn apply(
            &self,
            _ctx: RequestContext,
            _chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            self.log.lock().push("gate".to_string());
            Ok(Flow::Halt(self.answer.clone()))
        }
    }

    /// Fails with the configured error without continuing.
    struct Failing {
        domain: bool,
    }

    impl Interceptor for Failing {
        fn apply(
            &self,
            _ctx: RequestContext,
            _chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            if self.domain {
                Err(DomainError::new("unauthenticated").into())
            } else {
                Err(anyhow::anyhow!("socket closed").into())
            }
        }
    }

    /// Calls `next` twice, keeping the second outcome in `second`.
    struct Twice {
        second: Arc<Mutex<Option<ChainError>>>,
    }

    impl Interceptor for Twice {
        fn apply(
            &self,
            ctx: RequestContext,
            chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            let proceeded = chain.next(ctx.clone())?;
            if let Err(err) = chain.next(ctx) {
                *self.second.lock() = Some(err);
            }
            Ok(proceeded.into())
        }
    }

    /// Replaces the context with a fresh one before continuing.
    struct Replace;

    impl Interceptor for Replace {
        fn apply(
            &self,
            ctx: RequestContext,
            chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            let mut replacement = RequestContext::new(ctx.handler);
            replacement.trace_id = "replaced".to_string();
            replacement.put("stamp", json!("replace"));
            Ok(chain.next(replacement)?.into())
        }
    }

    /// Captures the context it receives, then continues.
    struct Observe {
        seen: Arc<Mutex<Option<RequestContext>>>,
    }

    impl Interceptor for Observe {
        fn apply(
            &self,
            ctx: RequestContext,
            chain: &mut Chain<'_, RequestContext, Value>,
        ) -> Result<Flow<Value>, ChainError> {
            *self.seen.lock() = Some(ctx.clone());
            Ok(chain.next(ctx)?.into())
        }
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorder(label: &'static str, log: &Log) -> Arc<dyn Interceptor> {
        Arc::new(Recorder {
            label,
            log: log.clone(),
        })
    }

    /// Target that logs and counts its invocations.
    fn counting_target(
        log: &Log,
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce(RequestContext) -> Result<Value, ChainError> {
        let log = log.clone();
        let calls = calls.clone();
        move |ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            log.lock().push("target".to_string());
            Ok(json!({ "handler": ctx.handler }))
        }
    }

    #[test]
    fn empty_chain_invokes_target_once() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = execute(&[], RequestContext::new("users"), counting_target(&log, &calls)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.state, ChainState::Completed);
        assert_eq!(outcome.result, Some(json!({ "handler": "users" })));
    }

    #[test]
    fn empty_chain_propagates_target_failure_unchanged() {
        let target = |_ctx: RequestContext| -> Result<Value, ChainError> {
            Err(anyhow::anyhow!("raw").into())
        };
        let err = proceed(&[], RequestContext::default(), target).unwrap_err();
        assert!(matches!(err, ChainError::Unexpected(e) if e.to_string() == "raw"));
    }

    #[test]
    fn interceptors_nest_around_target() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = vec![recorder("a", &log), recorder("b", &log)];

        let outcome = execute(&chain, RequestContext::new("users"), counting_target(&log, &calls)).unwrap();

        assert!(outcome.target_invoked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock(),
            vec!["a-before", "b-before", "target", "b-after", "a-after"]
        );
    }

    #[test]
    fn halting_interceptor_skips_target() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> = vec![
            recorder("a", &log),
            Arc::new(Gate {
                log: log.clone(),
                answer: None,
            }),
            recorder("c", &log),
        ];

        let outcome = execute(&chain, RequestContext::new("users"), counting_target(&log, &calls)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.state, ChainState::ShortCircuited);
        assert!(outcome.result.is_none());
        assert_eq!(*log.lock(), vec!["a-before", "gate", "a-after"]);
    }

    #[test]
    fn halting_interceptor_answers_with_its_value() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Gate {
            log: log.clone(),
            answer: Some(json!("cached")),
        })];

        let outcome = execute(&chain, RequestContext::new("users"), counting_target(&log, &calls)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.into_result(), Some(json!("cached")));
    }

    #[test]
    fn domain_error_stops_chain_unchanged() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> = vec![
            recorder("log", &log),
            Arc::new(Failing { domain: true }),
            recorder("never", &log),
        ];

        let err = execute(&chain, RequestContext::new("users"), counting_target(&log, &calls)).unwrap_err();

        let domain = err.as_domain().unwrap();
        assert_eq!(domain.message(), "unauthenticated");
        assert!(domain.cause().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock(), vec!["log-before"]);
    }

    #[test]
    fn unexpected_failure_is_wrapped_at_inner_boundary() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> =
            vec![recorder("a", &log), Arc::new(Failing { domain: false })];

        let err = proceed(&chain, RequestContext::default(), counting_target(&log, &calls)).unwrap_err();

        let domain = err.as_domain().unwrap();
        assert_eq!(domain.message(), UNEXPECTED_FAILURE_MESSAGE);
        assert_eq!(domain.cause().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn unexpected_failure_is_wrapped_at_outer_boundary() {
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Failing { domain: false })];

        let raw = proceed(&chain, RequestContext::default(), |_ctx: RequestContext| Ok(Value::Null))
            .unwrap_err();
        assert!(matches!(raw, ChainError::Unexpected(_)));

        let err = execute(&chain, RequestContext::default(), |_ctx: RequestContext| Ok(Value::Null))
            .unwrap_err();
        let domain = err.as_domain().unwrap();
        assert_eq!(domain.message(), UNEXPECTED_FAILURE_MESSAGE);
        assert_eq!(domain.cause().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn target_failure_is_classified_inside_next() {
        let log = log();
        let chain = vec![recorder("a", &log)];
        let err = proceed(&chain, RequestContext::default(), |_ctx: RequestContext| {
            Err::<Value, ChainError>(anyhow::anyhow!("timeout").into())
        })
        .unwrap_err();

        assert_eq!(err.as_domain().unwrap().message(), UNEXPECTED_FAILURE_MESSAGE);
        assert_eq!(*log.lock(), vec!["a-before"]);
    }

    #[test]
    fn replaced_context_reaches_downstream_and_target() {
        let seen = Arc::new(Mutex::new(None));
        let chain: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(Replace),
            Arc::new(Observe { seen: seen.clone() }),
        ];

        let mut original = RequestContext::new("users");
        original.trace_id = "original".to_string();

        let outcome = execute(&chain, original, |ctx: RequestContext| {
            Ok(json!({ "trace": ctx.trace_id, "stamp": ctx.get("stamp").cloned() }))
        })
        .unwrap();

        let observed = seen.lock().clone().unwrap();
        assert_eq!(observed.trace_id, "replaced");
        assert_eq!(
            outcome.result,
            Some(json!({ "trace": "replaced", "stamp": "replace" }))
        );
    }

    #[test]
    fn second_continuation_after_completion_is_rejected() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(Mutex::new(None));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Twice {
            second: second.clone(),
        })];

        let outcome = proceed(&chain, RequestContext::default(), counting_target(&log, &calls));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let swallowed = second.lock().take().unwrap();
        assert!(matches!(
            swallowed,
            ChainError::Integrity(IntegrityError::ContinuationAfterTerminal {
                state: ChainState::Completed
            })
        ));
        // Swallowing the violation does not rescue the run.
        assert!(outcome.unwrap_err().is_integrity());
    }

    #[test]
    fn retrying_a_failed_continuation_is_rejected() {
        struct RetryOnError;

        impl Interceptor for RetryOnError {
            fn apply(
                &self,
                ctx: RequestContext,
                chain: &mut Chain<'_, RequestContext, Value>,
            ) -> Result<Flow<Value>, ChainError> {
                match chain.next(ctx.clone()) {
                    Ok(proceeded) => Ok(proceeded.into()),
                    Err(_) => Ok(chain.next(ctx)?.into()),
                }
            }
        }

        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(RetryOnError), Arc::new(Failing { domain: true })];

        let err = execute(&chain, RequestContext::default(), counting_target(&log, &calls)).unwrap_err();

        assert!(matches!(
            err,
            ChainError::Integrity(IntegrityError::ContinuationReused { position: 0 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn continuation_after_downstream_halt_is_rejected() {
        struct RetryAfterHalt;

        impl Interceptor for RetryAfterHalt {
            fn apply(
                &self,
                ctx: RequestContext,
                chain: &mut Chain<'_, RequestContext, Value>,
            ) -> Result<Flow<Value>, ChainError> {
                let proceeded = chain.next(ctx.clone())?;
                assert_eq!(chain.state(), ChainState::ShortCircuited);
                chain.next(ctx)?;
                Ok(proceeded.into())
            }
        }

        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(RetryAfterHalt),
            Arc::new(Gate {
                log: log.clone(),
                answer: None,
            }),
        ];

        let err = execute(&chain, RequestContext::default(), counting_target(&log, &calls)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Integrity(IntegrityError::ContinuationAfterTerminal {
                state: ChainState::ShortCircuited
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn after_logic_can_rewrite_result() {
        struct Envelope;

        impl Interceptor for Envelope {
            fn apply(
                &self,
                ctx: RequestContext,
                chain: &mut Chain<'_, RequestContext, Value>,
            ) -> Result<Flow<Value>, ChainError> {
                let proceeded = chain.next(ctx)?;
                if let Some(result) = chain.result_mut() {
                    *result = json!({ "data": result.take() });
                }
                Ok(proceeded.into())
            }
        }

        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Envelope)];
        let outcome = execute(&chain, RequestContext::default(), |_ctx: RequestContext| Ok(json!(7))).unwrap();
        assert_eq!(outcome.result, Some(json!({ "data": 7 })));
        assert_eq!(outcome.state, ChainState::Completed);
    }

    #[test]
    fn after_logic_reads_downstream_result() {
        struct Audit {
            seen: Arc<Mutex<Vec<Option<Value>>>>,
        }

        impl Interceptor for Audit {
            fn apply(
                &self,
                ctx: RequestContext,
                chain: &mut Chain<'_, RequestContext, Value>,
            ) -> Result<Flow<Value>, ChainError> {
                self.seen.lock().push(chain.result().cloned());
                let proceeded = chain.next(ctx)?;
                self.seen.lock().push(chain.result().cloned());
                Ok(proceeded.into())
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Audit { seen: seen.clone() })];
        let outcome = execute(&chain, RequestContext::default(), |_ctx: RequestContext| Ok(json!("done"))).unwrap();

        assert_eq!(*seen.lock(), vec![None, Some(json!("done"))]);
        assert_eq!(outcome.result, Some(json!("done")));
    }

    #[test]
    fn log_and_auth_example() {
        let log = log();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain: Vec<Arc<dyn Interceptor>> =
            vec![recorder("log", &log), Arc::new(Failing { domain: true })];

        let err = execute(&chain, RequestContext::new("me"), counting_target(&log, &calls)).unwrap_err();

        assert_eq!(err.as_domain().unwrap().message(), "unauthenticated");
        assert!(!log.lock().contains(&"log-after".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn target_invocation_receives_latest_context() {
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Replace)];
        let invocation = TargetInvocation::new(json!({ "limit": 10 }), |args: Value, ctx: RequestContext| {
            Ok(json!({ "args": args, "trace": ctx.trace_id }))
        });

        let outcome = execute(&chain, RequestContext::new("list"), invocation).unwrap();
        assert_eq!(
            outcome.result,
            Some(json!({ "args": { "limit": 10 }, "trace": "replaced" }))
        );
    }

    #[test]
    fn chain_is_generic_over_context_and_result() {
        struct Double;

        impl Interceptor<u64, u64> for Double {
            fn apply(&self, ctx: u64, chain: &mut Chain<'_, u64, u64>) -> Result<Flow<u64>, ChainError> {
                Ok(chain.next(ctx * 2)?.into())
            }
        }

        let chain: Vec<Arc<dyn Interceptor<u64, u64>>> = vec![Arc::new(Double), Arc::new(Double)];
        let outcome = execute(&chain, 3, |n: u64| Ok(n + 1)).unwrap();
        assert_eq!(outcome.result, Some(13));
    }

    proptest! {
        #[test]
        fn every_continuing_chain_fires_target_once(len in 0_usize..12) {
            let log = log();
            let calls = Arc::new(AtomicUsize::new(0));
            let labels = ["i0", "i1", "i2", "i3", "i4", "i5", "i6", "i7", "i8", "i9", "i10", "i11"];
            let chain: Vec<Arc<dyn Interceptor>> =
                labels.iter().take(len).map(|label| recorder(*label, &log)).collect();

            let outcome = execute(&chain, RequestContext::default(), counting_target(&log, &calls)).unwrap();

            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_eq!(outcome.state, ChainState::Completed);

            let mut expected: Vec<String> =
                labels.iter().take(len).map(|l| format!("{l}-before")).collect();
            expected.push("target".to_string());
            expected.extend(labels.iter().take(len).rev().map(|l| format!("{l}-after")));
            prop_assert_eq!(log.lock().clone(), expected);
        }

        #[test]
        fn halting_anywhere_never_fires_target(len in 1_usize..10, halt_at in 0_usize..10) {
            let halt_at = halt_at % len;
            let log = log();
            let calls = Arc::new(AtomicUsize::new(0));
            let chain: Vec<Arc<dyn Interceptor>> = (0..len)
                .map(|i| {
                    if i == halt_at {
                        Arc::new(Gate { log: log.clone(), answer: None }) as Arc<dyn Interceptor>
                    } else {
                        recorder("r", &log)
                    }
                })
                .collect();

            let outcome = execute(&chain, RequestContext::default(), counting_target(&log, &calls)).unwrap();

            prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
            prop_assert_eq!(outcome.state, ChainState::ShortCircuited);
            prop_assert_eq!(log.lock().iter().filter(|e| e.as_str() == "r-before").count(), halt_at);
        }
    }
}
