// File: src/scope.rs
//
// Public surface of the propagation engine: the Scope handle passed to
// guarded bodies, the raise operations, scope-guard installation, and
// the control types (`Flow`, `LoopFlow`, `Outcome`) bodies return so
// the same user code runs under either transport.

use std::marker::PhantomData;

use crate::config::Backend;
use crate::label::Label;
use crate::signal::{DynError, Signal};
use crate::transport::chaining::{self, Chain, FrameId};
use crate::transport::unwinding;

/// Proof that a signal is in flight toward an ancestor scope.
///
/// The only way to obtain one is to raise; the only correct thing to do
/// with one is return it (via `.into()` or [`propagate!`]) so it reaches
/// the enclosing scope boundary. Under the unwinding transport no token
/// is ever actually constructed, because raising does not return.
#[must_use = "a raised signal must be returned to the enclosing scope boundary"]
#[derive(Debug)]
pub struct Raised {
    _private: (),
}

impl Raised {
    pub(crate) fn new() -> Self {
        Raised { _private: () }
    }
}

/// How a guarded sub-scope body ended.
#[must_use = "a scope's flow must be propagated or observed"]
#[derive(Debug)]
pub enum Flow {
    /// The body ran to completion.
    Normal,
    /// A signal is in flight; the receiving body must return this.
    Raised(Raised),
}

/// How one loop iteration ended.
#[must_use = "a loop iteration's flow must be returned to the loop driver"]
#[derive(Debug)]
pub enum LoopFlow {
    /// Run the next iteration.
    Next,
    /// Leave the loop normally.
    Exit,
    /// A signal is in flight; the loop boundary resolves it.
    Raised(Raised),
}

/// How a function body ended: ordinary fall-off-the-end completion with
/// a value, or with a signal in flight toward the function boundary.
#[must_use = "a function body's outcome must be returned to the function boundary"]
#[derive(Debug)]
pub enum Outcome<R> {
    /// Normal completion ("yield" in the propagation protocol).
    Yield(R),
    /// A signal is in flight; the function boundary resolves it.
    Raised(Raised),
}

impl Flow {
    /// Adapt a completed sub-flow to the end of a loop iteration:
    /// normal completion runs the next iteration, a raised signal goes
    /// to the loop boundary.
    pub fn then_next(self) -> LoopFlow {
        match self {
            Flow::Normal => LoopFlow::Next,
            Flow::Raised(token) => LoopFlow::Raised(token),
        }
    }
}

impl From<Raised> for Flow {
    fn from(token: Raised) -> Self {
        Flow::Raised(token)
    }
}

impl From<Raised> for LoopFlow {
    fn from(token: Raised) -> Self {
        LoopFlow::Raised(token)
    }
}

impl<R> From<Raised> for Outcome<R> {
    fn from(token: Raised) -> Self {
        Outcome::Raised(token)
    }
}

/// Return a raised token from the enclosing body, or fall through on
/// normal flow. Lets identical guarded code run under both transports:
/// under unwinding the raised arm is simply never taken.
#[macro_export]
macro_rules! propagate {
    ($flow:expr) => {
        match $flow {
            $crate::Flow::Normal => {}
            $crate::Flow::Raised(token) => return token.into(),
        }
    };
}

/// Handle to the innermost frame context of a guarded scope.
///
/// Bodies receive a `&Scope` and use it to raise signals or install
/// nested scope guards. A `Scope` never outlives its guarded region and
/// is tied to one call stack; it is neither `Send` nor cloneable.
pub struct Scope<'c, R: 'static> {
    inner: ScopeInner<'c, R>,
}

enum ScopeInner<'c, R: 'static> {
    Unwinding(PhantomData<&'c R>),
    Chaining { chain: &'c Chain<R>, frame: FrameId },
}

impl<'c, R: 'static> Scope<'c, R> {
    pub(crate) fn unwinding() -> Self {
        Scope {
            inner: ScopeInner::Unwinding(PhantomData),
        }
    }

    pub(crate) fn chaining(chain: &'c Chain<R>, frame: FrameId) -> Scope<'c, R> {
        Scope {
            inner: ScopeInner::Chaining { chain, frame },
        }
    }
}

impl<'c, R: Send + 'static> Scope<'c, R> {
    fn raise(&self, signal: Signal<R>) -> Raised {
        match &self.inner {
            ScopeInner::Unwinding(_) => unwinding::raise(signal),
            ScopeInner::Chaining { chain, frame } => chaining::raise(chain, *frame, signal),
        }
    }

    /// Return `value` from the enclosing function. The signal forwards
    /// through every intermediate scope and is consumed exactly once at
    /// the function's outermost frame.
    pub fn raise_return(&self, value: R) -> Raised {
        self.raise(Signal::Return(value))
    }

    /// Surface an application error to the function's caller. The boxed
    /// error crosses the engine unchanged.
    pub fn raise_exception(&self, error: impl Into<DynError>) -> Raised {
        self.raise(Signal::Exception(error.into()))
    }

    /// Resume the next iteration of the enclosing loop declared with
    /// `label`. Fatal if no such loop exists anywhere up the chain.
    pub fn raise_continue(&self, label: impl Into<Label>) -> Raised {
        self.raise(Signal::Continue(label.into()))
    }

    /// Exit the enclosing loop declared with `label`. Fatal if no such
    /// loop exists anywhere up the chain.
    pub fn raise_break(&self, label: impl Into<Label>) -> Raised {
        self.raise(Signal::Break(label.into()))
    }

    /// Guard a sub-scope. The frame installed here inspects every signal
    /// raised inside `body` exactly once and forwards it unchanged; a
    /// plain scope never consumes labeled signals.
    pub fn enter_scope<F>(&self, body: F) -> Flow
    where
        F: FnOnce(&Scope<'_, R>) -> Flow,
    {
        match &self.inner {
            ScopeInner::Unwinding(_) => unwinding::enter_scope(body),
            ScopeInner::Chaining { chain, frame } => chaining::enter_scope(chain, *frame, body),
        }
    }

    /// Guard a loop declared with `label` and drive its iterations.
    /// `body` runs once per iteration; the loop frame is the only kind
    /// of frame that may consume `Continue`/`Break`, and only under an
    /// equal label.
    pub fn enter_loop_scope<F>(&self, label: impl Into<Label>, body: F) -> Flow
    where
        F: FnMut(&Scope<'_, R>) -> LoopFlow,
    {
        let label = label.into();
        match &self.inner {
            ScopeInner::Unwinding(_) => unwinding::enter_loop_scope(label, body),
            ScopeInner::Chaining { chain, frame } => {
                chaining::enter_loop_scope(chain, *frame, label, body)
            }
        }
    }
}

/// Run `body` under a fresh function boundary using the given transport
/// backend.
///
/// A consumed `Return` and a normal `Yield` both produce `Ok`; an
/// `Exception` reaching the boundary produces `Err` with the original
/// box. A labeled signal reaching the boundary is an unmatched-label
/// fault and terminates the task.
pub fn run_function<R, F>(backend: Backend, body: F) -> Result<R, DynError>
where
    R: Send + 'static,
    F: FnOnce(&Scope<'_, R>) -> Outcome<R>,
{
    tracing::trace!(%backend, "entering function boundary");
    match backend {
        Backend::Unwinding => unwinding::run_function(body),
        Backend::Chaining => chaining::run_function(body),
    }
}

/// [`run_function`] with the configured backend
/// (`NONLOCAL_TRANSPORT`, or the feature-flag default).
pub fn run<R, F>(body: F) -> Result<R, DynError>
where
    R: Send + 'static,
    F: FnOnce(&Scope<'_, R>) -> Outcome<R>,
{
    run_function(Backend::from_env(), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_yield_needs_no_signal() {
        for backend in [Backend::Unwinding, Backend::Chaining] {
            let result = run_function::<i64, _>(backend, |_cx| Outcome::Yield(3));
            assert_eq!(result.unwrap(), 3);
        }
    }

    #[test]
    fn test_raise_return_resolves_at_function_boundary() {
        for backend in [Backend::Unwinding, Backend::Chaining] {
            let result = run_function::<i64, _>(backend, |cx| cx.raise_return(42).into());
            assert_eq!(result.unwrap(), 42);
        }
    }

    #[test]
    fn test_run_uses_the_configured_backend() {
        let result = run::<i64, _>(|cx| {
            let flow = cx.enter_scope(|cx| cx.raise_return(11).into());
            propagate!(flow);
            Outcome::Yield(0)
        });
        assert_eq!(result.unwrap(), 11);
    }
}
