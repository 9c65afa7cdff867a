// File: src/transport/unwinding.rs
//
// Stack-unwinding transport.
// Raising a signal panics with a private transportable packet; every
// scope boundary is a `catch_unwind` handler that feeds the caught
// signal through the shared resolution step and re-raises on forward.
// Panics that are not signal packets belong to the host program and are
// resumed untouched.

use std::panic::{self, AssertUnwindSafe};

use crate::errors;
use crate::scope::{Flow, LoopFlow, Outcome, Scope};
use crate::signal::{DynError, Signal};
use crate::transport::{resolve, FrameRole, Resolution};
use crate::Label;

/// The unwind payload wrapping an in-flight signal.
///
/// Private to the transport: the only code that can construct or unpack
/// one is `raise` and the boundary handlers, so a signal cannot be
/// intercepted or duplicated in transit.
struct SignalPacket<R> {
    signal: Signal<R>,
}

/// Deliver a signal to the nearest enclosing scope boundary. Never
/// returns to the raising call site.
pub(crate) fn raise<R: Send + 'static>(signal: Signal<R>) -> ! {
    tracing::trace!(kind = %signal.kind(), "raising signal via unwinding transport");
    panic::panic_any(SignalPacket { signal })
}

/// Run `body`, separating our signal packets from foreign panics.
/// Foreign panics resume unwinding immediately.
fn catch_signal<R, T, F>(body: F) -> Result<T, Signal<R>>
where
    R: Send + 'static,
    F: FnOnce() -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<SignalPacket<R>>() {
            Ok(packet) => Err(packet.signal),
            Err(foreign) => panic::resume_unwind(foreign),
        },
    }
}

/// Guard a plain sub-scope. Signals raised inside `body` are inspected
/// here once and re-raised toward the parent handler.
pub(crate) fn enter_scope<R, F>(body: F) -> Flow
where
    R: Send + 'static,
    F: FnOnce(&Scope<'_, R>) -> Flow,
{
    let scope = Scope::unwinding();
    match catch_signal(|| body(&scope)) {
        Ok(Flow::Normal) => Flow::Normal,
        Ok(Flow::Raised(_)) => {
            errors::invariant("scope boundary saw a raised token with no signal in flight")
        }
        Err(signal) => match resolve::<R>(FrameRole::Plain, signal) {
            Resolution::Forward(forwarded) => raise(forwarded),
            _ => errors::invariant("plain frame produced a consuming resolution"),
        },
    }
}

/// Guard a labeled loop. Each iteration runs under its own handler;
/// a matching `Continue` resumes the next iteration, a matching `Break`
/// leaves the loop, everything else re-raises toward the parent.
pub(crate) fn enter_loop_scope<R, F>(label: Label, mut body: F) -> Flow
where
    R: Send + 'static,
    F: FnMut(&Scope<'_, R>) -> LoopFlow,
{
    let scope = Scope::unwinding();
    loop {
        match catch_signal(|| body(&scope)) {
            Ok(LoopFlow::Next) => continue,
            Ok(LoopFlow::Exit) => return Flow::Normal,
            Ok(LoopFlow::Raised(_)) => {
                errors::invariant("loop boundary saw a raised token with no signal in flight")
            }
            Err(signal) => match resolve::<R>(FrameRole::LoopResolve(label), signal) {
                Resolution::NextIteration => continue,
                Resolution::ExitLoop => return Flow::Normal,
                Resolution::Forward(forwarded) => raise(forwarded),
                _ => errors::invariant("loop frame produced a function-boundary resolution"),
            },
        }
    }
}

/// Install the function's outermost frame and run `body` under it.
pub(crate) fn run_function<R, F>(body: F) -> Result<R, DynError>
where
    R: Send + 'static,
    F: FnOnce(&Scope<'_, R>) -> Outcome<R>,
{
    let scope = Scope::unwinding();
    match catch_signal(|| body(&scope)) {
        Ok(Outcome::Yield(value)) => Ok(value),
        Ok(Outcome::Raised(_)) => {
            errors::invariant("function boundary saw a raised token with no signal in flight")
        }
        Err(signal) => match resolve(FrameRole::Outermost, signal) {
            Resolution::Complete(value) => Ok(value),
            Resolution::Surface(error) => Err(error),
            _ => errors::invariant("outermost frame produced a loop resolution"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    #[test]
    fn test_raise_is_caught_as_a_signal() {
        let caught = catch_signal::<i64, (), _>(|| {
            raise::<i64>(Signal::Return(5));
        });
        match caught {
            Err(Signal::Return(v)) => assert_eq!(v, 5),
            other => panic!("expected a caught return signal, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_panics_pass_through_catch_signal() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = catch_signal::<i64, (), _>(|| panic!("host panic"));
        }));
        let payload = result.unwrap_err();
        let message = payload.downcast_ref::<&str>().expect("original payload");
        assert_eq!(*message, "host panic");
    }
}
