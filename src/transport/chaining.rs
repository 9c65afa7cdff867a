// File: src/transport/chaining.rs
//
// Continuation-chaining transport.
// Used where stack unwinding is unavailable or unwanted: frames are
// explicit records in a per-function arena, addressed by handle, each
// holding a parent handle and a one-signal slot. Raising writes the
// nearest frame's slot and hands back an opaque token; the scope
// boundary that receives the token takes the signal out of its own
// slot, resolves it, and either consumes it or moves it into the parent
// slot and passes the token one level up. Loop frames carry two named
// states: signals from the iteration body arrive in the Relay state and
// are re-delivered to the Resolve state, which alone label-matches.

use std::cell::RefCell;

use crate::errors;
use crate::scope::{Flow, LoopFlow, Outcome, Raised, Scope};
use crate::signal::{DynError, Signal};
use crate::transport::{resolve, FrameRole, Resolution};
use crate::Label;

/// Handle addressing a frame record inside its chain's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameId(usize);

/// The two checkpoints of a loop frame.
///
/// `Relay` captures signals raised anywhere inside the current
/// iteration, including from deeply nested sub-scopes, and re-delivers
/// them; `Resolve` is the loop's own resolution point where label
/// matching happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopState {
    Relay,
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Plain,
    Loop { label: Label, state: LoopState },
}

struct Frame<R> {
    parent: Option<FrameId>,
    kind: FrameKind,
    slot: Option<Signal<R>>,
}

/// One function's frame arena. Frames obey strict stack discipline:
/// the chain belongs to a single logical thread of execution and frames
/// are pushed on scope entry and popped on every exit path.
pub(crate) struct Chain<R> {
    frames: RefCell<Vec<Frame<R>>>,
}

impl<R> Chain<R> {
    fn new() -> Self {
        Chain {
            frames: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, parent: Option<FrameId>, kind: FrameKind) -> FrameId {
        let mut frames = self.frames.borrow_mut();
        let id = FrameId(frames.len());
        frames.push(Frame {
            parent,
            kind,
            slot: None,
        });
        id
    }

    fn pop(&self) {
        self.frames.borrow_mut().pop();
    }

    /// Deliver a signal into a frame's slot. At most one signal may be
    /// in flight per chain; a second delivery is fatal.
    fn deliver(&self, frame: FrameId, signal: Signal<R>) {
        let mut frames = self.frames.borrow_mut();
        if frames[frame.0].slot.is_some() {
            drop(frames);
            errors::invariant("a signal was delivered while another is already in flight");
        }
        frames[frame.0].slot = Some(signal);
    }

    /// Move the in-flight signal out of a frame's slot.
    fn take(&self, frame: FrameId) -> Option<Signal<R>> {
        self.frames.borrow_mut()[frame.0].slot.take()
    }

    fn parent(&self, frame: FrameId) -> Option<FrameId> {
        self.frames.borrow()[frame.0].parent
    }

    fn set_loop_state(&self, frame: FrameId, state: LoopState) {
        let mut frames = self.frames.borrow_mut();
        if let FrameKind::Loop { state: current, .. } = &mut frames[frame.0].kind {
            *current = state;
            return;
        }
        drop(frames);
        errors::invariant("loop state change requested on a plain frame");
    }
}

/// Pops the newest frame when the guarded scope exits, on every path:
/// normal completion, forwarding, and fault unwinds alike.
struct FrameGuard<'c, R> {
    chain: &'c Chain<R>,
}

impl<R> Drop for FrameGuard<'_, R> {
    fn drop(&mut self) {
        self.chain.pop();
    }
}

/// Deliver a signal to the raising scope's own frame and hand back the
/// token the body must return to its boundary.
pub(crate) fn raise<R>(chain: &Chain<R>, frame: FrameId, signal: Signal<R>) -> Raised {
    tracing::trace!(kind = %signal.kind(), "raising signal via chaining transport");
    chain.deliver(frame, signal);
    Raised::new()
}

/// Guard a plain sub-scope: push a frame, run the body, and on a raised
/// token take the signal from our slot, resolve, and move it to the
/// parent slot.
pub(crate) fn enter_scope<R, F>(chain: &Chain<R>, parent: FrameId, body: F) -> Flow
where
    R: 'static,
    F: FnOnce(&Scope<'_, R>) -> Flow,
{
    let frame = chain.push(Some(parent), FrameKind::Plain);
    let _guard = FrameGuard { chain };
    let scope = Scope::chaining(chain, frame);
    match body(&scope) {
        Flow::Normal => Flow::Normal,
        Flow::Raised(token) => {
            let signal = match chain.take(frame) {
                Some(signal) => signal,
                None => errors::invariant("scope boundary fired with no signal set"),
            };
            match resolve(FrameRole::Plain, signal) {
                Resolution::Forward(forwarded) => {
                    let parent = match chain.parent(frame) {
                        Some(parent) => parent,
                        None => errors::invariant("sub-scope frame has no parent link"),
                    };
                    chain.deliver(parent, forwarded);
                    Flow::Raised(token)
                }
                _ => errors::invariant("plain frame produced a consuming resolution"),
            }
        }
    }
}

/// Guard a labeled loop: push a loop frame and drive iterations. A
/// raised token first hits the frame's Relay state, is re-delivered to
/// the Resolve state, and only there label-matched.
pub(crate) fn enter_loop_scope<R, F>(chain: &Chain<R>, parent: FrameId, label: Label, mut body: F) -> Flow
where
    R: 'static,
    F: FnMut(&Scope<'_, R>) -> LoopFlow,
{
    let frame = chain.push(
        Some(parent),
        FrameKind::Loop {
            label,
            state: LoopState::Relay,
        },
    );
    let _guard = FrameGuard { chain };
    let scope = Scope::chaining(chain, frame);
    loop {
        match body(&scope) {
            LoopFlow::Next => continue,
            LoopFlow::Exit => return Flow::Normal,
            LoopFlow::Raised(token) => {
                // Relay hop: the iteration body delivered into the relay
                // checkpoint; hand the signal to the loop's resolver.
                chain.set_loop_state(frame, LoopState::Resolve);
                tracing::trace!(loop_label = %label, "relay checkpoint re-delivering to loop resolver");
                let signal = match chain.take(frame) {
                    Some(signal) => signal,
                    None => errors::invariant("loop boundary fired with no signal set"),
                };
                match resolve(FrameRole::LoopResolve(label), signal) {
                    Resolution::NextIteration => {
                        chain.set_loop_state(frame, LoopState::Relay);
                        continue;
                    }
                    Resolution::ExitLoop => return Flow::Normal,
                    Resolution::Forward(forwarded) => {
                        let parent = match chain.parent(frame) {
                            Some(parent) => parent,
                            None => errors::invariant("loop frame has no parent link"),
                        };
                        chain.deliver(parent, forwarded);
                        return Flow::Raised(token);
                    }
                    _ => errors::invariant("loop frame produced a function-boundary resolution"),
                }
            }
        }
    }
}

/// Build a fresh chain, install the function's outermost frame, and run
/// `body` under it.
pub(crate) fn run_function<R, F>(body: F) -> Result<R, DynError>
where
    R: 'static,
    F: FnOnce(&Scope<'_, R>) -> Outcome<R>,
{
    let chain = Chain::new();
    let root = chain.push(None, FrameKind::Plain);
    let _guard = FrameGuard { chain: &chain };
    let scope = Scope::chaining(&chain, root);
    match body(&scope) {
        Outcome::Yield(value) => Ok(value),
        Outcome::Raised(_) => {
            let signal = match chain.take(root) {
                Some(signal) => signal,
                None => errors::invariant("function boundary fired with no signal set"),
            };
            match resolve(FrameRole::Outermost, signal) {
                Resolution::Complete(value) => Ok(value),
                Resolution::Surface(error) => Err(error),
                _ => errors::invariant("outermost frame produced a loop resolution"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowFault;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_frames_pop_on_guard_drop() {
        let chain: Chain<i64> = Chain::new();
        let root = chain.push(None, FrameKind::Plain);
        {
            let _inner = chain.push(Some(root), FrameKind::Plain);
            let _guard = FrameGuard { chain: &chain };
            assert_eq!(chain.frames.borrow().len(), 2);
        }
        assert_eq!(chain.frames.borrow().len(), 1);
    }

    #[test]
    fn test_signal_moves_between_slots_without_copying() {
        let chain: Chain<i64> = Chain::new();
        let root = chain.push(None, FrameKind::Plain);
        let child = chain.push(Some(root), FrameKind::Plain);

        chain.deliver(child, Signal::Return(9));
        let signal = chain.take(child).expect("signal in child slot");
        assert!(chain.take(child).is_none());

        chain.deliver(root, signal);
        match chain.take(root) {
            Some(Signal::Return(v)) => assert_eq!(v, 9),
            other => panic!("expected the moved return signal, got {:?}", other),
        }
    }

    #[test]
    fn test_double_delivery_is_an_invariant_fault() {
        let chain: Chain<i64> = Chain::new();
        let root = chain.push(None, FrameKind::Plain);
        chain.deliver(root, Signal::Return(1));
        let result = catch_unwind(AssertUnwindSafe(|| {
            chain.deliver(root, Signal::Return(2));
        }));
        let payload = result.unwrap_err();
        let fault = payload.downcast_ref::<FlowFault>().expect("typed fault");
        assert!(matches!(fault, FlowFault::InvariantViolation(_)));
    }

    #[test]
    fn test_parent_links_form_a_chain() {
        let chain: Chain<i64> = Chain::new();
        let root = chain.push(None, FrameKind::Plain);
        let mid = chain.push(Some(root), FrameKind::Plain);
        let leaf = chain.push(
            Some(mid),
            FrameKind::Loop {
                label: Label::new("inner"),
                state: LoopState::Relay,
            },
        );
        assert_eq!(chain.parent(leaf), Some(mid));
        assert_eq!(chain.parent(mid), Some(root));
        assert_eq!(chain.parent(root), None);
    }
}
