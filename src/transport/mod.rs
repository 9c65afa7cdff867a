// File: src/transport/mod.rs
//
// Signal transports and the frame-resolution algorithm they share.
//
// A transport moves a raised Signal from the raising call site to the
// nearest enclosing frame boundary. Two transports exist: stack
// unwinding (panic-based) and continuation chaining (arena of frame
// records). Both feed every delivered signal through `resolve`, so the
// consume-vs-forward decision is made in exactly one place and the two
// backends cannot drift apart observably.

pub(crate) mod chaining;
pub(crate) mod unwinding;

use crate::errors;
use crate::label::Label;
use crate::signal::{DynError, Signal};

/// The position a frame occupies in its function's context chain, as
/// seen by the resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameRole {
    /// An ordinary guarded sub-scope. Never label-matches; forwards
    /// every signal to its parent.
    Plain,
    /// A loop boundary resolving under its bound label. The only role
    /// allowed to consume `Continue`/`Break`.
    LoopResolve(Label),
    /// The function's outermost frame: consumes `Return`, surfaces
    /// `Exception`, and faults on any labeled signal.
    Outermost,
}

/// What a frame boundary decided to do with a delivered signal.
#[derive(Debug)]
pub(crate) enum Resolution<R> {
    /// A matching `Continue` was consumed; the loop runs its next
    /// iteration.
    NextIteration,
    /// A matching `Break` was consumed; the loop exits normally.
    ExitLoop,
    /// The signal belongs to an ancestor; move it up unchanged.
    Forward(Signal<R>),
    /// A `Return` reached the function boundary; its payload is moved
    /// out here, exactly once.
    Complete(R),
    /// An `Exception` reached the function boundary; the same box is
    /// handed to the caller.
    Surface(DynError),
}

/// Decide consume-vs-forward for one delivered signal at one frame.
///
/// This is the single resolution step both transports execute per hop.
/// An unmatched label at the outermost frame is fatal and does not
/// return.
pub(crate) fn resolve<R>(role: FrameRole, signal: Signal<R>) -> Resolution<R> {
    match role {
        FrameRole::Plain => {
            tracing::trace!(kind = %signal.kind(), "plain frame forwarding signal");
            Resolution::Forward(signal)
        }
        FrameRole::LoopResolve(bound) => match signal {
            Signal::Continue(label) if label == bound => {
                tracing::trace!(%label, "loop consumed continue");
                Resolution::NextIteration
            }
            Signal::Break(label) if label == bound => {
                tracing::trace!(%label, "loop consumed break");
                Resolution::ExitLoop
            }
            other => {
                tracing::trace!(kind = %other.kind(), loop_label = %bound, "loop frame forwarding signal");
                Resolution::Forward(other)
            }
        },
        FrameRole::Outermost => match signal {
            Signal::Return(value) => {
                tracing::trace!("return consumed at function boundary");
                Resolution::Complete(value)
            }
            Signal::Exception(error) => {
                tracing::trace!("exception surfaced at function boundary");
                Resolution::Surface(error)
            }
            Signal::Continue(label) | Signal::Break(label) => errors::unmatched_label(label),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowFault;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_plain_frames_forward_everything() {
        let signals: Vec<Signal<i64>> = vec![
            Signal::Return(1),
            Signal::Exception("boom".into()),
            Signal::Continue(Label::new("a")),
            Signal::Break(Label::new("b")),
        ];
        for signal in signals {
            let kind = signal.kind();
            match resolve(FrameRole::Plain, signal) {
                Resolution::Forward(forwarded) => assert_eq!(forwarded.kind(), kind),
                other => panic!("plain frame must forward, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_loop_consumes_only_its_own_label() {
        let bound = Label::new("outer");
        assert!(matches!(
            resolve::<i64>(FrameRole::LoopResolve(bound), Signal::Continue(bound)),
            Resolution::NextIteration
        ));
        assert!(matches!(
            resolve::<i64>(FrameRole::LoopResolve(bound), Signal::Break(bound)),
            Resolution::ExitLoop
        ));
        assert!(matches!(
            resolve::<i64>(
                FrameRole::LoopResolve(bound),
                Signal::Break(Label::new("inner"))
            ),
            Resolution::Forward(_)
        ));
    }

    #[test]
    fn test_loop_never_consumes_return() {
        let bound = Label::new("outer");
        assert!(matches!(
            resolve(FrameRole::LoopResolve(bound), Signal::Return(42)),
            Resolution::Forward(Signal::Return(42))
        ));
    }

    #[test]
    fn test_outermost_completes_return_and_surfaces_exception() {
        match resolve(FrameRole::Outermost, Signal::Return(42)) {
            Resolution::Complete(v) => assert_eq!(v, 42),
            other => panic!("expected Complete, got {:?}", other),
        }
        match resolve::<i64>(FrameRole::Outermost, Signal::Exception("oops".into())) {
            Resolution::Surface(e) => assert_eq!(e.to_string(), "oops"),
            other => panic!("expected Surface, got {:?}", other),
        }
    }

    #[test]
    fn test_outermost_faults_on_labeled_signal() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            resolve::<i64>(FrameRole::Outermost, Signal::Break(Label::new("orphan")))
        }));
        let payload = result.unwrap_err();
        let fault = payload.downcast_ref::<FlowFault>().expect("typed fault");
        assert_eq!(*fault, FlowFault::UnmatchedLabel(Label::new("orphan")));
    }
}
