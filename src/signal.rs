// File: src/signal.rs
//
// The Signal type: a tagged control-transfer request carried between
// guarded scopes. A Signal is constructed once, moved from frame to
// frame, and consumed exactly once; it is deliberately not Clone.

use std::fmt;

use crate::label::Label;

/// Boxed application error carried by an `Exception` signal.
///
/// The engine never constructs, wraps, or inspects these; the same box
/// that was raised is handed to the function's caller.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A control-transfer request, generic over the enclosing function's
/// return type `R`.
///
/// The absent-signal state ("None" in the propagation protocol) is
/// represented by an empty frame slot (`Option<Signal<R>>::None`) rather
/// than a variant, so a partially-built signal cannot exist: `Continue`
/// and `Break` always carry their label, `Return` and `Exception` always
/// carry their payload.
pub enum Signal<R> {
    /// Return `R` from the enclosing function.
    Return(R),
    /// Surface an application error to the function's caller.
    Exception(DynError),
    /// Resume the next iteration of the loop named by the label.
    Continue(Label),
    /// Exit the loop named by the label.
    Break(Label),
}

/// Discriminant of a [`Signal`], used for dispatch and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Return,
    Exception,
    Continue,
    Break,
}

impl<R> Signal<R> {
    /// The signal's kind tag.
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Return(_) => SignalKind::Return,
            Signal::Exception(_) => SignalKind::Exception,
            Signal::Continue(_) => SignalKind::Continue,
            Signal::Break(_) => SignalKind::Break,
        }
    }

    /// The target label, present only for `Continue`/`Break`.
    pub fn label(&self) -> Option<Label> {
        match self {
            Signal::Continue(label) | Signal::Break(label) => Some(*label),
            _ => None,
        }
    }
}

/// Equality is label-based and only defined for the labeled kinds:
/// two `Continue` (or two `Break`) signals are equal when their labels
/// are. Signals of different kinds, and any pair involving a payload
/// (`Return`/`Exception`), are never equal.
impl<R> PartialEq for Signal<R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Signal::Continue(a), Signal::Continue(b)) => a == b,
            (Signal::Break(a), Signal::Break(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalKind::Return => write!(f, "return"),
            SignalKind::Exception => write!(f, "exception"),
            SignalKind::Continue => write!(f, "continue"),
            SignalKind::Break => write!(f, "break"),
        }
    }
}

impl<R> fmt::Debug for Signal<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Signal::Return(_) => write!(f, "Signal::Return(..)"),
            Signal::Exception(e) => write!(f, "Signal::Exception({})", e),
            Signal::Continue(label) => write!(f, "Signal::Continue({})", label),
            Signal::Break(label) => write!(f, "Signal::Break({})", label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_label_accessors() {
        let s: Signal<i64> = Signal::Break(Label::new("outer"));
        assert_eq!(s.kind(), SignalKind::Break);
        assert_eq!(s.label(), Some(Label::new("outer")));

        let r: Signal<i64> = Signal::Return(7);
        assert_eq!(r.kind(), SignalKind::Return);
        assert_eq!(r.label(), None);
    }

    #[test]
    fn test_labeled_signal_equality_is_by_label() {
        let a: Signal<()> = Signal::Continue(Label::new("x"));
        let b: Signal<()> = Signal::Continue(Label::new("x"));
        let c: Signal<()> = Signal::Continue(Label::new("y"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_different_kinds_are_never_equal() {
        let cont: Signal<i64> = Signal::Continue(Label::new("x"));
        let brk: Signal<i64> = Signal::Break(Label::new("x"));
        assert_ne!(cont, brk);

        let ret_a: Signal<i64> = Signal::Return(1);
        let ret_b: Signal<i64> = Signal::Return(1);
        assert_ne!(ret_a, ret_b);
    }
}
