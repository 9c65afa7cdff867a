// File: src/errors.rs
//
// Fatal propagation faults and their reporting.
// A fault is a usage or engine error that must not be continued past:
// it is reported on stderr and then terminates the current task by
// panicking with the typed fault as payload.

use colored::Colorize;
use std::fmt;

use crate::label::Label;

/// Unrecoverable propagation faults.
///
/// Neither variant is ever retried or converted into a recoverable
/// error: an unresolved labeled continue/break is a logic error in the
/// guarded program, and a frame boundary that fires without a signal in
/// flight means the engine's own bookkeeping was violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowFault {
    /// A `Continue`/`Break` reached a function's outermost scope without
    /// any enclosing loop declaring its label.
    UnmatchedLabel(Label),
    /// A frame resolved with no signal set, or a signal was delivered
    /// into a slot that was already occupied.
    InvariantViolation(&'static str),
}

impl fmt::Display for FlowFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlowFault::UnmatchedLabel(label) => {
                write!(
                    f,
                    "{}: {}",
                    "Unmatched Label".red().bold(),
                    format!("uncaught continue/break with label '{}'", label).bold()
                )
            }
            FlowFault::InvariantViolation(detail) => {
                write!(
                    f,
                    "{}: {}",
                    "Internal Invariant Violation".red().bold(),
                    detail.bold()
                )
            }
        }
    }
}

impl std::error::Error for FlowFault {}

/// Report an unmatched-label fault and terminate the current task.
pub(crate) fn unmatched_label(label: Label) -> ! {
    let fault = FlowFault::UnmatchedLabel(label);
    tracing::error!(%label, "labeled signal reached the outermost scope without a matching loop");
    eprintln!("{}", fault);
    std::panic::panic_any(fault)
}

/// Report an internal-invariant violation and terminate the current task.
pub(crate) fn invariant(detail: &'static str) -> ! {
    let fault = FlowFault::InvariantViolation(detail);
    tracing::error!(detail, "propagation invariant violated");
    eprintln!("{}", fault);
    std::panic::panic_any(fault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_fault_display_names_the_offending_label() {
        let fault = FlowFault::UnmatchedLabel(Label::new("outer"));
        let text = fault.to_string();
        assert!(text.contains("outer"), "report should name the label: {}", text);
    }

    #[test]
    fn test_unmatched_label_panics_with_typed_fault() {
        let result = catch_unwind(AssertUnwindSafe(|| unmatched_label(Label::new("nowhere"))));
        let payload = result.unwrap_err();
        let fault = payload.downcast_ref::<FlowFault>().expect("typed fault payload");
        assert_eq!(*fault, FlowFault::UnmatchedLabel(Label::new("nowhere")));
    }

    #[test]
    fn test_invariant_violation_panics_with_typed_fault() {
        let result = catch_unwind(AssertUnwindSafe(|| invariant("resolved with no signal set")));
        let payload = result.unwrap_err();
        let fault = payload.downcast_ref::<FlowFault>().expect("typed fault payload");
        assert!(matches!(fault, FlowFault::InvariantViolation(_)));
    }
}
