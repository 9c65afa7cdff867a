// File: src/lib.rs
//
// Library interface for the nonlocal control-transfer runtime.
// Guarded code raises structured signals (return / labeled continue /
// labeled break / exception) that propagate across call-frame
// boundaries to the scope owning the matching label or to the function
// boundary, over one of two observably equivalent transports.

pub mod config;
pub mod errors;
pub mod label;
pub mod scope;
pub mod signal;

mod transport;

pub use config::Backend;
pub use errors::FlowFault;
pub use label::Label;
pub use scope::{run, run_function, Flow, LoopFlow, Outcome, Raised, Scope};
pub use signal::{DynError, Signal, SignalKind};
