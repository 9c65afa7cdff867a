// File: src/label.rs
//
// Loop labels for targeted continue/break signals.
// A label is fixed at the declaration site of the loop it names and is
// compared by content, like an interned symbol.

use std::fmt;

/// An opaque comparable token naming a loop.
///
/// `Continue` and `Break` signals carry a `Label`; only the loop scope
/// declared with an equal label may consume them. Labels are cheap to
/// copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(&'static str);

impl Label {
    /// Create a label from a static string.
    pub const fn new(name: &'static str) -> Self {
        Label(name)
    }

    /// The label's textual name.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl From<&'static str> for Label {
    fn from(name: &'static str) -> Self {
        Label(name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
