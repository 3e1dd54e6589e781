//! Client-chosen identifiers.
//!
//! The daemon never assigns ids; the client picks a 32-bit value when it
//! issues a create command and the daemon echoes it back in related events.
//! Each class gets its own newtype so a scanner id can't be handed to a
//! connection-channel command by accident.

use std::fmt;
use std::hash::Hash;

use serde::Serialize;

/// The four identifier namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdClass {
    Connection,
    Scanner,
    Listener,
    Wizard,
}

impl IdClass {
    pub fn as_str(self) -> &'static str {
        match self {
            IdClass::Connection => "connection channel",
            IdClass::Scanner => "scanner",
            IdClass::Listener => "battery listener",
            IdClass::Wizard => "scan wizard",
        }
    }
}

impl fmt::Display for IdClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of the identifier newtypes.
pub trait Identifier: Copy + Eq + Hash + fmt::Display + fmt::Debug {
    /// Namespace this identifier lives in.
    const CLASS: IdClass;

    fn from_raw(raw: u32) -> Self;

    fn raw(self) -> u32;
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $class:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl Identifier for $name {
            const CLASS: IdClass = $class;

            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

identifier!(
    /// Identifies a connection channel to one button.
    ConnectionId,
    IdClass::Connection
);
identifier!(
    /// Identifies a raw advertisement scanner.
    ScanId,
    IdClass::Scanner
);
identifier!(
    /// Identifies a battery status listener for one button.
    ListenerId,
    IdClass::Listener
);
identifier!(
    /// Identifies a guided pairing (scan wizard) session.
    WizardId,
    IdClass::Wizard
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_carry_their_class() {
        assert_eq!(ConnectionId::CLASS, IdClass::Connection);
        assert_eq!(ScanId::CLASS, IdClass::Scanner);
        assert_eq!(ListenerId::CLASS, IdClass::Listener);
        assert_eq!(WizardId::CLASS, IdClass::Wizard);
    }

    #[test]
    fn display_is_the_raw_number() {
        assert_eq!(ConnectionId(7).to_string(), "7");
        assert_eq!(WizardId::from_raw(u32::MAX).raw(), u32::MAX);
    }
}
