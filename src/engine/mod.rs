// Conversion engine - option state, rules and command synthesis, independent of the CLI

pub mod core;
pub mod validate;

pub use self::core::*;
pub use validate::{FileInspector, FsInspector, Inspection, check_state, validate};
