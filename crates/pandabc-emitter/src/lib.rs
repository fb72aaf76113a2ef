//! pandabc bytecode emitter
//!
//! Appends instructions for one function to a byte buffer, resolves
//! branches against labels and relaxes each branch to the smallest encoding
//! that reaches its target.
//!
//! ## Modules
//!
//! - [`emit`]: The [`BytecodeEmitter`] and its relaxation pass

mod branch;
pub mod emit;
mod error;
mod label;

pub use emit::BytecodeEmitter;
pub use error::{EmitError, ErrorCode};
pub use label::Label;
