// Assembling
mod lexer;
pub use lexer::{parse_number, LiteralError};
mod assembler;
pub use assembler::assemble;
mod program;
pub use program::{
    AccOp, Cmp, Instruction, JumpTarget, LabelTable, Operand, Program, Stmt, Target,
};

// Running
mod registers;
pub use registers::{Registers, ACC};
mod runtime;
pub use runtime::{Halt, Machine, Step};

mod error;
pub use error::{ArgumentError, AsmError, AsmErrorKind, RunError};
mod span;
pub use span::Span;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
