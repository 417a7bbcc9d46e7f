use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::{lexer::LiteralError, span::Span};

/// Expected shape of each statement family, used in syntax diagnostics.
pub const SHAPE_OPERAND: &str = "INSTRUCTION <n>";
pub const SHAPE_GOTO: &str = "GOTO <label>";
pub const SHAPE_IF: &str = "IF [=|!=|<|>|<=|>=] <n> GOTO <label>";
pub const SHAPE_END: &str = "END";

/// Error assembling a source file. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsmError {
    /// 1-based source line
    pub line: usize,
    pub span: Span,
    pub kind: AsmErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    /// Operand is not a valid number literal.
    Literal(LiteralError),
    /// Statement has the wrong number or arrangement of fields.
    Shape { expected: &'static str },
    UnknownInstruction { name: String },
    UnknownComparison { op: String },
    /// Register index or dump count below zero.
    NegativeOperand { mnemonic: String, value: i64 },
    /// Register index or dump count does not fit the address width of the host.
    OperandTooLarge { mnemonic: String, value: i64 },
}

/// Error raised while a program is running. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// A jump was taken towards a label that was never declared.
    UnresolvedLabel {
        label: String,
        line: usize,
        span: Span,
    },
    DivisionByZero { line: usize, span: Span },
    /// Indirect addressing went through a register holding a negative index.
    NegativeRegister {
        index: i64,
        line: usize,
        span: Span,
    },
    /// Execution ran past the last instruction without reaching `END`.
    MissingEnd { acc: i64 },
    StepLimit { limit: u64, pc: usize },
    /// Indirect addressing went through a register holding an index the host cannot address.
    RegisterTooLarge {
        index: i64,
        line: usize,
        span: Span,
    },
    /// `DUMP` output could not be written.
    Output { message: String },
}

/// Register seed passed on the command line is not a number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentError {
    /// Register the argument would have been written to
    pub register: usize,
    pub value: String,
    pub error: LiteralError,
}

impl Error for AsmError {}
impl Error for RunError {}
impl Error for ArgumentError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error (line {}): {}", self.line, self.kind)
    }
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(error) => write!(f, "{}", error),
            Self::Shape { expected } => write!(f, "{}", expected),
            Self::UnknownInstruction { name } => write!(f, "unknown instruction `{}`", name),
            Self::UnknownComparison { op } => write!(f, "unknown comparison `{}`", op),
            Self::NegativeOperand { mnemonic, value } => {
                write!(f, "`{}` cannot take negative operand {}", mnemonic, value)
            }
            Self::OperandTooLarge { mnemonic, value } => {
                write!(f, "operand {} of `{}` is too large", value, mnemonic)
            }
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedLabel { label, line, .. } => {
                write!(f, "`{}` is not an existing label (line {})", label, line)
            }
            Self::DivisionByZero { line, .. } => write!(f, "division by zero (line {})", line),
            Self::NegativeRegister { index, line, .. } => {
                write!(f, "register index {} is negative (line {})", index, line)
            }
            Self::MissingEnd { acc } => write!(f, "no END! c(0) = {}", acc),
            Self::StepLimit { limit, pc } => {
                write!(f, "step limit of {} reached at PC {}", limit, pc)
            }
            Self::RegisterTooLarge { index, line, .. } => {
                write!(f, "register index {} is too large (line {})", index, line)
            }
            Self::Output { message } => write!(f, "failed to write output: {}", message),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "argument cannot be converted to a number: `{}` ({})",
            self.value, self.error
        )
    }
}

impl AsmError {
    /// Render as a diagnostic pointing into the source file.
    pub fn report(self, name: &str, src: &str) -> Report {
        let (code, help, label) = match &self.kind {
            AsmErrorKind::Literal(_) => (
                "asm::bad_lit",
                "number literals are decimal, or prefixed by 0x, 0o or 0b".to_string(),
                "invalid literal",
            ),
            AsmErrorKind::Shape { expected } => (
                "asm::shape",
                format!("expected a statement of the form `{}`", expected),
                "malformed statement",
            ),
            AsmErrorKind::UnknownInstruction { .. } => (
                "asm::unknown_instr",
                "check the list of instructions with `ramen --help`".to_string(),
                "unknown instruction",
            ),
            AsmErrorKind::UnknownComparison { .. } => (
                "asm::unknown_cmp",
                "comparisons are one of =, !=, <, >, <= or >=".to_string(),
                "unknown comparison",
            ),
            AsmErrorKind::NegativeOperand { .. } => (
                "asm::negative",
                "register indices and dump counts start at 0".to_string(),
                "negative operand",
            ),
            AsmErrorKind::OperandTooLarge { .. } => (
                "asm::too_large",
                format!("register indices and dump counts end at {}", usize::MAX),
                "operand out of range",
            ),
        };
        miette!(
            severity = Severity::Error,
            code = code,
            help = help,
            labels = vec![LabeledSpan::at(self.span, label)],
            "{}",
            self
        )
        .with_source_code(NamedSource::new(name, src.to_string()))
    }
}

impl RunError {
    /// Render as a diagnostic, pointing into the source file where possible.
    pub fn report(self, name: &str, src: &str) -> Report {
        match &self {
            Self::UnresolvedLabel { span, .. } => miette!(
                severity = Severity::Error,
                code = "run::unresolved_label",
                help = "declare the label with `<label>:` somewhere in the file",
                labels = vec![LabeledSpan::at(*span, "undefined label")],
                "{}",
                self
            )
            .with_source_code(NamedSource::new(name, src.to_string())),
            Self::DivisionByZero { span, .. } => miette!(
                severity = Severity::Error,
                code = "run::div_zero",
                help = "guard the division with an `IF` on the divisor",
                labels = vec![LabeledSpan::at(*span, "divisor is zero")],
                "{}",
                self
            )
            .with_source_code(NamedSource::new(name, src.to_string())),
            Self::NegativeRegister { span, .. } => miette!(
                severity = Severity::Error,
                code = "run::negative_register",
                help = "indirect operands must hold a register index of at least 0",
                labels = vec![LabeledSpan::at(*span, "negative register index")],
                "{}",
                self
            )
            .with_source_code(NamedSource::new(name, src.to_string())),
            Self::RegisterTooLarge { span, .. } => miette!(
                severity = Severity::Error,
                code = "run::register_too_large",
                help = format!("register indices end at {}", usize::MAX),
                labels = vec![LabeledSpan::at(*span, "register index out of range")],
                "{}",
                self
            )
            .with_source_code(NamedSource::new(name, src.to_string())),
            Self::MissingEnd { .. } => miette!(
                severity = Severity::Error,
                code = "run::missing_end",
                help = "terminate the program with `END`",
                "{}",
                self
            ),
            Self::StepLimit { .. } => miette!(
                severity = Severity::Error,
                code = "run::step_limit",
                help = "raise the limit with `--max-steps` or RAMEN_MAX_STEPS",
                "{}",
                self
            ),
            Self::Output { .. } => miette!(
                severity = Severity::Error,
                code = "run::output",
                "{}",
                self
            ),
        }
    }
}

impl ArgumentError {
    pub fn report(self) -> Report {
        miette!(
            severity = Severity::Error,
            code = "args::bad_lit",
            help = format!(
                "register c({}) expects a decimal, 0x, 0o or 0b number",
                self.register
            ),
            "{}",
            self
        )
    }
}
