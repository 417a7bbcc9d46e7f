use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use ramen::{assemble, ArgumentError, Machine, Program, Registers};

/// Ramen is an assembler and interpreter for Random Access Machine programs.
#[derive(Parser)]
#[command(version, args_conflicts_with_subcommands = true, after_help = SYNTAX)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.ram` file to run
    path: Option<PathBuf>,
    /// Initial values of registers c(1), c(2), ...
    #[arg(allow_negative_numbers = true)]
    registers: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.ram` file and print the final accumulator
    Run {
        /// `.ram` file to run
        name: PathBuf,
        /// Initial values of registers c(1), c(2), ...
        #[arg(allow_negative_numbers = true)]
        registers: Vec<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Print every instruction as it executes
        #[arg(short, long)]
        trace: bool,
        /// Abort after executing this many instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// Check a `.ram` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
}

#[derive(Default)]
struct RunOptions {
    minimal: bool,
    trace: bool,
    max_steps: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ramen::env::init()?;

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(ramen::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run {
            name,
            registers,
            minimal,
            trace,
            max_steps,
        }) => run(
            &name,
            &registers,
            RunOptions {
                minimal,
                trace,
                max_steps,
            },
        ),
        Some(Command::Check { name }) => check(&name),
        None => match args.path {
            Some(path) => run(&path, &args.registers, RunOptions::default()),
            None => {
                println!("\n~ ramen v{VERSION} ~");
                println!("{SHORT_INFO}");
                Ok(())
            }
        },
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Yellow,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Yellow => left.yellow(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, registers: &[String], opts: RunOptions) -> Result<()> {
    let regs = Registers::from_args(registers).map_err(ArgumentError::report)?;

    if !opts.minimal {
        file_message(MsgColor::Green, "Assembling", name);
    }
    let (src, program) = load(name)?;

    let mut machine = Machine::with_registers(&program, regs);
    machine.set_trace(opts.trace || ramen::env::is_trace_enabled());
    machine.set_max_steps(opts.max_steps.or_else(ramen::env::max_steps));

    if !opts.minimal {
        message(MsgColor::Green, "Running", "assembled program");
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let halt = machine
        .run(&mut out)
        .map_err(|e| e.report(&name.display().to_string(), &src))?;

    writeln!(out, "--- END ---\nc(0) = {}", halt.acc).into_diagnostic()?;
    drop(out);

    if !opts.minimal {
        let summary = format!("{} after {} steps", name.display(), halt.steps);
        message(MsgColor::Green, "Completed", &summary);
    }
    Ok(())
}

fn check(name: &Path) -> Result<()> {
    file_message(MsgColor::Green, "Checking", name);
    let (_, program) = load(name)?;

    for target in program.undefined_labels() {
        let warning = format!("label `{}` is never declared", target.label);
        message(MsgColor::Yellow, "Warning", &warning);
    }
    let summary = format!(
        "{} instructions, {} labels",
        program.len(),
        program.labels().len()
    );
    message(MsgColor::Green, "Success", &summary);
    Ok(())
}

/// Read and assemble source file, returning the source text alongside for diagnostics.
fn load(name: &Path) -> Result<(String, Program)> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    let program = assemble(&src).map_err(|e| e.report(&name.display().to_string(), &src))?;
    Ok((src, program))
}

const SYNTAX: &str = r"Syntax:
    <label>:
    STORE       <n>
    INDSTORE    <n>
    [C|IND]LOAD <n>
    [C|IND]ADD  <n>
    [C|IND]SUB  <n>
    [C|IND]MUL  <n>
    [C|IND]DIV  <n>
    DUMP        <n>    # dump first n registers
    GOTO <label>
    IF [=|!=|<|>|<=|>=] <n> GOTO <label>
    END

Numbers are decimal, or prefixed by 0x, 0o or 0b. Comments start with #.";

const SHORT_INFO: &str = r"
Welcome to ramen, an assembler and interpreter for Random Access Machine programs.
Please use `-h` or `--help` to access the usage instructions and instruction syntax.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
