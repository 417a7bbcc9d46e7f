use std::cell::Cell;

use miette::{miette, Result, Severity};

pub const TRACE_VAR: &str = "RAMEN_TRACE";
pub const MAX_STEPS_VAR: &str = "RAMEN_MAX_STEPS";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    trace: bool,
    max_steps: Option<u64>,
}

thread_local! {
    /// Written once by `store`
    static ENV: Cell<Option<Env>> = const { Cell::new(None) };
}

/// Read configuration from the process environment. Must be called once before any getter.
pub fn init() -> Result<()> {
    let trace = std::env::var(TRACE_VAR).ok();
    let max_steps = std::env::var(MAX_STEPS_VAR).ok();
    store(Env {
        trace: trace.as_deref() == Some("1"),
        max_steps: parse_max_steps(max_steps.as_deref())?,
    });
    Ok(())
}

pub fn is_trace_enabled() -> bool {
    current().trace
}

pub fn max_steps() -> Option<u64> {
    current().max_steps
}

fn parse_max_steps(value: Option<&str>) -> Result<Option<u64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(limit) => Ok(Some(limit)),
        Err(e) => Err(miette!(
            severity = Severity::Error,
            code = "env::max_steps",
            help = "set it to a positive integer, or 0 for no limit",
            "Invalid value `{}` for {}: {}",
            value,
            MAX_STEPS_VAR,
            e
        )),
    }
}

fn store(env: Env) {
    let previous = ENV.with(|cell| cell.replace(Some(env)));
    assert!(
        previous.is_none(),
        "environment configuration was initialized twice"
    );
}

fn current() -> Env {
    match ENV.with(Cell::get) {
        Some(env) => env,
        None => panic!("environment configuration read before `env::init`"),
    }
}
