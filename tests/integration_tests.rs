use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn ramen() -> Command {
    let mut cmd = Command::cargo_bin("ramen").unwrap();
    cmd.env_remove("RAMEN_TRACE").env_remove("RAMEN_MAX_STEPS");
    cmd
}

fn run_minimal(file: &str) -> Command {
    let mut cmd = ramen();
    cmd.arg("run").arg("--minimal").arg(format!("tests/files/{file}"));
    cmd
}

#[test]
fn runs_without_arguments() {
    ramen().assert().success();
}

#[test]
fn stores_and_ends() {
    run_minimal("store.ram")
        .assert()
        .success()
        .stdout("--- END ---\nc(0) = 5\n");
}

#[test]
fn bare_path_runs_with_status_messages() {
    ramen()
        .arg("tests/files/store.ram")
        .assert()
        .success()
        .stdout(contains("Assembling"))
        .stdout(contains("c(0) = 5"))
        .stdout(contains("Completed"));
}

#[test]
fn forward_label() {
    run_minimal("forward.ram")
        .assert()
        .success()
        .stdout(contains("c(0) = 0"));
}

#[test]
fn conditional_branch() {
    run_minimal("branch.ram")
        .assert()
        .success()
        .stdout(contains("c(0) = 3"));
}

#[test]
fn seeds_registers_from_arguments() {
    run_minimal("multiply.ram")
        .arg("6")
        .arg("0x7")
        .assert()
        .success()
        .stdout(contains("c(0) = 42"));

    ramen()
        .arg("tests/files/multiply.ram")
        .arg("-3")
        .arg("2")
        .assert()
        .success()
        .stdout(contains("c(0) = -6"));
}

#[test]
fn stores_to_far_registers() {
    run_minimal("far_store.ram")
        .arg("1000000000000")
        .assert()
        .success()
        .stdout("--- END ---\nc(0) = -9223372036854775802\n");
}

#[test]
fn bad_register_argument() {
    run_minimal("store.ram")
        .arg("0z9")
        .assert()
        .code(1)
        .stderr(contains("argument cannot be converted to a number"));
}

#[test]
fn dumps_registers() {
    run_minimal("dump.ram").assert().success().stdout(
        "--- DUMP (PC: 2) ---\nc(0): \t31\nc(1): \t0\nc(2): \t31\n--- END ---\nc(0) = 31\n",
    );
}

#[test]
fn division_by_zero_fails() {
    run_minimal("div_zero.ram")
        .assert()
        .code(1)
        .stdout(contains("END").not())
        .stderr(contains("division by zero"));
}

#[test]
fn missing_end_fails() {
    run_minimal("no_end.ram")
        .assert()
        .code(1)
        .stderr(contains("no END! c(0) = 8"));
}

#[test]
fn undefined_label_fails_at_runtime() {
    run_minimal("undefined_label.ram")
        .assert()
        .code(1)
        .stderr(contains("`nowhere` is not an existing label"));
}

#[test]
fn load_errors_cite_line() {
    run_minimal("bad_literal.ram")
        .assert()
        .code(1)
        .stderr(contains("syntax error (line 2)"));

    run_minimal("unknown.ram")
        .assert()
        .code(1)
        .stderr(contains("unknown instruction `JUMP`"));
}

#[test]
fn step_limit_from_flag_and_env() {
    run_minimal("forever.ram")
        .arg("--max-steps")
        .arg("100")
        .assert()
        .code(1)
        .stderr(contains("step limit of 100"));

    run_minimal("forever.ram")
        .env("RAMEN_MAX_STEPS", "50")
        .assert()
        .code(1)
        .stderr(contains("step limit of 50"));
}

#[test]
fn trace_prints_instructions() {
    run_minimal("branch.ram")
        .arg("--trace")
        .assert()
        .success()
        .stderr(contains("IF >= 3 GOTO done"))
        .stderr(contains("CADD 100").not());

    run_minimal("branch.ram")
        .env("RAMEN_TRACE", "1")
        .assert()
        .success()
        .stderr(contains("IF >= 3 GOTO done"));

    run_minimal("branch.ram")
        .env("RAMEN_TRACE", "yes")
        .assert()
        .success()
        .stderr(contains("GOTO").not());
}

#[test]
fn check_warns_about_undefined_labels() {
    ramen()
        .arg("check")
        .arg("tests/files/undefined_label.ram")
        .assert()
        .success()
        .stdout(contains("label `nowhere` is never declared"))
        .stdout(contains("3 instructions, 0 labels"));
}

#[test]
fn check_rejects_bad_source() {
    ramen()
        .arg("check")
        .arg("tests/files/unknown.ram")
        .assert()
        .failure();
}

#[test]
fn missing_file() {
    run_minimal("does_not_exist.ram").assert().failure();
}
