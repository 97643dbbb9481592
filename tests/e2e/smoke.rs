use super::*;
use predicates::prelude::*;

#[test]
fn help_lists_every_config_flag() {
    let ctx = TestContext::new();

    ctx.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--aws-name-prefix"))
        .stdout(predicate::str::contains("--rules-to-run"))
        .stdout(predicate::str::contains("--target-tags"))
        .stdout(predicate::str::contains("--asset-duration"))
        .stdout(predicate::str::contains("--cleanup-resources"))
        .stdout(predicate::str::contains("--no-cleanup-resources"))
        .stdout(predicate::str::contains("--failure-metrics"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn version_runs_without_error() {
    let ctx = TestContext::new();

    ctx.command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("inspect-run"));
}

#[test]
fn config_errors_leave_stdout_empty() {
    let ctx = TestContext::new();

    ctx.command()
        .args(["-n", "ci"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}
