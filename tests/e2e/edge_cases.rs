use super::*;

#[test]
fn missing_options_are_reported_by_name() {
    let ctx = TestContext::new();
    let result = ctx.run(&[]);

    assert_failure_mentions(&result, "Missing config options: aws_name_prefix");
}

#[test]
fn missing_default_config_file_only_warns() {
    let ctx = TestContext::new();
    let result = ctx.run(&["-n", "ci", "-r", "SEC", "-t", "auditable:true", "-x"]);

    assert_failure_mentions(&result, "Missing config options: asset_duration");
    assert!(
        result.stderr.contains("no config file provided"),
        "Expected a warning about the missing config file, got stderr: {}",
        result.stderr
    );
}

#[test]
fn explicitly_named_config_file_must_exist() {
    let ctx = TestContext::new();
    let result = ctx.run(&["-c", "nowhere.yml"]);

    assert_failure_mentions(&result, "can't read config file");
}

#[test]
fn malformed_target_tags_are_rejected() {
    let ctx = TestContext::new();
    let result = ctx.run(&[
        "-n",
        "ci",
        "-r",
        "SEC",
        "-t",
        "auditable",
        "-d",
        "60",
        "-x",
    ]);

    assert_failure_mentions(&result, "target_tags");
}

#[test]
fn file_values_are_validated_after_merging() {
    let ctx = TestContext::new();
    ctx.write_file(
        "config.yml",
        "aws_name_prefix: ci\nrules_to_run: [SEC]\ntarget_tags:\n  auditable: true\nasset_duration: 0\ncleanup_resources: true\n",
    );

    let result = ctx.run(&[]);

    assert_failure_mentions(&result, "asset_duration");
    assert_failure_mentions(&result, "must be greater than zero");
}

#[test]
fn unparseable_config_file_is_an_error() {
    let ctx = TestContext::new();
    ctx.write_file("settings.toml", "aws_name_prefix = [\n");

    let result = ctx.run(&["-c", "settings.toml"]);

    assert_failure_mentions(&result, "invalid config file");
}

#[test]
fn cleanup_flag_is_still_required_when_everything_else_is_given() {
    let ctx = TestContext::new();
    let result = ctx.run(&["-n", "ci", "-r", "SEC", "-t", "auditable:true", "-d", "60"]);

    assert_failure_mentions(&result, "Missing config options: cleanup_resources");
}

#[test]
fn duration_beyond_service_range_is_a_config_error() {
    let ctx = TestContext::new();
    let result = ctx.run(&[
        "-n",
        "ci",
        "-r",
        "SEC",
        "-t",
        "auditable:true",
        "-d",
        "3000000000",
        "-x",
    ]);

    assert_failure_mentions(&result, "asset_duration");
    assert_failure_mentions(&result, "must be at most 2147483647 seconds");
}
