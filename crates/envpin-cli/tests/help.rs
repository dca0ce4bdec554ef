use assert_cmd::cargo::cargo_bin_cmd;

fn help_output(args: &[&str]) -> String {
    let assert = cargo_bin_cmd!("pin-versions").args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help")
}

#[test]
fn help_lists_flags_and_examples() {
    let output = help_output(&["--help"]);
    for flag in [
        "--input",
        "--output",
        "--inplace",
        "--env",
        "--pin-pip",
        "--keep-python-unpinned",
        "--lock-linux64",
        "--lock-output",
        "--json",
    ] {
        assert!(output.contains(flag), "help missing {flag}: {output}");
    }
    assert!(
        output.contains("pin-versions -n health-ai --lock-linux64 --json"),
        "help missing example: {output}"
    );
}

#[test]
fn conflicting_output_modes_are_rejected() {
    cargo_bin_cmd!("pin-versions")
        .args(["--inplace", "-o", "out.yml"])
        .assert()
        .failure()
        .code(2);
}
