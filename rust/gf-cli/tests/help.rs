use std::process::Command;

fn gf_bin() -> String {
    env!("CARGO_BIN_EXE_gf").to_string()
}

#[test]
fn version_prints_crate_version() {
    let out = Command::new(gf_bin()).arg("--version").output().unwrap();
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.starts_with("gf "), "{s}");
}

#[test]
fn subcommand_help_runs() {
    for cmd in ["init", "compute", "run", "inspect"] {
        let out = Command::new(gf_bin()).args([cmd, "--help"]).output().unwrap();
        assert!(out.status.success(), "gf {cmd} --help failed");
        let s = String::from_utf8_lossy(&out.stdout);
        assert!(s.contains(&format!("gf {cmd}")), "{s}");
    }
}

#[test]
fn unknown_command_and_missing_config_fail() {
    let out = Command::new(gf_bin()).arg("train").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown command"));

    let out = Command::new(gf_bin()).arg("init").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Missing --config"));

    let out = Command::new(gf_bin())
        .args(["compute", "--config"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Missing value for --config"));
}
