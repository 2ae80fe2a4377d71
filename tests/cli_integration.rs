// CLI integration tests for parse/convert/codecs flows.
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_multiparser");
    Command::new(exe)
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write input");
    path.to_str().expect("utf8 path").to_string()
}

#[test]
fn parse_reports_the_accepting_codec() {
    let temp = tempfile::tempdir().expect("tempdir");
    let yaml = write_file(temp.path(), "input.yaml", "data: data\n");

    let output = cmd().args(["parse", &yaml]).output().expect("parse");
    assert!(output.status.success());
    let value = parse_json_line(&output.stdout);
    assert_eq!(value["codec"], "yaml");
    assert_eq!(value["data"]["data"], "data");
}

#[test]
fn sequential_policy_picks_json_first() {
    let temp = tempfile::tempdir().expect("tempdir");
    let json = write_file(temp.path(), "input.json", r#"{"data": "data"}"#);

    let output = cmd()
        .args(["--policy", "sequential", "parse", &json])
        .output()
        .expect("parse");
    assert!(output.status.success());
    let value = parse_json_line(&output.stdout);
    assert_eq!(value["codec"], "json");
    assert_eq!(value["data"]["data"], "data");
}

#[test]
fn parse_reads_stdin() {
    let mut child = cmd()
        .args(["parse"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"items:\n  - 1\n  - 2\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let value = parse_json_line(&output.stdout);
    assert_eq!(value["data"]["items"][1], 2);
}

#[test]
fn unparseable_input_exits_with_aggregated_failures() {
    let temp = tempfile::tempdir().expect("tempdir");
    let broken = write_file(temp.path(), "broken.txt", r#"{"a": [1,"#);

    let output = cmd().args(["parse", &broken]).output().expect("parse");
    assert_eq!(output.status.code(), Some(6));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "UnmarshalFailed");
    let failures = err["error"]["failures"].as_array().expect("failures");
    let mut codecs: Vec<&str> = failures
        .iter()
        .map(|failure| failure["codec"].as_str().expect("codec"))
        .collect();
    codecs.sort_unstable();
    assert_eq!(codecs, ["json", "yaml"]);
}

#[test]
fn convert_switches_format() {
    let temp = tempfile::tempdir().expect("tempdir");
    let json = write_file(temp.path(), "input.json", r#"{"a": 1}"#);
    let yaml = write_file(temp.path(), "input.yaml", "a: 1\n");

    let to_yaml = cmd()
        .args(["convert", "--to", "yaml", &json])
        .output()
        .expect("convert");
    assert!(to_yaml.status.success());
    assert_eq!(String::from_utf8_lossy(&to_yaml.stdout), "a: 1\n");

    let to_json = cmd()
        .args(["convert", "--to", "json", &yaml])
        .output()
        .expect("convert");
    assert!(to_json.status.success());
    assert_eq!(String::from_utf8_lossy(&to_json.stdout), "{\"a\":1}\n");
}

#[test]
fn config_file_sets_policy_and_flags_override_it() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_file(
        temp.path(),
        "dispatch.yaml",
        "policy: sequential\ntimeout_ms: 250\n",
    );

    let output = cmd()
        .args(["--config", &config, "--codec", "yaml", "codecs"])
        .output()
        .expect("codecs");
    assert!(output.status.success());
    let value = parse_json_line(&output.stdout);
    assert_eq!(value["codecs"], serde_json::json!(["yaml"]));
    assert_eq!(value["policy"], "sequential");
    assert_eq!(value["timeout_ms"], 250);

    let overridden = cmd()
        .args(["--config", &config, "--policy", "race", "codecs"])
        .output()
        .expect("codecs");
    let value = parse_json_line(&overridden.stdout);
    assert_eq!(value["codecs"], serde_json::json!(["json", "yaml"]));
    assert_eq!(value["policy"], "race");
}

#[test]
fn invalid_config_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_file(temp.path(), "dispatch.yaml", "policy: sideways\n");

    let output = cmd()
        .args(["--config", &config, "codecs"])
        .output()
        .expect("codecs");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["path"].as_str().expect("path").ends_with("dispatch.yaml"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = cmd().args(["--bogus", "codecs"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}

#[test]
fn missing_input_file_is_an_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("nope.json");
    let output = cmd()
        .args(["parse", missing.to_str().expect("utf8")])
        .output()
        .expect("parse");
    assert_eq!(output.status.code(), Some(8));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Io");
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> std::process::Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input)
        .expect("write stdin");
    child.wait_with_output().expect("wait")
}

#[test]
fn structured_parse_rejects_plain_scalars() {
    let loose = run_with_stdin(&["parse"], b"INVALID RAW DATA\n");
    assert!(loose.status.success());
    let value = parse_json_line(&loose.stdout);
    assert_eq!(value["codec"], "yaml");
    assert_eq!(value["data"], "INVALID RAW DATA");

    for input in [&b"INVALID RAW DATA\n"[..], b""] {
        let strict = run_with_stdin(&["parse", "--structured"], input);
        assert_eq!(strict.status.code(), Some(6));
        let err = parse_json_line(&strict.stderr);
        assert_eq!(err["error"]["kind"], "UnmarshalFailed");
        let failures = err["error"]["failures"].as_array().expect("failures");
        assert_eq!(failures.len(), 2);
    }

    let mapping = run_with_stdin(&["parse", "--structured"], b"data: data\n");
    assert!(mapping.status.success());
    let value = parse_json_line(&mapping.stdout);
    assert_eq!(value["data"]["data"], "data");
}

#[test]
fn pretty_yaml_conversion_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let json = write_file(temp.path(), "input.json", r#"{"a": 1}"#);
    let output = cmd()
        .args(["convert", "--to", "yaml", "--pretty", &json])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(output.stdout.is_empty());

    let pretty_json = run_with_stdin(&["convert", "--to", "json", "--pretty"], b"a: 1\n");
    assert!(pretty_json.status.success());
    assert_eq!(String::from_utf8_lossy(&pretty_json.stdout), "{\n  \"a\": 1\n}\n");
}

#[test]
fn zero_timeout_is_a_usage_error() {
    let output = cmd().args(["--timeout-ms", "0", "codecs"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");

    let temp = tempfile::tempdir().expect("tempdir");
    let config = write_file(temp.path(), "dispatch.yaml", "timeout_ms: 0\n");
    let from_config = cmd()
        .args(["--config", &config, "codecs"])
        .output()
        .expect("run");
    assert_eq!(from_config.status.code(), Some(2));
}
