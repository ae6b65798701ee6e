use std::process::{Command, Output, Stdio};
use std::thread::sleep;
use std::time::Duration;

fn service() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_load_gen_service"));
    command
        .current_dir(std::env::temp_dir())
        .env_remove("URL")
        .env_remove("INTERVAL")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_invalid_interval_is_fatal() {
    let output = service()
        .env("URL", "https://example.test")
        .env("INTERVAL", "notaduration")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["level"], "fatal");
    let out = lines[0]["out"].as_str().unwrap();
    assert!(out.starts_with("Failed to parse interval"), "{}", out);
    assert!(out.contains("notaduration"), "{}", out);
}

#[test]
fn test_invalid_interval_text_format() {
    let output = service()
        .args(["--log-formatter", "text"])
        .env("INTERVAL", "10 parsecs")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CRIT"), "{}", stderr);
    assert!(stderr.contains("Failed to parse interval"), "{}", stderr);
}

#[test]
fn test_panic_level_hides_fatal_line_but_still_exits() {
    let output = service()
        .args(["--log-level", "panic"])
        .env("INTERVAL", "notaduration")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_empty_url_keeps_running() {
    let mut child = service()
        .env("INTERVAL", "50ms")
        .spawn()
        .unwrap();

    sleep(Duration::from_millis(600));
    assert!(child.try_wait().unwrap().is_none(), "service exited early");
    child.kill().unwrap();
    let output = child.wait_with_output().unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    assert_eq!(lines[0]["out"], "Generating load on URL:  every 50ms");
    let attempts = lines
        .iter()
        .filter(|line| line["out"] == "Sending request to ")
        .count();
    let failures = lines
        .iter()
        .filter(|line| {
            line["level"] == "error"
                && line["out"]
                    .as_str()
                    .is_some_and(|out| out.starts_with("Failed to create request"))
        })
        .count();
    assert!(attempts >= 3, "{} attempts", attempts);
    assert!(failures >= 3, "{} failures", failures);

    for line in &lines {
        let object = line.as_object().unwrap();
        assert!(object.keys().all(|key| ["args", "level", "out", "time"].contains(&key.as_str())));
    }
}

#[test]
fn test_banner_echoes_interval_as_configured() {
    let mut child = service()
        .env("INTERVAL", "90s")
        .spawn()
        .unwrap();

    sleep(Duration::from_millis(300));
    child.kill().unwrap();
    let output = child.wait_with_output().unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    let banner: serde_json::Value = serde_json::from_str(stderr.lines().next().unwrap()).unwrap();
    assert_eq!(banner["out"], "Generating load on URL:  every 90s");
}
