#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/schemaipc-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn spawn_serve(sock: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_schemaipc"))
        .args([
            "serve",
            &sock.to_string_lossy(),
            "--network",
            "unix",
            "--log-level",
            "error",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve should spawn")
}

fn wait_for_socket(sock: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !sock.exists() {
        assert!(Instant::now() < deadline, "serve did not bind in time");
        thread::sleep(Duration::from_millis(25));
    }
}

fn client_command(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_schemaipc"))
        .args(args)
        .output()
        .expect("client command should run")
}

#[test]
fn serve_answers_send_ping_and_info() {
    let dir = unique_temp_dir("roundtrip");
    let sock = dir.join("demo.sock");

    let mut server = spawn_serve(&sock);
    wait_for_socket(&sock);
    let sock_arg = sock.to_string_lossy();

    let send = client_command(&[
        "send",
        &sock_arg,
        "--network",
        "unix",
        "--data",
        "hello-cli",
        "--format",
        "json",
    ]);
    assert!(send.status.success(), "send failed: {send:?}");
    let send_stdout = String::from_utf8_lossy(&send.stdout);
    assert!(send_stdout.contains("hello-cli"));

    let ping = client_command(&["ping", &sock_arg, "--network", "unix", "--format", "json"]);
    assert!(ping.status.success(), "ping failed: {ping:?}");
    let ping_stdout = String::from_utf8_lossy(&ping.stdout);
    assert!(ping_stdout.contains("rtt_us"));

    let info = client_command(&["info", &sock_arg, "--network", "unix", "--format", "json"]);
    assert!(info.status.success(), "info failed: {info:?}");
    let info_stdout = String::from_utf8_lossy(&info.stdout);
    assert!(info_stdout.contains("Echo"));
    assert!(info_stdout.contains("payload"));

    let _ = server.kill();
    let _ = server.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = client_command(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("schemaipc"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn connect_to_missing_endpoint_fails_cleanly() {
    let output = client_command(&[
        "info",
        "/tmp/schemaipc-definitely-missing.sock",
        "--network",
        "unix",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
}
