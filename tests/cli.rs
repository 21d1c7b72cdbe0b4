// tests/cli.rs
// =============================================================================
// Runs the compiled `imgo` binary.
//
// The validation tests point the binary at a local listener that nothing
// should connect to, and check its accept queue is still empty afterwards.
// =============================================================================

use std::io::ErrorKind;
use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn imgo() -> Command {
    Command::cargo_bin("imgo").unwrap()
}

// A seed URL backed by a listener that records whether anyone connected
struct Seed {
    listener: TcpListener,
    url: String,
}

impl Seed {
    fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        Self { listener, url }
    }

    fn assert_untouched(&self) {
        match self.listener.accept() {
            Err(err) => assert_eq!(err.kind(), ErrorKind::WouldBlock),
            Ok((_, peer)) => panic!("unexpected connection from {peer}"),
        }
    }
}

#[test]
fn test_version_subcommand() {
    imgo()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("v{}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_missing_url_is_a_usage_error() {
    imgo().assert().failure();
}

#[test]
fn test_negative_limit_is_fatal() {
    let seed = Seed::bind();
    imgo()
        .args(["--limit", "-1", seed.url.as_str()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--limit must not be negative"));
    seed.assert_untouched();
}

#[test]
fn test_negative_delay_and_parallel_are_fatal() {
    let seed = Seed::bind();
    imgo()
        .args(["--delay", "-3", seed.url.as_str()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--delay"));

    imgo()
        .args(["--parallel", "-1", seed.url.as_str()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--parallel"));
    seed.assert_untouched();
}

#[test]
fn test_missing_destination_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let seed = Seed::bind();
    imgo()
        .arg("--dest")
        .arg(&missing)
        .arg(&seed.url)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("destination directory does not exist"));
    seed.assert_untouched();
}

#[test]
fn test_malformed_cookie_and_credentials_are_fatal() {
    let seed = Seed::bind();
    imgo()
        .args(["-c", "no-colon", seed.url.as_str()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cookie must look like key:value"));

    imgo()
        .args(["-u", "user name:pw", seed.url.as_str()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("credentials must look like"));
    seed.assert_untouched();
}
