//! In-process tests of the `nmc` runtime against a fake daemon.

use std::ffi::OsString;
use std::io::Cursor;
use std::os::unix::net::UnixListener;
use std::process::ExitCode;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use nm_client::codec::{read_frame, write_frame};
use nm_config::Config;
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::run_with_loader;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Daemon answering exactly one request with the given frames.
struct OneShotDaemon {
    _dir: TempDir,
    config: Config,
    handle: JoinHandle<Result<Value>>,
}

impl OneShotDaemon {
    fn spawn(frames: Vec<Value>) -> Result<Self> {
        let dir = tempfile::tempdir().context("create socket dir")?;
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).context("bind fake daemon")?;
        let socket = path
            .to_str()
            .ok_or_else(|| anyhow!("socket path is not UTF-8"))?;
        let config = Config {
            daemon_socket: socket.into(),
            timeout_ms: 5_000,
            ..Config::default()
        };
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().context("accept client")?;
            let request = read_frame(&mut stream, usize::MAX).context("read request")?;
            for frame in &frames {
                write_frame(&mut stream, &serde_json::to_vec(frame)?, usize::MAX)
                    .context("write reply")?;
            }
            serde_json::from_slice(&request).context("decode request")
        });
        Ok(Self {
            _dir: dir,
            config,
            handle,
        })
    }

    fn request(self) -> Result<Value> {
        self.handle
            .join()
            .map_err(|_| anyhow!("fake daemon thread panicked"))?
    }
}

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn run(config: Config, args: &[&str], stdin: &str) -> Outcome {
    let loader = StaticConfigLoader { config };
    let mut input = Cursor::new(stdin.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let arguments = std::iter::once("nmc")
        .chain(args.iter().copied())
        .map(OsString::from);
    let code = run_with_loader(arguments, &loader, &mut input, &mut stdout, &mut stderr);
    Outcome {
        code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

#[test]
fn ping_prints_pong() -> Result<()> {
    let daemon = OneShotDaemon::spawn(vec![json!({"kind": "pong", "data": "pong"})])?;

    let outcome = run(daemon.config.clone(), &["ping"], "");

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout, "pong\n");
    assert_eq!(daemon.request()?, json!({"kind": "ping", "data": "ping"}));
    Ok(())
}

#[rstest]
#[case::running(&["show"], "running-network-state")]
#[case::saved(&["show", "--saved"], "saved-network-state")]
fn show_prints_the_state(#[case] args: &[&str], #[case] scope: &str) -> Result<()> {
    let daemon = OneShotDaemon::spawn(vec![
        json!({"kind": "log", "data": {"source": "daemon", "level": "info", "message": "query"}}),
        json!({"kind": "network-state", "data": {"interfaces": []}}),
    ])?;

    let outcome = run(daemon.config.clone(), args, "");

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let printed: Value = serde_json::from_str(&outcome.stdout)?;
    assert_eq!(printed, json!({"interfaces": []}));
    assert_eq!(
        daemon.request()?,
        json!({"kind": "query-network-state", "data": {"version": 1, "kind": scope}})
    );
    Ok(())
}

#[test]
fn apply_reads_state_from_stdin() -> Result<()> {
    let daemon = OneShotDaemon::spawn(vec![json!({"kind": "applied", "data": null})])?;

    let outcome = run(
        daemon.config.clone(),
        &["apply", "-", "--no-verify"],
        r#"{"interfaces": [{"name": "eth0", "mtu": 1500}]}"#,
    );

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.is_empty());
    assert_eq!(
        daemon.request()?,
        json!({
            "kind": "apply-network-state",
            "data": [
                {"interfaces": [{"name": "eth0", "mtu": 1500}]},
                {"version": 1, "no-verify": true},
            ],
        })
    );
    Ok(())
}

#[test]
fn validation_errors_fail_the_command() -> Result<()> {
    let daemon = OneShotDaemon::spawn(vec![json!({
        "kind": "error",
        "data": {"kind": "invalid-argument", "msg": "MTU 70000 is out of range"},
    })])?;

    let outcome = run(
        daemon.config.clone(),
        &["apply", "-"],
        r#"{"interfaces": [{"name": "eth0", "mtu": 70000}]}"#,
    );

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("invalid argument: MTU 70000 is out of range"),
        "stderr: {}",
        outcome.stderr
    );
    daemon.request()?;
    Ok(())
}

#[test]
fn missing_daemon_prints_a_hint() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let socket = dir
        .path()
        .join("absent.sock")
        .to_str()
        .map(String::from)
        .ok_or_else(|| anyhow!("socket path is not UTF-8"))?;
    let config = Config {
        daemon_socket: socket.into(),
        ..Config::default()
    };

    let outcome = run(config, &["ping"], "");

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to connect"), "{}", outcome.stderr);
    assert!(outcome.stderr.contains("hint:"), "{}", outcome.stderr);
    Ok(())
}

#[test]
fn usage_errors_go_to_stderr() {
    let outcome = run(Config::default(), &["frobnicate"], "");

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.starts_with("nmc: "), "{}", outcome.stderr);
}

#[test]
fn help_goes_to_stdout() {
    let outcome = run(Config::default(), &["--help"], "");

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("apply"), "{}", outcome.stdout);
}
