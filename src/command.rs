//! Subprocess execution with a deadline.
//!
//! Both the bridge transport and vendor GPU tools are plain command-line
//! programs. A hung child must not stall the relay forever, so every call
//! carries a timeout after which the child is killed.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::CommandError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to wait for output readers after the child exits. A grandchild
/// that inherited the pipes (an adb server starting up) can hold them open.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Run `program` with `args` and return its stdout when it exits with
/// status zero.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, CommandError> {
    tracing::trace!(program, ?args, "spawning");
    let spawn_err = |source| CommandError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    // Drain both pipes while waiting; a child that fills a pipe buffer
    // blocks on write and would otherwise never exit.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(spawn_err(err));
            }
        }
    };

    let drained_by = Instant::now() + DRAIN_GRACE;
    let stdout = collect(stdout, drained_by);
    let stderr = collect(stderr, drained_by);

    if !status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status,
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<JoinHandle<String>>, deadline: Instant) -> String {
    let Some(handle) = reader else {
        return String::new();
    };
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::debug!("output pipe still open after exit, leaving reader detached");
            return String::new();
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    handle.join().unwrap_or_default()
}

/// Whether `program` can be launched at all.
pub fn command_exists(program: &str, probe_arg: &str) -> bool {
    run_command(program, &[probe_arg], Duration::from_secs(5)).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn captures_stdout() {
        let out = run_command("echo", &["hello"], TIMEOUT).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn nonzero_exit_is_failed() {
        let err = run_command("sh", &["-c", "echo nope >&2; exit 3"], TIMEOUT).unwrap_err();
        match err {
            CommandError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "nope");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_command("sysmon-relay-no-such-program", &[], TIMEOUT).unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(!command_exists("sysmon-relay-no-such-program", "version"));
    }

    #[test]
    fn slow_program_times_out() {
        let started = Instant::now();
        let err = run_command("sleep", &["5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_child_holding_pipe_does_not_block() {
        let started = Instant::now();
        assert!(run_command("sh", &["-c", "echo ready; sleep 5 &"], TIMEOUT).is_ok());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn large_output_does_not_stall() {
        let out = run_command(
            "sh",
            &["-c", "head -c 200000 /dev/zero | tr '\\0' a; head -c 100000 /dev/zero >&2"],
            Duration::from_secs(3),
        )
        .unwrap();
        assert_eq!(out.len(), 200_000);
        assert!(out.bytes().all(|b| b == b'a'));
    }

    #[test]
    fn large_stderr_is_kept_on_failure() {
        let err = run_command(
            "sh",
            &["-c", "head -c 100000 /dev/zero | tr '\\0' e >&2; exit 1"],
            Duration::from_secs(3),
        )
        .unwrap_err();
        match err {
            CommandError::Failed { stderr, .. } => assert_eq!(stderr.len(), 100_000),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
