//! Event sources backed by an external resolver process.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{parse_event_line, ResolverError, ResolverEvent};

/// Buffered events between the reader task and the performer.
const EVENT_BUFFER: usize = 64;

/// Starts a resolver run for a page URL and streams its events.
///
/// The stream always ends with [`ResolverEvent::Finished`] unless the
/// receiver is dropped first.
pub trait EventSource: Send + Sync {
    fn start(&self, url: &str) -> Result<mpsc::Receiver<ResolverEvent>, ResolverError>;
}

/// Runs `program args... url` and parses its stdout and stderr lines.
#[derive(Debug, Clone)]
pub struct ProcessEventSource {
    program: String,
    args: Vec<String>,
}

impl ProcessEventSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Spawn the process; the returned receiver yields its events.
    ///
    /// Dropping the receiver kills the process.
    pub fn spawn(&self, url: &str) -> Result<mpsc::Receiver<ResolverEvent>, ResolverError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolverError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ResolverError::Process("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ResolverError::Process("stderr not captured".to_string()))?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let program = self.program.clone();

        tokio::spawn(async move {
            let mut out = BufReader::new(stdout).lines();
            let mut err = BufReader::new(stderr).lines();
            let mut out_open = true;
            let mut err_open = true;

            while out_open || err_open {
                let (line, from_stdout) = tokio::select! {
                    line = out.next_line(), if out_open => (line, true),
                    line = err.next_line(), if err_open => (line, false),
                };
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        if from_stdout {
                            out_open = false;
                        } else {
                            err_open = false;
                        }
                        continue;
                    }
                };

                if let Some(event) = parse_event_line(&line) {
                    if tx.send(event).await.is_err() {
                        debug!(program = %program, "Resolver receiver dropped, killing process");
                        let _ = child.kill().await;
                        return;
                    }
                }
            }

            let exit_code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!(program = %program, error = %e, "Failed to wait for resolver");
                    -1
                }
            };
            let _ = tx.send(ResolverEvent::Finished { exit_code }).await;
        });

        Ok(rx)
    }
}

impl EventSource for ProcessEventSource {
    fn start(&self, url: &str) -> Result<mpsc::Receiver<ResolverEvent>, ResolverError> {
        self.spawn(url)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessEventSource {
        ProcessEventSource::new("sh", vec!["-c".to_string(), script.to_string(), "sh".to_string()])
    }

    async fn collect(mut rx: mpsc::Receiver<ResolverEvent>) -> Vec<ResolverEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_process_events_end_with_finished() {
        let source = shell(r#"echo "[download] Destination: $1.mp4"; echo '{"id":"x"}'"#);
        let events = collect(source.spawn("clip").unwrap()).await;

        assert_eq!(
            events,
            vec![
                ResolverEvent::Destination {
                    filename: "clip.mp4".to_string()
                },
                ResolverEvent::Meta {
                    json: r#"{"id":"x"}"#.to_string()
                },
                ResolverEvent::Finished { exit_code: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_stderr_errors_and_exit_code() {
        let source = shell("echo 'ERROR: no video' >&2; exit 3");
        let events = collect(source.spawn("u").unwrap()).await;

        assert!(events.contains(&ResolverEvent::Error {
            message: "no video".to_string()
        }));
        assert_eq!(events.last(), Some(&ResolverEvent::Finished { exit_code: 3 }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let source = ProcessEventSource::new("/nonexistent/resolver", Vec::new());
        let err = source.spawn("u").unwrap_err();
        assert!(matches!(err, ResolverError::Spawn { .. }));
    }
}
