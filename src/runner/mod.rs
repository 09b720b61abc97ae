//! External tool execution with combined stdout/stderr capture.
//!
//! The bridge never interprets the tool's output. A [`ToolRunner`] drives the
//! program to completion inside the caller's task and hands back every byte
//! the child wrote, plus how the run ended.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::time::Instant;

/// Once the deadline has passed, pipe readers get this long before they are
/// abandoned. A background process left behind by the tool can hold the
/// pipes open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to wait for process: {0}")]
    Wait(std::io::Error),

    #[error("{0}")]
    Exit(ExitStatus),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("tool task aborted: {0}")]
    Aborted(String),
}

/// Result of a single tool invocation.
///
/// `output` is populated even when `status` is an error; it holds whatever
/// the child produced before it failed.
#[derive(Debug)]
pub struct ToolRun {
    pub output: Vec<u8>,
    pub status: Result<(), ToolError>,
}

impl ToolRun {
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            status: Ok(()),
        }
    }

    pub fn failure(output: impl Into<Vec<u8>>, error: ToolError) -> Self {
        Self {
            output: output.into(),
            status: Err(error),
        }
    }
}

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolRun> + Send + 'a>>;

/// Tool invocation seam. Implementations must be safe to call from many
/// tasks at once; the bridge runs each invocation on its own spawned task.
pub trait ToolRunner: Send + Sync + 'static {
    fn run<'a>(&'a self, args: &'a [String]) -> ToolFuture<'a>;
}

/// Runs a real executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, args: &[String]) -> ToolRun {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        crate::utils::apply_creation_flags(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolRun::failure(
                    Vec::<u8>::new(),
                    ToolError::Spawn {
                        program: self.program.display().to_string(),
                        source: e,
                    },
                )
            }
        };

        // stdout/stderr 모두 같은 버퍼로, 도착 순서대로 섞임
        let capture = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, capture.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, capture.clone())));
        }

        let limit = self.timeout.map(|limit| (limit, Instant::now() + limit));
        let waited = match limit {
            None => child.wait().await.map_err(ToolError::Wait),
            Some((limit, deadline)) => match tokio::time::timeout_at(deadline, child.wait()).await {
                Ok(result) => result.map_err(ToolError::Wait),
                Err(_) => {
                    tracing::warn!(
                        "Tool {} (pid {:?}) exceeded {:?}, killing",
                        self.program.display(),
                        child.id(),
                        limit
                    );
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("Failed to kill {}: {}", self.program.display(), e);
                    }
                    let _ = child.wait().await;
                    Err(ToolError::Timeout(limit))
                }
            },
        };
        let mut status = match waited {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ToolError::Exit(status)),
            Err(e) => Err(e),
        };

        for mut reader in readers {
            let Some((limit, deadline)) = limit else {
                if reader.await.is_err() {
                    tracing::warn!("Output reader task failed for {}", self.program.display());
                }
                continue;
            };
            let until = deadline.max(Instant::now()) + DRAIN_GRACE;
            if tokio::time::timeout_at(until, &mut reader).await.is_err() {
                tracing::warn!(
                    "Output of {} still open after {:?}, abandoning reader",
                    self.program.display(),
                    limit
                );
                reader.abort();
                if status.is_ok() {
                    status = Err(ToolError::Timeout(limit));
                }
            }
        }

        let output = std::mem::take(&mut *capture.lock().unwrap_or_else(|e| e.into_inner()));
        ToolRun { output, status }
    }
}

impl ToolRunner for ProcessRunner {
    fn run<'a>(&'a self, args: &'a [String]) -> ToolFuture<'a> {
        Box::pin(self.execute(args))
    }
}

async fn drain<R>(mut stream: R, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                sink.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(&buf[..n]);
            }
            Err(e) => {
                tracing::debug!("Tool output read error: {}", e);
                break;
            }
        }
    }
}
