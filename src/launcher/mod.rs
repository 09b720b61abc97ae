//! Front-end discovery and supervision.
//!
//! 프론트엔드 실행 파일을 후보 경로에서 찾아 한 번 실행하고, 브리지 프로세스의
//! 수명은 그 자식 프로세스가 끝날 때까지로 묶입니다.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::net::TcpListener;
use tokio::process::{Child, Command as TokioCommand};

#[derive(thiserror::Error, Debug)]
pub enum LauncherError {
    #[error("Could not find frontend executable; tried: {}", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },

    #[error("Failed to launch frontend {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to wait for frontend: {0}")]
    Wait(std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    let shown: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", shown.join(", "))
}

/// Default probe order: next to (and above) the running executable first,
/// then under the working directory.
pub fn default_candidates(exe_dir: &Path, cwd: &Path, name: &str) -> Vec<PathBuf> {
    let unpacked = |base: &Path| base.join("dist").join("win-unpacked").join(name);
    vec![
        unpacked(&exe_dir.join("..")),
        unpacked(exe_dir),
        unpacked(&exe_dir.join("app")),
        unpacked(cwd),
        unpacked(&cwd.join("app")),
    ]
}

/// 실행 파일 디렉토리와 작업 디렉토리. 실패 시 서로로 대체, 둘 다 실패하면 상대 경로
pub fn probe_roots() -> (PathBuf, PathBuf) {
    let cwd = match std::env::current_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            tracing::warn!("Error getting working directory: {}", e);
            None
        }
    };
    let exe_dir = match std::env::current_exe() {
        Ok(exe) => exe.parent().map(Path::to_path_buf),
        Err(e) => {
            tracing::warn!("Error getting executable path: {}", e);
            None
        }
    };
    let exe_dir = exe_dir.or_else(|| cwd.clone()).unwrap_or_default();
    (exe_dir, cwd.unwrap_or_default())
}

/// First candidate that exists and is a regular file wins.
pub fn discover(candidates: &[PathBuf]) -> Result<PathBuf, LauncherError> {
    for path in candidates {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                tracing::debug!("Frontend candidate hit: {}", path.display());
                return Ok(path.clone());
            }
            Ok(_) => tracing::debug!("Frontend candidate is not a file: {}", path.display()),
            Err(_) => tracing::debug!("Frontend candidate missing: {}", path.display()),
        }
    }
    Err(LauncherError::NotFound {
        tried: candidates.to_vec(),
    })
}

/// The running front-end child. Owned by the process's main task.
pub struct Frontend {
    child: Child,
    path: PathBuf,
}

impl Frontend {
    /// Start without waiting for readiness. The child's working directory is
    /// its own folder so it can find bundled resources.
    pub fn launch(path: &Path) -> Result<Self, LauncherError> {
        // current_dir 변경 후에도 찾을 수 있도록 상대 경로는 절대 경로로
        let path = if path.is_relative() {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path.to_path_buf(),
            }
        } else {
            path.to_path_buf()
        };
        let path = path.as_path();

        let mut cmd = TokioCommand::new(path);
        cmd.stdin(Stdio::null()).kill_on_drop(false);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| LauncherError::Spawn {
            path: path.to_path_buf(),
            source: e,
        })?;
        match child.id() {
            Some(pid) => tracing::info!("Frontend process started with PID: {}", pid),
            None => tracing::info!("Frontend process started"),
        }

        Ok(Self {
            child,
            path: path.to_path_buf(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the front-end exits.
    pub async fn wait(mut self) -> Result<ExitStatus, LauncherError> {
        let status = self.child.wait().await.map_err(LauncherError::Wait)?;
        if status.success() {
            tracing::info!("Frontend {} exited", self.path.display());
        } else {
            tracing::warn!("Frontend {} exited with {}", self.path.display(), status);
        }
        Ok(status)
    }
}

/// 포트 선점 시도. 이미 사용 중이면 다른 인스턴스가 서비스 중이라고 보고 None
pub async fn try_bind(addr: &str) -> Option<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Some(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::info!("Port {} already in use, assuming server is running", addr);
            None
        }
        Err(e) => {
            tracing::warn!("Could not bind {}: {}, assuming server is running elsewhere", addr, e);
            None
        }
    }
}
