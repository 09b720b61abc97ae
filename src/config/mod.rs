use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 기본 설정 파일 위치 (`METYS_CONFIG`로 재정의)
const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOOL_PATH: &str = "./tools/radare2-5.9.8-w64/bin/radare2.exe";
pub const DEFAULT_TOOL_LABEL: &str = "radare2";
pub const DEFAULT_FRONTEND_NAME: &str = "AI-Disassembler.exe";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

/// 브리지 프로세스 전체 설정
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP 리스너 주소
    pub listen_addr: String,
    /// 외부 도구(radare2) 실행 파일 경로
    pub tool_path: String,
    /// 에러 메시지 접두사에 쓰이는 도구 이름
    pub tool_label: String,
    /// 도구 실행 제한 시간. None이면 무제한
    pub tool_timeout_secs: Option<u64>,
    /// 프론트엔드 실행 파일 이름 (기본 후보 목록 생성용)
    pub frontend_name: String,
    /// 프론트엔드 후보 경로. None이면 기본 탐색 순서 사용
    pub frontend_candidates: Option<Vec<PathBuf>>,
    /// true면 프론트엔드 없이 브리지 서버만 실행
    pub standalone: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            tool_path: DEFAULT_TOOL_PATH.to_string(),
            tool_label: DEFAULT_TOOL_LABEL.to_string(),
            tool_timeout_secs: None,
            frontend_name: DEFAULT_FRONTEND_NAME.to_string(),
            frontend_candidates: None,
            standalone: false,
        }
    }
}

impl BridgeConfig {
    /// `METYS_CONFIG` (또는 config/bridge.toml)을 읽고 환경 변수 재정의를 적용
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("METYS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file(Path::new(&path))?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// 파일이 없으면 기본값, 파싱 실패는 에러
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        let cfg = Self::from_toml_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// 환경 변수 재정의. 조회 함수를 주입받아 테스트에서 프로세스 환경을 건드리지 않음
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("METYS_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(tool) = lookup("METYS_TOOL_PATH") {
            self.tool_path = tool;
        }
        if let Some(secs) = lookup("METYS_TOOL_TIMEOUT_SECS") {
            let parsed = secs.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                key: "METYS_TOOL_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            self.tool_timeout_secs = if parsed == 0 { None } else { Some(parsed) };
        }
        if let Some(paths) = lookup("METYS_FRONTEND_PATHS") {
            let candidates: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !candidates.is_empty() {
                self.frontend_candidates = Some(candidates);
            }
        }
        if let Some(flag) = lookup("METYS_STANDALONE") {
            self.standalone = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// `None` when unset or 0.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
