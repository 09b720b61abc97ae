//! 요청 단위 에러: 도구 실행 전에 요청을 거절하는 경우와 응답 인코딩 실패.
//!
//! 도구 실행 실패는 여기 속하지 않습니다. 그 경우는 200 응답의 `error`
//! 필드로 전달됩니다.

use axum::http::StatusCode;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("path contains a NUL byte")]
    NulByte,
}

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("Invalid request")]
    InvalidRequest(#[source] serde_json::Error),

    #[error("Invalid file path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Internal server error")]
    Encoding(#[source] serde_json::Error),
}

impl BridgeError {
    /// HTTP 상태 코드 매핑
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 본문은 plain text (프론트엔드가 기대하는 형식)
impl axum::response::IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
