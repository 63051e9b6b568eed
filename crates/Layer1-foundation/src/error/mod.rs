//! Error types for BotHarbor
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// BotHarbor 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    /// 레지스트리 파일을 파싱할 수 없음 - 빈 상태로 복구됨
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    // ========================================================================
    // 봇/스크립트 관련
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    // ========================================================================
    // 프로세스 관련
    // ========================================================================
    #[error("Spawn failed: {0}")]
    Spawn(String),

    /// 종료 시그널 전달 실패 - stop에서는 이미 종료된 것으로 처리
    #[error("Signal delivery failed: {0}")]
    Signal(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    ///
    /// 나머지는 전부 내부적으로 복구되거나 "stopped/absent" 로 강등된다.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidName(_))
    }

    /// NotFound 에러 생성 헬퍼
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// InvalidName 에러 생성 헬퍼
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidName(format!("{}: {}", name.into(), reason.into()))
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
