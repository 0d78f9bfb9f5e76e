//! 교정 엔진 에러 타입
//!
//! [`RemedyError`]는 충돌 탐지와 자동 교정 과정에서 발생할 수 있는
//! 모든 에러를 나타냅니다. 백업 실패는 해당 매니페스트의 변경이
//! 시작되기 전에 중단되었음을 의미합니다 (fail-closed).

use depmend_core::error::{ConfigError, DepmendError, MutationError};

/// 교정 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RemedyError {
    /// 백업 생성/검증 실패 — 대상 매니페스트는 변경 전에 중단됨
    #[error("backup failed: {path}: {reason}")]
    Backup {
        /// 대상 매니페스트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 매니페스트 재작성 실패
    #[error("mutation failed: {path}: {reason}")]
    Mutate {
        /// 대상 매니페스트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 백업 복원 실패
    #[error("rollback failed: {path}: {reason}")]
    Rollback {
        /// 대상 매니페스트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<RemedyError> for DepmendError {
    fn from(err: RemedyError) -> Self {
        match err {
            RemedyError::Backup { path, reason } => DepmendError::Mutation(
                MutationError::BackupFailed(format!("backup failed: {path}: {reason}")),
            ),
            RemedyError::Mutate { path, reason } => DepmendError::Mutation(
                MutationError::MutateFailed(format!("mutation failed: {path}: {reason}")),
            ),
            RemedyError::Rollback { path, reason } => DepmendError::Mutation(
                MutationError::RollbackFailed(format!("rollback failed: {path}: {reason}")),
            ),
            RemedyError::Config { field, reason } => {
                DepmendError::Config(ConfigError::InvalidValue { field, reason })
            }
            RemedyError::Io { path, source } => DepmendError::Mutation(
                MutationError::MutateFailed(format!("io error: {path}: {source}")),
            ),
        }
    }
}
