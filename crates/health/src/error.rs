//! 건강 검사 에러 타입

use depmend_core::error::{AuditError, ConfigError, DepmendError};

/// 건강 검사 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// 검사 수행 실패
    #[error("check failed: {category}: {reason}")]
    Check {
        /// 검사 카테고리
        category: String,
        /// 실패 사유
        reason: String,
    },

    /// 리포트 직렬화/기록 실패
    #[error("report write failed: {path}: {reason}")]
    ReportWrite {
        /// 리포트 경로
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
}

impl From<HealthError> for DepmendError {
    fn from(err: HealthError) -> Self {
        match err {
            HealthError::Check { category, reason } => DepmendError::Audit(
                AuditError::CheckFailed(format!("check failed: {category}: {reason}")),
            ),
            HealthError::ReportWrite { path, reason } => DepmendError::Audit(
                AuditError::ReportWrite(format!("report write failed: {path}: {reason}")),
            ),
            HealthError::Config { field, reason } => {
                DepmendError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
