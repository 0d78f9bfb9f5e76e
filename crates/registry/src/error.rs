//! 레지스트리 클라이언트 에러 타입
//!
//! [`RegistryError`]는 레지스트리 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! 조회 실패 자체는 에러가 아니라 [`ResolveOutcome`](crate::client::ResolveOutcome)으로
//! 표현됩니다. 이 에러 타입은 클라이언트 구성/캐시/DB 로딩 실패에 사용됩니다.

use depmend_core::error::{DepmendError, ResolveError};

/// 레지스트리 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// HTTP 클라이언트 구성 실패
    #[error("client build error: {0}")]
    ClientBuild(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 디스크 캐시 읽기/쓰기 실패
    #[error("disk cache error: {path}: {reason}")]
    DiskCache {
        /// 캐시 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 어드바이저리 DB 로딩 실패
    #[error("advisory db load error: {path}: {reason}")]
    AdvisoryLoad {
        /// DB 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 어드바이저리 DB 파싱 실패
    #[error("advisory db parse error: {0}")]
    AdvisoryParse(String),
}

impl From<RegistryError> for DepmendError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ClientBuild(msg) => {
                DepmendError::Resolve(ResolveError::Unavailable(msg))
            }
            RegistryError::Config { field, reason } => DepmendError::Config(
                depmend_core::error::ConfigError::InvalidValue { field, reason },
            ),
            RegistryError::DiskCache { path, reason } => DepmendError::Resolve(
                ResolveError::CacheFailed(format!("disk cache error: {path}: {reason}")),
            ),
            RegistryError::AdvisoryLoad { path, reason } => DepmendError::Audit(
                depmend_core::error::AuditError::AdvisoryDb(format!(
                    "advisory db load error: {path}: {reason}"
                )),
            ),
            RegistryError::AdvisoryParse(msg) => {
                DepmendError::Audit(depmend_core::error::AuditError::AdvisoryDb(msg))
            }
        }
    }
}
