//! 매니페스트 스캐너 에러 타입
//!
//! [`ScannerError`]는 스캐너 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<ScannerError> for DepmendError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.

use depmend_core::error::{ConfigError, DepmendError, ScanError};

/// 매니페스트 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// 매니페스트 파싱 실패
    #[error("manifest parse error: {path}: {reason}")]
    ManifestParse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 대상 패키지가 매니페스트에 선언되어 있지 않음
    #[error("package not declared: {package} in {path}")]
    PackageNotDeclared {
        /// 매니페스트 경로
        path: String,
        /// 패키지 이름
        package: String,
    },

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
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

impl From<ScannerError> for DepmendError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::ManifestParse { path, reason } => DepmendError::Scan(
                ScanError::ParseFailed(format!("manifest parse error: {path}: {reason}")),
            ),
            ScannerError::PackageNotDeclared { path, package } => DepmendError::Scan(
                ScanError::ParseFailed(format!("package not declared: {package} in {path}")),
            ),
            ScannerError::FileTooBig { path, size, max } => DepmendError::Scan(
                ScanError::WalkFailed(format!("file too large: {path}: {size} bytes (max: {max})")),
            ),
            ScannerError::Config { field, reason } => {
                DepmendError::Config(ConfigError::InvalidValue { field, reason })
            }
            ScannerError::Io { path, source } => {
                DepmendError::Scan(ScanError::WalkFailed(format!("io error: {path}: {source}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parse_error_display() {
        let err = ScannerError::ManifestParse {
            path: "package.json".to_owned(),
            reason: "invalid JSON".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("package.json"));
        assert!(msg.contains("invalid JSON"));
    }

    #[test]
    fn package_not_declared_display() {
        let err = ScannerError::PackageNotDeclared {
            path: "Cargo.toml".to_owned(),
            package: "serde".to_owned(),
        };
        assert!(err.to_string().contains("serde"));
        assert!(err.to_string().contains("Cargo.toml"));
    }

    #[test]
    fn file_too_big_display() {
        let err = ScannerError::FileTooBig {
            path: "package.json".to_owned(),
            size: 20_000_000,
            max: 5_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000000"));
        assert!(msg.contains("5000000"));
    }

    #[test]
    fn converts_to_depmend_error_parse() {
        let err = ScannerError::ManifestParse {
            path: "x".to_owned(),
            reason: "bad".to_owned(),
        };
        let depmend_err: DepmendError = err.into();
        assert!(matches!(
            depmend_err,
            DepmendError::Scan(ScanError::ParseFailed(_))
        ));
    }

    #[test]
    fn converts_to_depmend_error_config() {
        let err = ScannerError::Config {
            field: "max_depth".to_owned(),
            reason: "must be at least 1".to_owned(),
        };
        let depmend_err: DepmendError = err.into();
        assert!(matches!(depmend_err, DepmendError::Config(_)));
    }
}
