//! 건강 검사 설정
//!
//! [`HealthCheckConfig`]는 core의 [`HealthConfig`](depmend_core::config::HealthConfig)를
//! 강타입으로 변환한 모듈 설정입니다.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use depmend_core::types::Severity;

use crate::error::HealthError;

/// 건강 검사 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// 로컬 어드바이저리 DB 디렉토리
    pub advisory_db_path: PathBuf,
    /// 리포트에 포함할 최소 심각도
    pub min_severity: Severity,
    /// 백업 디렉토리 최소 여유 공간 (MB)
    pub min_free_disk_mb: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        let core = depmend_core::config::HealthConfig::default();
        Self {
            advisory_db_path: PathBuf::from(core.advisory_db_path),
            min_severity: Severity::Low,
            min_free_disk_mb: core.min_free_disk_mb,
        }
    }
}

impl HealthCheckConfig {
    /// core의 `HealthConfig`에서 검사 설정을 생성합니다.
    ///
    /// 알 수 없는 심각도 문자열은 Low로 fallback합니다.
    pub fn from_core(core: &depmend_core::config::HealthConfig) -> Self {
        let min_severity = Severity::from_str_loose(&core.min_severity).unwrap_or_else(|| {
            tracing::warn!(severity = %core.min_severity, "unknown min_severity, falling back to low");
            Severity::Low
        });

        Self {
            advisory_db_path: PathBuf::from(&core.advisory_db_path),
            min_severity,
            min_free_disk_mb: core.min_free_disk_mb,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HealthError> {
        if self.advisory_db_path.as_os_str().is_empty() {
            return Err(HealthError::Config {
                field: "advisory_db_path".to_owned(),
                reason: "advisory_db_path must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// [`HealthCheckConfig`] 빌더
#[derive(Default)]
pub struct HealthCheckConfigBuilder {
    config: HealthCheckConfig,
}

impl HealthCheckConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 어드바이저리 DB 경로를 설정합니다.
    pub fn advisory_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.advisory_db_path = path.into();
        self
    }

    /// 최소 심각도를 설정합니다.
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.config.min_severity = severity;
        self
    }

    /// 최소 여유 공간(MB)을 설정합니다.
    pub fn min_free_disk_mb(mut self, mb: u64) -> Self {
        self.config.min_free_disk_mb = mb;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<HealthCheckConfig, HealthError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        HealthCheckConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_parses_severity() {
        let core = depmend_core::config::HealthConfig {
            min_severity: "high".to_owned(),
            ..Default::default()
        };
        let config = HealthCheckConfig::from_core(&core);
        assert_eq!(config.min_severity, Severity::High);
    }

    #[test]
    fn from_core_unknown_severity_falls_back() {
        let core = depmend_core::config::HealthConfig {
            min_severity: "apocalyptic".to_owned(),
            ..Default::default()
        };
        let config = HealthCheckConfig::from_core(&core);
        assert_eq!(config.min_severity, Severity::Low);
    }

    #[test]
    fn validate_rejects_empty_db_path() {
        let config = HealthCheckConfig {
            advisory_db_path: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = HealthCheckConfigBuilder::new()
            .advisory_db_path("/tmp/advisories")
            .min_severity(Severity::Moderate)
            .min_free_disk_mb(50)
            .build()
            .unwrap();
        assert_eq!(config.min_severity, Severity::Moderate);
        assert_eq!(config.min_free_disk_mb, 50);
    }
}
