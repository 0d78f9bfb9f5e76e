//! 교정 엔진 설정
//!
//! [`RemediationConfig`]는 core의 [`RemedyConfig`](depmend_core::config::RemedyConfig)를
//! 강타입으로 변환한 모듈 설정입니다.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use depmend_core::types::RemediationMode;

use crate::error::RemedyError;

/// 백업 보존 기간 상한 (일)
const MAX_RETENTION_DAYS: u64 = 365;

/// 검증 타임아웃 상한 (초)
const MAX_VALIDATION_TIMEOUT_SECS: u64 = 3600;

/// 교정 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationConfig {
    /// 교정 모드
    pub mode: RemediationMode,
    /// 백업 디렉토리
    pub backup_dir: PathBuf,
    /// 백업 보존 기간 (일)
    pub retention_days: u64,
    /// 검증 명령 타임아웃 (초)
    pub validation_timeout_secs: u64,
    /// 동시 매니페스트 처리 상한
    pub concurrency: usize,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        let core = depmend_core::config::RemedyConfig::default();
        Self {
            mode: RemediationMode::default(),
            backup_dir: PathBuf::from(core.backup_dir),
            retention_days: core.retention_days,
            validation_timeout_secs: core.validation_timeout_secs,
            concurrency: 5,
        }
    }
}

impl RemediationConfig {
    /// core의 `RemedyConfig`에서 엔진 설정을 생성합니다.
    ///
    /// 알 수 없는 모드 문자열은 conservative로 fallback합니다.
    pub fn from_core(core: &depmend_core::config::RemedyConfig) -> Self {
        let mode = RemediationMode::from_str_loose(&core.mode).unwrap_or_else(|| {
            tracing::warn!(mode = %core.mode, "unknown remediation mode, falling back to conservative");
            RemediationMode::Conservative
        });

        Self {
            mode,
            backup_dir: PathBuf::from(&core.backup_dir),
            retention_days: core.retention_days,
            validation_timeout_secs: core.validation_timeout_secs,
            ..Self::default()
        }
    }

    /// 백업 보존 기간을 `Duration`으로 반환합니다.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    /// 검증 타임아웃을 `Duration`으로 반환합니다.
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `backup_dir`: 비어있으면 안 됨
    /// - `retention_days`: 1-365
    /// - `validation_timeout_secs`: 1-3600
    /// - `concurrency`: 1-64
    pub fn validate(&self) -> Result<(), RemedyError> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(RemedyError::Config {
                field: "backup_dir".to_owned(),
                reason: "backup_dir must not be empty".to_owned(),
            });
        }

        if self.retention_days == 0 || self.retention_days > MAX_RETENTION_DAYS {
            return Err(RemedyError::Config {
                field: "retention_days".to_owned(),
                reason: format!("must be 1-{MAX_RETENTION_DAYS}"),
            });
        }

        if self.validation_timeout_secs == 0
            || self.validation_timeout_secs > MAX_VALIDATION_TIMEOUT_SECS
        {
            return Err(RemedyError::Config {
                field: "validation_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_VALIDATION_TIMEOUT_SECS}"),
            });
        }

        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(RemedyError::Config {
                field: "concurrency".to_owned(),
                reason: "must be 1-64".to_owned(),
            });
        }

        Ok(())
    }
}

/// [`RemediationConfig`] 빌더
#[derive(Default)]
pub struct RemediationConfigBuilder {
    config: RemediationConfig,
}

impl RemediationConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 교정 모드를 설정합니다.
    pub fn mode(mut self, mode: RemediationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// 백업 디렉토리를 설정합니다.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = dir.into();
        self
    }

    /// 백업 보존 기간(일)을 설정합니다.
    pub fn retention_days(mut self, days: u64) -> Self {
        self.config.retention_days = days;
        self
    }

    /// 검증 타임아웃(초)을 설정합니다.
    pub fn validation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.validation_timeout_secs = secs;
        self
    }

    /// 동시 처리 상한을 설정합니다.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `RemedyError::Config` 반환
    pub fn build(self) -> Result<RemediationConfig, RemedyError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RemediationConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_parses_mode() {
        let core = depmend_core::config::RemedyConfig {
            mode: "security-only".to_owned(),
            backup_dir: "/tmp/backups".to_owned(),
            retention_days: 14,
            ..Default::default()
        };
        let config = RemediationConfig::from_core(&core);
        assert_eq!(config.mode, RemediationMode::SecurityOnly);
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/backups"));
        assert_eq!(config.retention_days, 14);
    }

    #[test]
    fn from_core_unknown_mode_falls_back() {
        let core = depmend_core::config::RemedyConfig {
            mode: "unknown".to_owned(),
            ..Default::default()
        };
        let config = RemediationConfig::from_core(&core);
        assert_eq!(config.mode, RemediationMode::Conservative);
    }

    #[test]
    fn retention_duration_conversion() {
        let config = RemediationConfig {
            retention_days: 7,
            ..Default::default()
        };
        assert_eq!(config.retention(), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn validate_rejects_empty_backup_dir() {
        let config = RemediationConfig {
            backup_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_retention() {
        let config = RemediationConfig {
            retention_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_timeout() {
        let config = RemediationConfig {
            validation_timeout_secs: 100_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = RemediationConfigBuilder::new()
            .mode(RemediationMode::Aggressive)
            .backup_dir("/tmp/b")
            .retention_days(3)
            .concurrency(2)
            .build()
            .unwrap();
        assert_eq!(config.mode, RemediationMode::Aggressive);
        assert_eq!(config.concurrency, 2);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = RemediationConfigBuilder::new().concurrency(0).build();
        assert!(result.is_err());
    }
}
