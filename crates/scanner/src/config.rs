//! 매니페스트 스캐너 설정
//!
//! [`ScannerConfig`]는 core의 [`ScanConfig`](depmend_core::config::ScanConfig)를
//! 강타입으로 변환한 모듈 설정입니다.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use depmend_core::types::Ecosystem;

use crate::error::ScannerError;

/// 매니페스트 최대 크기 상한 (100 MB)
const MAX_FILE_SIZE_LIMIT: usize = 100 * 1024 * 1024;

/// 탐색 깊이 상한
const MAX_DEPTH_LIMIT: usize = 64;

/// 매니페스트 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 스캔 루트 디렉토리
    pub root: PathBuf,
    /// 건너뛸 디렉토리 이름 목록 (vendored/설치 산출물)
    pub exclude_dirs: Vec<String>,
    /// 제외할 생태계 목록
    pub exclude_ecosystems: Vec<Ecosystem>,
    /// 매니페스트 최대 허용 크기 (바이트)
    pub max_file_size: usize,
    /// 최대 탐색 깊이
    pub max_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let core = depmend_core::config::ScanConfig::default();
        Self {
            root: PathBuf::from(core.root),
            exclude_dirs: core.exclude_dirs,
            exclude_ecosystems: Vec::new(),
            max_file_size: core.max_file_size,
            max_depth: core.max_depth,
        }
    }
}

impl ScannerConfig {
    /// core의 `ScanConfig`에서 스캐너 설정을 생성합니다.
    ///
    /// 알 수 없는 생태계 이름은 무시하고 경고를 남깁니다.
    pub fn from_core(core: &depmend_core::config::ScanConfig) -> Self {
        let exclude_ecosystems = core
            .exclude_ecosystems
            .iter()
            .filter_map(|name| {
                let parsed = Ecosystem::from_str_loose(name);
                if parsed.is_none() {
                    tracing::warn!(ecosystem = %name, "unknown ecosystem in exclude list, ignoring");
                }
                parsed
            })
            .collect();

        Self {
            root: PathBuf::from(&core.root),
            exclude_dirs: core.exclude_dirs.clone(),
            exclude_ecosystems,
            max_file_size: core.max_file_size,
            max_depth: core.max_depth,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `root`: 비어있으면 안 됨
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - `max_depth`: 1-64
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.root.as_os_str().is_empty() {
            return Err(ScannerError::Config {
                field: "root".to_owned(),
                reason: "root must not be empty".to_owned(),
            });
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE_LIMIT {
            return Err(ScannerError::Config {
                field: "max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE_LIMIT}"),
            });
        }

        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ScannerError::Config {
                field: "max_depth".to_owned(),
                reason: format!("must be 1-{MAX_DEPTH_LIMIT}"),
            });
        }

        Ok(())
    }
}

/// [`ScannerConfig`] 빌더
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 스캔 루트를 설정합니다.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// 제외 디렉토리 목록을 설정합니다.
    pub fn exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.config.exclude_dirs = dirs;
        self
    }

    /// 제외 생태계 목록을 설정합니다.
    pub fn exclude_ecosystems(mut self, ecosystems: Vec<Ecosystem>) -> Self {
        self.config.exclude_ecosystems = ecosystems;
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 최대 탐색 깊이를 설정합니다.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ScannerError::Config` 반환
    pub fn build(self) -> Result<ScannerConfig, ScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ScannerConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = depmend_core::config::ScanConfig {
            root: "/srv/app".to_owned(),
            exclude_dirs: vec!["node_modules".to_owned()],
            exclude_ecosystems: vec!["go".to_owned()],
            max_file_size: 1024,
            max_depth: 4,
        };
        let config = ScannerConfig::from_core(&core);
        assert_eq!(config.root, PathBuf::from("/srv/app"));
        assert_eq!(config.exclude_dirs, vec!["node_modules"]);
        assert_eq!(config.exclude_ecosystems, vec![Ecosystem::Go]);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn from_core_ignores_unknown_ecosystem() {
        let core = depmend_core::config::ScanConfig {
            exclude_ecosystems: vec!["maven".to_owned(), "npm".to_owned()],
            ..Default::default()
        };
        let config = ScannerConfig::from_core(&core);
        assert_eq!(config.exclude_ecosystems, vec![Ecosystem::Npm]);
    }

    #[test]
    fn validate_rejects_empty_root() {
        let config = ScannerConfig {
            root: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_file_size() {
        let config = ScannerConfig {
            max_file_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_depth() {
        let config = ScannerConfig {
            max_depth: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = ScannerConfigBuilder::new()
            .root("/app")
            .max_depth(8)
            .max_file_size(1024 * 1024)
            .build()
            .unwrap();
        assert_eq!(config.root, PathBuf::from("/app"));
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = ScannerConfigBuilder::new().max_depth(0).build();
        assert!(result.is_err());
    }
}
