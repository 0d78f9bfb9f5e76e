//! 설정 관리 — depmend.toml 파싱 및 런타임 설정
//!
//! [`DepmendConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DEPMEND_SCAN_ROOT=/app` 형식)
//! 3. 설정 파일 (`depmend.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), depmend_core::error::DepmendError> {
//! use depmend_core::config::DepmendConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DepmendConfig::load("depmend.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DepmendConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DepmendError};

/// Depmend 통합 설정
///
/// `depmend.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepmendConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 매니페스트 스캔 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 레지스트리 클라이언트 설정
    #[serde(default)]
    pub registry: RegistryConfig,
    /// 자동 교정 설정
    #[serde(default)]
    pub remedy: RemedyConfig,
    /// 건강 검사 설정
    #[serde(default)]
    pub health: HealthConfig,
}

impl DepmendConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DepmendError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DepmendError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepmendError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepmendError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepmendError> {
        toml::from_str(toml_str).map_err(|e| {
            DepmendError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEPMEND_{SECTION}_{FIELD}`
    /// 예: `DEPMEND_SCAN_ROOT=/srv/app`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEPMEND_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEPMEND_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "DEPMEND_GENERAL_DATA_DIR");
        override_string(&mut self.general.report_path, "DEPMEND_GENERAL_REPORT_PATH");

        // Scan
        override_string(&mut self.scan.root, "DEPMEND_SCAN_ROOT");
        override_csv(&mut self.scan.exclude_dirs, "DEPMEND_SCAN_EXCLUDE_DIRS");
        override_csv(
            &mut self.scan.exclude_ecosystems,
            "DEPMEND_SCAN_EXCLUDE_ECOSYSTEMS",
        );
        override_usize(&mut self.scan.max_file_size, "DEPMEND_SCAN_MAX_FILE_SIZE");
        override_usize(&mut self.scan.max_depth, "DEPMEND_SCAN_MAX_DEPTH");

        // Registry
        override_u64(&mut self.registry.timeout_secs, "DEPMEND_REGISTRY_TIMEOUT_SECS");
        override_u32(&mut self.registry.max_retries, "DEPMEND_REGISTRY_MAX_RETRIES");
        override_usize(&mut self.registry.concurrency, "DEPMEND_REGISTRY_CONCURRENCY");
        override_string(&mut self.registry.npm_base_url, "DEPMEND_REGISTRY_NPM_BASE_URL");
        override_string(
            &mut self.registry.crates_base_url,
            "DEPMEND_REGISTRY_CRATES_BASE_URL",
        );
        override_string(&mut self.registry.pypi_base_url, "DEPMEND_REGISTRY_PYPI_BASE_URL");
        override_string(
            &mut self.registry.goproxy_base_url,
            "DEPMEND_REGISTRY_GOPROXY_BASE_URL",
        );
        override_string(
            &mut self.registry.disk_cache_path,
            "DEPMEND_REGISTRY_DISK_CACHE_PATH",
        );
        override_u64(
            &mut self.registry.disk_cache_ttl_secs,
            "DEPMEND_REGISTRY_DISK_CACHE_TTL_SECS",
        );

        // Remedy
        override_bool(&mut self.remedy.enabled, "DEPMEND_REMEDY_ENABLED");
        override_string(&mut self.remedy.mode, "DEPMEND_REMEDY_MODE");
        override_string(&mut self.remedy.backup_dir, "DEPMEND_REMEDY_BACKUP_DIR");
        override_u64(&mut self.remedy.retention_days, "DEPMEND_REMEDY_RETENTION_DAYS");
        override_u64(
            &mut self.remedy.validation_timeout_secs,
            "DEPMEND_REMEDY_VALIDATION_TIMEOUT_SECS",
        );

        // Health
        override_string(
            &mut self.health.advisory_db_path,
            "DEPMEND_HEALTH_ADVISORY_DB_PATH",
        );
        override_string(&mut self.health.min_severity, "DEPMEND_HEALTH_MIN_SEVERITY");
        override_u64(
            &mut self.health.min_free_disk_mb,
            "DEPMEND_HEALTH_MIN_FREE_DISK_MB",
        );
        override_u64(
            &mut self.health.run_deadline_secs,
            "DEPMEND_HEALTH_RUN_DEADLINE_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DepmendError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // scan.root 검증
        if self.scan.root.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scan.root".to_owned(),
                reason: "root must not be empty".to_owned(),
            }
            .into());
        }

        if self.scan.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_depth".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        // 제외 생태계 이름 검증
        for eco in &self.scan.exclude_ecosystems {
            if crate::types::Ecosystem::from_str_loose(eco).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "scan.exclude_ecosystems".to_owned(),
                    reason: format!("unknown ecosystem '{eco}'"),
                }
                .into());
            }
        }

        // registry 검증
        if self.registry.timeout_secs == 0 || self.registry.timeout_secs > 600 {
            return Err(ConfigError::InvalidValue {
                field: "registry.timeout_secs".to_owned(),
                reason: "must be 1-600".to_owned(),
            }
            .into());
        }

        if self.registry.concurrency == 0 || self.registry.concurrency > 64 {
            return Err(ConfigError::InvalidValue {
                field: "registry.concurrency".to_owned(),
                reason: "must be 1-64".to_owned(),
            }
            .into());
        }

        if self.registry.max_retries > 10 {
            return Err(ConfigError::InvalidValue {
                field: "registry.max_retries".to_owned(),
                reason: "must be 0-10".to_owned(),
            }
            .into());
        }

        // remedy 검증
        if crate::types::RemediationMode::from_str_loose(&self.remedy.mode).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "remedy.mode".to_owned(),
                reason: "must be one of: conservative, aggressive, security-only".to_owned(),
            }
            .into());
        }

        if self.remedy.retention_days == 0 || self.remedy.retention_days > 365 {
            return Err(ConfigError::InvalidValue {
                field: "remedy.retention_days".to_owned(),
                reason: "must be 1-365".to_owned(),
            }
            .into());
        }

        if self.remedy.enabled && self.remedy.backup_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remedy.backup_dir".to_owned(),
                reason: "backup_dir must not be empty when remedy is enabled".to_owned(),
            }
            .into());
        }

        if self.remedy.validation_timeout_secs == 0 || self.remedy.validation_timeout_secs > 3600 {
            return Err(ConfigError::InvalidValue {
                field: "remedy.validation_timeout_secs".to_owned(),
                reason: "must be 1-3600".to_owned(),
            }
            .into());
        }

        // health 검증
        if crate::types::Severity::from_str_loose(&self.health.min_severity).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "health.min_severity".to_owned(),
                reason: "must be one of: low, moderate, high, critical".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리 (백업/캐시 기본 위치)
    pub data_dir: String,
    /// 건강 리포트 출력 경로
    pub report_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/depmend".to_owned(),
            report_path: "/var/lib/depmend/health-report.json".to_owned(),
        }
    }
}

/// 매니페스트 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 스캔 루트 디렉토리
    pub root: String,
    /// 건너뛸 디렉토리 이름 (vendored/설치 산출물)
    pub exclude_dirs: Vec<String>,
    /// 제외할 생태계 목록
    pub exclude_ecosystems: Vec<String>,
    /// 매니페스트 최대 허용 크기 (바이트)
    pub max_file_size: usize,
    /// 최대 탐색 깊이
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: ".".to_owned(),
            exclude_dirs: vec![
                "node_modules".to_owned(),
                "target".to_owned(),
                "vendor".to_owned(),
                ".git".to_owned(),
                ".venv".to_owned(),
                "venv".to_owned(),
                "__pycache__".to_owned(),
                "dist".to_owned(),
                "build".to_owned(),
            ],
            exclude_ecosystems: Vec::new(),
            max_file_size: 5 * 1024 * 1024, // 5 MB
            max_depth: 16,
        }
    }
}

/// 레지스트리 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 개별 레지스트리 호출 타임아웃 (초)
    pub timeout_secs: u64,
    /// 재시도 횟수 (총 시도 = max_retries + 1)
    pub max_retries: u32,
    /// 동시 해석 작업 상한
    pub concurrency: usize,
    /// NPM 레지스트리 베이스 URL
    pub npm_base_url: String,
    /// crates.io API 베이스 URL
    pub crates_base_url: String,
    /// PyPI JSON API 베이스 URL
    pub pypi_base_url: String,
    /// Go module proxy 베이스 URL
    pub goproxy_base_url: String,
    /// 디스크 캐시 파일 경로 (빈 문자열이면 비활성)
    pub disk_cache_path: String,
    /// 디스크 캐시 TTL (초)
    pub disk_cache_ttl_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            concurrency: 5,
            npm_base_url: "https://registry.npmjs.org".to_owned(),
            crates_base_url: "https://crates.io".to_owned(),
            pypi_base_url: "https://pypi.org".to_owned(),
            goproxy_base_url: "https://proxy.golang.org".to_owned(),
            disk_cache_path: String::new(),
            disk_cache_ttl_secs: 3600, // 1 hour
        }
    }
}

/// 자동 교정 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemedyConfig {
    /// 매니페스트 변경 허용 여부 (false면 탐지/감사만 수행)
    pub enabled: bool,
    /// 교정 모드 (conservative, aggressive, security-only)
    pub mode: String,
    /// 백업 디렉토리
    pub backup_dir: String,
    /// 백업 보존 기간 (일)
    pub retention_days: u64,
    /// 검증 명령 타임아웃 (초)
    pub validation_timeout_secs: u64,
}

impl Default for RemedyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: "conservative".to_owned(),
            backup_dir: "/var/lib/depmend/backups".to_owned(),
            retention_days: 7,
            validation_timeout_secs: 300,
        }
    }
}

/// 건강 검사 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// 로컬 어드바이저리 DB 디렉토리
    pub advisory_db_path: String,
    /// 리포트에 포함할 최소 심각도 (low, moderate, high, critical)
    pub min_severity: String,
    /// 백업 디렉토리 최소 여유 공간 (MB)
    pub min_free_disk_mb: u64,
    /// 런 전체 데드라인 (초, 0이면 무제한)
    pub run_deadline_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            advisory_db_path: "/var/lib/depmend/advisory-db".to_owned(),
            min_severity: "low".to_owned(),
            min_free_disk_mb: 100,
            run_deadline_secs: 0,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
