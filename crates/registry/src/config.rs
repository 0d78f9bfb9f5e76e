//! 레지스트리 클라이언트 설정
//!
//! [`RegistryClientConfig`]는 core의 [`RegistryConfig`](depmend_core::config::RegistryConfig)를
//! 강타입으로 변환한 모듈 설정입니다. 테스트에서는 베이스 URL을 목 서버로
//! 교체할 수 있습니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// 타임아웃 상한 (초)
const MAX_TIMEOUT_SECS: u64 = 600;

/// 재시도 횟수 상한
const MAX_RETRIES_LIMIT: u32 = 10;

/// 레지스트리 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryClientConfig {
    /// 개별 호출 타임아웃 (초)
    pub timeout_secs: u64,
    /// 재시도 횟수 (총 시도 = max_retries + 1)
    pub max_retries: u32,
    /// 재시도 백오프 기본 지연 (밀리초). 시도마다 2배씩 증가
    pub backoff_base_ms: u64,
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

impl Default for RegistryClientConfig {
    fn default() -> Self {
        let core = depmend_core::config::RegistryConfig::default();
        Self {
            timeout_secs: core.timeout_secs,
            max_retries: core.max_retries,
            backoff_base_ms: 250,
            npm_base_url: core.npm_base_url,
            crates_base_url: core.crates_base_url,
            pypi_base_url: core.pypi_base_url,
            goproxy_base_url: core.goproxy_base_url,
            disk_cache_path: core.disk_cache_path,
            disk_cache_ttl_secs: core.disk_cache_ttl_secs,
        }
    }
}

impl RegistryClientConfig {
    /// core의 `RegistryConfig`에서 클라이언트 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드(백오프 지연)는 기본값을 사용합니다.
    pub fn from_core(core: &depmend_core::config::RegistryConfig) -> Self {
        Self {
            timeout_secs: core.timeout_secs,
            max_retries: core.max_retries,
            npm_base_url: core.npm_base_url.clone(),
            crates_base_url: core.crates_base_url.clone(),
            pypi_base_url: core.pypi_base_url.clone(),
            goproxy_base_url: core.goproxy_base_url.clone(),
            disk_cache_path: core.disk_cache_path.clone(),
            disk_cache_ttl_secs: core.disk_cache_ttl_secs,
            ..Self::default()
        }
    }

    /// 개별 호출 타임아웃을 `Duration`으로 반환합니다.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// n번째 시도의 백오프 지연을 반환합니다 (지수 증가).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1 << attempt.min(8)))
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `timeout_secs`: 1-600
    /// - `max_retries`: 0-10
    /// - 베이스 URL: 비어있으면 안 됨, `http(s)://`로 시작
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(RegistryError::Config {
                field: "timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(RegistryError::Config {
                field: "max_retries".to_owned(),
                reason: format!("must be 0-{MAX_RETRIES_LIMIT}"),
            });
        }

        for (field, url) in [
            ("npm_base_url", &self.npm_base_url),
            ("crates_base_url", &self.crates_base_url),
            ("pypi_base_url", &self.pypi_base_url),
            ("goproxy_base_url", &self.goproxy_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RegistryError::Config {
                    field: field.to_owned(),
                    reason: format!("must start with http:// or https://, got '{url}'"),
                });
            }
        }

        Ok(())
    }
}

/// [`RegistryClientConfig`] 빌더
#[derive(Default)]
pub struct RegistryClientConfigBuilder {
    config: RegistryClientConfig,
}

impl RegistryClientConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 호출 타임아웃(초)을 설정합니다.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// 재시도 횟수를 설정합니다.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// 백오프 기본 지연(밀리초)을 설정합니다.
    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.config.backoff_base_ms = ms;
        self
    }

    /// NPM 베이스 URL을 설정합니다.
    pub fn npm_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.npm_base_url = url.into();
        self
    }

    /// crates.io 베이스 URL을 설정합니다.
    pub fn crates_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.crates_base_url = url.into();
        self
    }

    /// PyPI 베이스 URL을 설정합니다.
    pub fn pypi_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.pypi_base_url = url.into();
        self
    }

    /// Go proxy 베이스 URL을 설정합니다.
    pub fn goproxy_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.goproxy_base_url = url.into();
        self
    }

    /// 디스크 캐시 경로를 설정합니다.
    pub fn disk_cache_path(mut self, path: impl Into<String>) -> Self {
        self.config.disk_cache_path = path.into();
        self
    }

    /// 디스크 캐시 TTL(초)을 설정합니다.
    pub fn disk_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.disk_cache_ttl_secs = secs;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `RegistryError::Config` 반환
    pub fn build(self) -> Result<RegistryClientConfig, RegistryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
