//! 레지스트리 해석기 -- 생태계별 "패키지 정보 조회" 클라이언트
//!
//! [`RegistryResolver`] trait은 버전 해석 능력의 주입 지점입니다.
//! 충돌 탐지기와 건강 검사기는 이 trait에만 의존하므로 테스트에서
//! 가짜 해석기를 주입할 수 있습니다.
//!
//! [`HttpRegistryClient`]는 실제 레지스트리 구현입니다:
//!
//! | 생태계 | 엔드포인트 |
//! |--------|-----------|
//! | npm    | `GET {base}/{package}` |
//! | cargo  | `GET {base}/api/v1/crates/{package}` |
//! | pip/pipenv | `GET {base}/pypi/{package}/json` |
//! | go     | `GET {base}/{module}/@v/list` + `GET {base}/{module}/@latest` |
//!
//! 네트워크 호출은 고정 상한까지 지수 백오프로 재시도되며, 타임아웃이나
//! 비정상 응답은 호출자를 넘어 던져지지 않고 [`ResolveOutcome::Unavailable`]로
//! 반환됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use depmend_core::metrics as m;
use depmend_core::types::{Ecosystem, RegistryPackageInfo};

use crate::config::RegistryClientConfig;
use crate::error::RegistryError;
use crate::version;

/// dyn 호환 보조용 boxed future 타입
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 해석 결과 — 실패도 타입으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResolveOutcome {
    /// 패키지 정보 조회 성공
    Found(RegistryPackageInfo),
    /// 레지스트리에 해당 패키지가 존재하지 않음
    NotFound,
    /// 일시적 실패 (네트워크/타임아웃/비정상 응답)
    Unavailable {
        /// 실패 사유
        reason: String,
    },
}

/// 버전 해석 capability trait
///
/// 구현체는 `resolve` 호출이 panic하거나 에러를 전파하지 않고
/// 항상 [`ResolveOutcome`]을 반환해야 합니다.
pub trait RegistryResolver: Send + Sync {
    /// 패키지의 레지스트리 정보를 해석합니다.
    fn resolve(
        &self,
        ecosystem: Ecosystem,
        package: &str,
    ) -> impl Future<Output = ResolveOutcome> + Send;
}

/// dyn-compatible 해석기 trait
///
/// `RegistryResolver`는 RPITIT를 사용하므로 `dyn RegistryResolver`가 불가합니다.
/// `DynRegistryResolver`는 `BoxFuture`를 반환하여 trait object로
/// 해석기를 주입할 수 있게 합니다.
pub trait DynRegistryResolver: Send + Sync {
    /// 패키지의 레지스트리 정보를 해석합니다.
    fn resolve<'a>(&'a self, ecosystem: Ecosystem, package: &'a str)
    -> BoxFuture<'a, ResolveOutcome>;
}

/// RegistryResolver를 구현한 타입은 자동으로 DynRegistryResolver도 구현됩니다.
impl<T: RegistryResolver> DynRegistryResolver for T {
    fn resolve<'a>(
        &'a self,
        ecosystem: Ecosystem,
        package: &'a str,
    ) -> BoxFuture<'a, ResolveOutcome> {
        Box::pin(RegistryResolver::resolve(self, ecosystem, package))
    }
}

/// HTTP 레지스트리 클라이언트
///
/// 생태계별 공개 레지스트리 API를 호출하여 최신/가용 버전과
/// deprecated 여부를 조회합니다.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    config: RegistryClientConfig,
}

impl HttpRegistryClient {
    /// 설정으로 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패 또는 HTTP 클라이언트 구성 실패 시 에러 반환
    pub fn new(config: RegistryClientConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("depmend/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| RegistryError::ClientBuild(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// 클라이언트 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &RegistryClientConfig {
        &self.config
    }

    /// 단일 조회를 수행합니다 (재시도 없음).
    ///
    /// `Ok(outcome)`은 레지스트리가 확정 응답한 경우(성공/404),
    /// `Err(reason)`은 재시도할 가치가 있는 일시적 실패입니다.
    async fn fetch_once(&self, ecosystem: Ecosystem, package: &str) -> Result<ResolveOutcome, String> {
        match ecosystem {
            Ecosystem::Npm => self.fetch_npm(package).await,
            Ecosystem::Cargo => self.fetch_crates(package).await,
            Ecosystem::Pip | Ecosystem::Pipenv => self.fetch_pypi(ecosystem, package).await,
            Ecosystem::Go => self.fetch_goproxy(package).await,
        }
    }

    async fn fetch_npm(&self, package: &str) -> Result<ResolveOutcome, String> {
        #[derive(Deserialize)]
        struct NpmPackage {
            #[serde(default, rename = "dist-tags")]
            dist_tags: HashMap<String, String>,
            #[serde(default)]
            versions: HashMap<String, NpmVersion>,
        }

        #[derive(Deserialize)]
        struct NpmVersion {
            #[serde(default)]
            deprecated: Option<serde_json::Value>,
        }

        let url = format!("{}/{}", self.config.npm_base_url, package);
        let Some(body) = self.get_json::<NpmPackage>(&url).await? else {
            return Ok(ResolveOutcome::NotFound);
        };

        let Some(latest) = body.dist_tags.get("latest").cloned() else {
            return Err(format!("npm response for '{package}' has no latest dist-tag"));
        };

        let deprecated = body
            .versions
            .get(&latest)
            .is_some_and(|v| v.deprecated.is_some());

        let mut available: Vec<String> = body.versions.into_keys().collect();
        version::sort_versions(&mut available);

        Ok(ResolveOutcome::Found(RegistryPackageInfo {
            name: package.to_owned(),
            ecosystem: Ecosystem::Npm,
            latest,
            available,
            deprecated,
        }))
    }

    async fn fetch_crates(&self, package: &str) -> Result<ResolveOutcome, String> {
        #[derive(Deserialize)]
        struct CratesResponse {
            #[serde(rename = "crate")]
            krate: CrateInfo,
            #[serde(default)]
            versions: Vec<CrateVersion>,
        }

        #[derive(Deserialize)]
        struct CrateInfo {
            max_version: String,
        }

        #[derive(Deserialize)]
        struct CrateVersion {
            num: String,
            #[serde(default)]
            yanked: bool,
        }

        let url = format!("{}/api/v1/crates/{}", self.config.crates_base_url, package);
        let Some(body) = self.get_json::<CratesResponse>(&url).await? else {
            return Ok(ResolveOutcome::NotFound);
        };

        let latest = body.krate.max_version;
        let deprecated = body
            .versions
            .iter()
            .find(|v| v.num == latest)
            .is_some_and(|v| v.yanked);

        let mut available: Vec<String> = body
            .versions
            .into_iter()
            .filter(|v| !v.yanked)
            .map(|v| v.num)
            .collect();
        version::sort_versions(&mut available);

        Ok(ResolveOutcome::Found(RegistryPackageInfo {
            name: package.to_owned(),
            ecosystem: Ecosystem::Cargo,
            latest,
            available,
            deprecated,
        }))
    }

    async fn fetch_pypi(
        &self,
        ecosystem: Ecosystem,
        package: &str,
    ) -> Result<ResolveOutcome, String> {
        #[derive(Deserialize)]
        struct PypiResponse {
            info: PypiInfo,
            #[serde(default)]
            releases: HashMap<String, serde_json::Value>,
        }

        #[derive(Deserialize)]
        struct PypiInfo {
            version: String,
            #[serde(default)]
            yanked: bool,
        }

        let url = format!("{}/pypi/{}/json", self.config.pypi_base_url, package);
        let Some(body) = self.get_json::<PypiResponse>(&url).await? else {
            return Ok(ResolveOutcome::NotFound);
        };

        let mut available: Vec<String> = body.releases.into_keys().collect();
        version::sort_versions(&mut available);

        Ok(ResolveOutcome::Found(RegistryPackageInfo {
            name: package.to_owned(),
            ecosystem,
            latest: body.info.version,
            available,
            deprecated: body.info.yanked,
        }))
    }

    async fn fetch_goproxy(&self, module: &str) -> Result<ResolveOutcome, String> {
        #[derive(Deserialize)]
        struct GoLatest {
            #[serde(rename = "Version")]
            version: String,
        }

        // 버전 목록과 latest를 각각 조회. 목록이 404면 모듈 자체가 없는 것
        let list_url = format!("{}/{}/@v/list", self.config.goproxy_base_url, module);
        let Some(list_body) = self.get_text(&list_url).await? else {
            return Ok(ResolveOutcome::NotFound);
        };

        let mut available: Vec<String> = list_body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();
        version::sort_versions(&mut available);

        let latest_url = format!("{}/{}/@latest", self.config.goproxy_base_url, module);
        let latest = match self.get_json::<GoLatest>(&latest_url).await? {
            Some(body) => body.version,
            // @latest가 없으면 목록의 최댓값 사용
            None => match available.last() {
                Some(v) => v.clone(),
                None => {
                    return Ok(ResolveOutcome::Found(RegistryPackageInfo {
                        name: module.to_owned(),
                        ecosystem: Ecosystem::Go,
                        latest: String::new(),
                        available,
                        deprecated: false,
                    }));
                }
            },
        };

        Ok(ResolveOutcome::Found(RegistryPackageInfo {
            name: module.to_owned(),
            ecosystem: Ecosystem::Go,
            latest,
            available,
            deprecated: false,
        }))
    }

    /// GET 후 JSON을 역직렬화합니다. 404는 `Ok(None)`으로 반환합니다.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, String> {
        let Some(text) = self.get_text(url).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| format!("invalid response from {url}: {e}"))
    }

    /// GET 후 본문 텍스트를 반환합니다. 404는 `Ok(None)`으로 반환합니다.
    async fn get_text(&self, url: &str) -> Result<Option<String>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("HTTP {status} from {url}"));
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| format!("failed to read body from {url}: {e}"))
    }
}

impl RegistryResolver for HttpRegistryClient {
    async fn resolve(&self, ecosystem: Ecosystem, package: &str) -> ResolveOutcome {
        let started = Instant::now();
        metrics::counter!(
            m::REGISTRY_LOOKUPS_TOTAL,
            m::LABEL_ECOSYSTEM => ecosystem.to_string()
        )
        .increment(1);

        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                metrics::counter!(m::REGISTRY_RETRIES_TOTAL).increment(1);
                tokio::time::sleep(self.config.backoff_delay(attempt - 1)).await;
            }

            match self.fetch_once(ecosystem, package).await {
                Ok(outcome) => {
                    debug!(
                        ecosystem = %ecosystem,
                        package,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "registry lookup completed"
                    );
                    metrics::histogram!(m::REGISTRY_LOOKUP_DURATION_SECONDS)
                        .record(started.elapsed().as_secs_f64());
                    return outcome;
                }
                Err(reason) => {
                    warn!(
                        ecosystem = %ecosystem,
                        package,
                        attempt,
                        error = %reason,
                        "registry lookup attempt failed"
                    );
                    last_error = reason;
                }
            }
        }

        metrics::histogram!(m::REGISTRY_LOOKUP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        ResolveOutcome::Unavailable { reason: last_error }
    }
}
