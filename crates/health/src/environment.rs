//! 환경 검사 -- 매니페스트와 무관한 시스템 상태 점검
//!
//! 도구 버전 조회와 디스크 여유 공간은 외부 세계에 의존하므로
//! [`EnvironmentProbe`] capability로 추상화됩니다. 실제 구현은
//! `depmend-cli`에 있으며, 테스트는 가짜 프로브를 주입합니다.
//!
//! 레지스트리 도달성 검사는 주입된 해석기로 잘 알려진 패키지를 조회하여
//! 지연 시간과 도달 여부를 기록합니다.

use std::future::Future;
use std::path::Path;
use std::time::Instant;

use depmend_core::types::{CheckStatus, Ecosystem, HealthCheckResult};
use depmend_registry::BoxFuture;
use depmend_registry::client::{DynRegistryResolver, ResolveOutcome};

/// 환경 프로브 capability trait
pub trait EnvironmentProbe: Send + Sync {
    /// 생태계 도구의 버전 문자열을 조회합니다 (미설치면 None).
    fn tool_version(&self, ecosystem: Ecosystem) -> impl Future<Output = Option<String>> + Send;

    /// 경로가 속한 파일시스템의 여유 공간(MB)을 조회합니다 (조회 불가면 None).
    fn free_disk_mb(&self, path: &Path) -> impl Future<Output = Option<u64>> + Send;
}

/// dyn-compatible 환경 프로브 trait
pub trait DynEnvironmentProbe: Send + Sync {
    /// 생태계 도구의 버전 문자열을 조회합니다.
    fn tool_version(&self, ecosystem: Ecosystem) -> BoxFuture<'_, Option<String>>;

    /// 경로가 속한 파일시스템의 여유 공간(MB)을 조회합니다.
    fn free_disk_mb<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Option<u64>>;
}

/// EnvironmentProbe를 구현한 타입은 자동으로 DynEnvironmentProbe도 구현됩니다.
impl<T: EnvironmentProbe> DynEnvironmentProbe for T {
    fn tool_version(&self, ecosystem: Ecosystem) -> BoxFuture<'_, Option<String>> {
        Box::pin(EnvironmentProbe::tool_version(self, ecosystem))
    }

    fn free_disk_mb<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Option<u64>> {
        Box::pin(EnvironmentProbe::free_disk_mb(self, path))
    }
}

/// 레지스트리 도달성 검사에 쓰는 잘 알려진 패키지
const REACHABILITY_PROBE_PACKAGE: &str = "lodash";

/// 환경 검사 전체를 수행합니다.
///
/// - **ecosystem-tooling**: 스캔에 등장한 생태계의 도구 존재/버전
/// - **disk-space**: 백업 디렉토리 여유 공간 (프로브 불가 시 skipped)
/// - **registry-reachability**: 해석기 왕복 지연과 도달 여부
pub async fn environment_checks(
    probe: &dyn DynEnvironmentProbe,
    resolver: &dyn DynRegistryResolver,
    ecosystems: &[Ecosystem],
    backup_dir: &Path,
    min_free_disk_mb: u64,
) -> Vec<HealthCheckResult> {
    let mut results = Vec::new();

    // 도구 존재 검사
    let mut tooling = HealthCheckResult::healthy("ecosystem-tooling");
    for ecosystem in ecosystems {
        match probe.tool_version(*ecosystem).await {
            Some(version) => {
                tooling
                    .details
                    .insert(ecosystem.to_string(), version);
            }
            None => {
                tooling
                    .issues
                    .push(format!("{ecosystem} tooling not found on PATH"));
            }
        }
    }
    if !tooling.issues.is_empty() {
        tooling.status = CheckStatus::Warning;
    }
    results.push(tooling);

    // 디스크 여유 공간 검사
    let disk = match probe.free_disk_mb(backup_dir).await {
        Some(free_mb) => {
            let mut result = HealthCheckResult::healthy("disk-space");
            result
                .details
                .insert("free_mb".to_owned(), free_mb.to_string());
            result
                .details
                .insert("min_free_mb".to_owned(), min_free_disk_mb.to_string());
            if free_mb < min_free_disk_mb {
                result.status = CheckStatus::Error;
                result.issues.push(format!(
                    "only {free_mb} MB free at {}, need at least {min_free_disk_mb} MB",
                    backup_dir.display(),
                ));
            }
            result
        }
        None => HealthCheckResult::skipped("disk-space", "disk probe unavailable"),
    };
    results.push(disk);

    // 레지스트리 도달성 검사
    let started = Instant::now();
    let outcome = resolver
        .resolve(Ecosystem::Npm, REACHABILITY_PROBE_PACKAGE)
        .await;
    let latency_ms = started.elapsed().as_millis();

    let mut reachability = HealthCheckResult::healthy("registry-reachability");
    reachability
        .details
        .insert("latency_ms".to_owned(), latency_ms.to_string());
    let reachable = !matches!(outcome, ResolveOutcome::Unavailable { .. });
    reachability
        .details
        .insert("reachable".to_owned(), reachable.to_string());
    if !reachable {
        reachability.status = CheckStatus::Warning;
        reachability
            .issues
            .push("registry did not respond to reachability probe".to_owned());
    }
    results.push(reachability);

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use depmend_core::types::RegistryPackageInfo;
    use depmend_registry::client::RegistryResolver;

    /// 고정 응답 가짜 프로브
    struct FakeProbe {
        versions: Vec<(Ecosystem, String)>,
        free_mb: Option<u64>,
    }

    impl EnvironmentProbe for FakeProbe {
        async fn tool_version(&self, ecosystem: Ecosystem) -> Option<String> {
            self.versions
                .iter()
                .find(|(eco, _)| *eco == ecosystem)
                .map(|(_, v)| v.clone())
        }

        async fn free_disk_mb(&self, _path: &Path) -> Option<u64> {
            self.free_mb
        }
    }

    /// 고정 응답 가짜 해석기
    struct FakeResolver(ResolveOutcome);

    impl RegistryResolver for FakeResolver {
        async fn resolve(&self, _ecosystem: Ecosystem, _package: &str) -> ResolveOutcome {
            self.0.clone()
        }
    }

    fn found_outcome() -> ResolveOutcome {
        ResolveOutcome::Found(RegistryPackageInfo {
            name: "lodash".to_owned(),
            ecosystem: Ecosystem::Npm,
            latest: "4.17.21".to_owned(),
            available: vec!["4.17.21".to_owned()],
            deprecated: false,
        })
    }

    #[tokio::test]
    async fn all_checks_healthy_with_good_environment() {
        let probe = FakeProbe {
            versions: vec![(Ecosystem::Npm, "10.8.0".to_owned())],
            free_mb: Some(50_000),
        };
        let resolver = FakeResolver(found_outcome());

        let results = environment_checks(
            &probe,
            &resolver,
            &[Ecosystem::Npm],
            &PathBuf::from("/var/lib/depmend/backups"),
            100,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == CheckStatus::Healthy));

        let tooling = &results[0];
        assert_eq!(tooling.details.get("npm").map(String::as_str), Some("10.8.0"));

        let reachability = &results[2];
        assert_eq!(
            reachability.details.get("reachable").map(String::as_str),
            Some("true")
        );
        assert!(reachability.details.contains_key("latency_ms"));
    }

    #[tokio::test]
    async fn missing_tool_is_warning() {
        let probe = FakeProbe {
            versions: vec![],
            free_mb: Some(50_000),
        };
        let resolver = FakeResolver(found_outcome());

        let results = environment_checks(
            &probe,
            &resolver,
            &[Ecosystem::Go],
            &PathBuf::from("/tmp"),
            100,
        )
        .await;

        let tooling = &results[0];
        assert_eq!(tooling.status, CheckStatus::Warning);
        assert!(tooling.issues[0].contains("go tooling not found"));
    }

    #[tokio::test]
    async fn low_disk_space_is_error() {
        let probe = FakeProbe {
            versions: vec![],
            free_mb: Some(10),
        };
        let resolver = FakeResolver(found_outcome());

        let results =
            environment_checks(&probe, &resolver, &[], &PathBuf::from("/tmp"), 100).await;

        let disk = &results[1];
        assert_eq!(disk.status, CheckStatus::Error);
        assert!(disk.issues[0].contains("10 MB free"));
    }

    #[tokio::test]
    async fn unavailable_disk_probe_is_skipped() {
        let probe = FakeProbe {
            versions: vec![],
            free_mb: None,
        };
        let resolver = FakeResolver(found_outcome());

        let results =
            environment_checks(&probe, &resolver, &[], &PathBuf::from("/tmp"), 100).await;

        assert_eq!(results[1].status, CheckStatus::Skipped);
    }

    #[tokio::test]
    async fn unreachable_registry_is_warning() {
        let probe = FakeProbe {
            versions: vec![],
            free_mb: Some(50_000),
        };
        let resolver = FakeResolver(ResolveOutcome::Unavailable {
            reason: "connection refused".to_owned(),
        });

        let results =
            environment_checks(&probe, &resolver, &[], &PathBuf::from("/tmp"), 100).await;

        let reachability = &results[2];
        assert_eq!(reachability.status, CheckStatus::Warning);
        assert_eq!(
            reachability.details.get("reachable").map(String::as_str),
            Some("false")
        );
    }
}
