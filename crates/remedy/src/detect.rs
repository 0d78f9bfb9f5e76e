//! 충돌 탐지기 -- 선언된 제약과 레지스트리 현실의 대조
//!
//! [`ConflictDetector`]는 모든 의존성 선언을 주입된 해석기로 조회하여
//! 레지스트리가 확인해 준 문제만 [`Conflict`]로 분류합니다:
//!
//! - `NotFound`: 레지스트리에 패키지가 없음
//! - `NoVersionsAvailable`: 패키지는 있으나 버전 목록이 비어 있음
//! - `RequestedVersionUnavailable`: 요청 기준 버전과 최신 버전이 모두
//!   알려진 버전 집합에 없음 (정확/접두 일치 휴리스틱)
//!
//! 일시적 해석 실패는 충돌이 아니라 [`UnresolvedDeclaration`]으로
//! 런 로그에 기록되고 해당 선언은 건너뜁니다.
//!
//! 해석은 세마포어로 제한된 워커 풀에서 병렬 수행되며, 출력은 수집 후
//! (매니페스트 경로, 패키지 이름) 순으로 정렬되어 완료 순서와 무관하게
//! 결정적입니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use depmend_core::metrics as m;
use depmend_core::types::{
    Conflict, ConflictKind, DependencyDeclaration, Ecosystem, RegistryPackageInfo,
    UnresolvedDeclaration, base_version,
};
use depmend_registry::client::{RegistryResolver, ResolveOutcome};

/// 탐지 결과
#[derive(Debug, Clone, Default)]
pub struct DetectionOutput {
    /// 레지스트리가 확인한 충돌 (manifest_path, name 순 정렬)
    pub conflicts: Vec<Conflict>,
    /// 일시적 해석 실패로 건너뛴 선언
    pub unresolved: Vec<UnresolvedDeclaration>,
    /// 성공적으로 해석된 패키지 정보 — 교정/감사 단계에서 재사용
    pub resolved: BTreeMap<(Ecosystem, String), RegistryPackageInfo>,
}

/// 충돌 탐지기
///
/// 해석기를 주입받아 선언 목록을 분류합니다. 해석기는 보통
/// [`CachedResolver`](depmend_registry::CachedResolver)로 감싸져
/// 패키지당 한 번만 아웃바운드 조회가 발생합니다.
pub struct ConflictDetector<R> {
    resolver: Arc<R>,
    concurrency: usize,
}

impl<R: RegistryResolver + 'static> ConflictDetector<R> {
    /// 탐지기를 생성합니다.
    ///
    /// `concurrency`는 동시 해석 작업 상한입니다 (기본 권장값 5).
    pub fn new(resolver: Arc<R>, concurrency: usize) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// 선언 목록을 해석하고 충돌을 분류합니다.
    ///
    /// 동일 런에서 두 번 수행해도 (레지스트리 스냅샷이 같다면)
    /// 동일하고 동일하게 정렬된 충돌 목록이 나옵니다.
    pub async fn detect(&self, declarations: &[DependencyDeclaration]) -> DetectionOutput {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for decl in declarations {
            let decl = decl.clone();
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);
            let ecosystem = manifest_ecosystem(&decl);

            tasks.spawn(async move {
                // 세마포어가 닫히는 일은 없으므로 acquire 실패는 발생하지 않음
                let _permit = semaphore.acquire_owned().await;
                let outcome = resolver.resolve(ecosystem, &decl.name).await;
                (decl, ecosystem, outcome)
            });
        }

        let mut output = DetectionOutput::default();

        while let Some(joined) = tasks.join_next().await {
            let (decl, ecosystem, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "resolution task panicked");
                    continue;
                }
            };

            match outcome {
                ResolveOutcome::Found(info) => {
                    if let Some(conflict) = classify_found(&decl, &info) {
                        metrics::counter!(
                            m::DETECT_CONFLICTS_TOTAL,
                            m::LABEL_ECOSYSTEM => ecosystem.to_string()
                        )
                        .increment(1);
                        output.conflicts.push(conflict);
                    }
                    output.resolved.insert((ecosystem, decl.name.clone()), info);
                }
                ResolveOutcome::NotFound => {
                    metrics::counter!(
                        m::DETECT_CONFLICTS_TOTAL,
                        m::LABEL_ECOSYSTEM => ecosystem.to_string()
                    )
                    .increment(1);
                    output.conflicts.push(Conflict {
                        manifest_path: decl.manifest_path.clone(),
                        name: decl.name.clone(),
                        requested: decl.requested.clone(),
                        available_latest: None,
                        kind: ConflictKind::NotFound,
                    });
                }
                ResolveOutcome::Unavailable { reason } => {
                    debug!(
                        package = %decl.name,
                        error = %reason,
                        "declaration skipped: resolver unavailable"
                    );
                    metrics::counter!(m::DETECT_UNRESOLVED_TOTAL).increment(1);
                    output.unresolved.push(UnresolvedDeclaration {
                        manifest_path: decl.manifest_path.clone(),
                        package: decl.name.clone(),
                        reason,
                    });
                }
            }
        }

        // 완료 순서와 무관한 결정적 출력
        output
            .conflicts
            .sort_by(|a, b| (&a.manifest_path, &a.name).cmp(&(&b.manifest_path, &b.name)));
        output
            .unresolved
            .sort_by(|a, b| (&a.manifest_path, &a.package).cmp(&(&b.manifest_path, &b.package)));

        output
    }
}

/// 선언의 매니페스트 파일명에서 생태계를 판별합니다.
fn manifest_ecosystem(decl: &DependencyDeclaration) -> Ecosystem {
    let file_name = decl
        .manifest_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    Ecosystem::ALL
        .into_iter()
        .find(|eco| eco.manifest_name() == file_name)
        .unwrap_or(Ecosystem::Npm)
}

/// 해석에 성공한 선언을 분류합니다.
///
/// 요청 기준 버전과 최신 버전 매칭은 전체 범위 산술이 아닌
/// 정확/접두 일치 휴리스틱입니다.
fn classify_found(decl: &DependencyDeclaration, info: &RegistryPackageInfo) -> Option<Conflict> {
    if info.available.is_empty() {
        return Some(Conflict {
            manifest_path: decl.manifest_path.clone(),
            name: decl.name.clone(),
            requested: decl.requested.clone(),
            available_latest: (!info.latest.is_empty()).then(|| info.latest.clone()),
            kind: ConflictKind::NoVersionsAvailable,
        });
    }

    let base = base_version(&decl.requested);
    let base_known = info.available.iter().any(|v| versions_match(base, v));
    let latest_known = info
        .available
        .iter()
        .any(|v| versions_match(&info.latest, v));

    if !base_known && !latest_known {
        return Some(Conflict {
            manifest_path: decl.manifest_path.clone(),
            name: decl.name.clone(),
            requested: decl.requested.clone(),
            available_latest: Some(info.latest.clone()),
            kind: ConflictKind::RequestedVersionUnavailable,
        });
    }

    None
}

/// 두 버전 문자열의 정확/접두 일치를 확인합니다.
///
/// "1.2"와 "1.2.3"은 어느 방향으로든 일치로 취급합니다.
/// Go 스타일 `v` 접두어는 무시합니다.
fn versions_match(a: &str, b: &str) -> bool {
    let a = a.trim_start_matches('v');
    let b = b.trim_start_matches('v');

    a == b || b.starts_with(&format!("{a}.")) || a.starts_with(&format!("{b}."))
}
