//! 자동 교정 엔진 -- 모드 기반 타깃 선정과 백업/검증/롤백 프로토콜
//!
//! 매니페스트별 상태 기계:
//!
//! ```text
//! Scanned -> BackedUp -> Mutated -> Validated(success) | RolledBack(failure)
//! ```
//!
//! - 백업 생성 실패 시 해당 매니페스트의 변경은 시작되지 않습니다 (fail-closed).
//! - 검증 실패 시 백업에서 복원되어 디스크 내용이 런 이전과 바이트 단위로
//!   동일해지고, 검증 도구의 출력이 원문 그대로 액션에 기록됩니다.
//! - 매니페스트 처리는 서로 독립적입니다. 한 매니페스트의 실패가 다른
//!   매니페스트를 막거나 롤백시키지 않습니다.
//! - 런 데드라인이 지나면 아직 시작하지 않은 매니페스트만 포기합니다.
//!   변경이 시작된 매니페스트는 백업/검증/롤백 사이클을 끝까지 수행하므로
//!   파일이 반쯤 쓰인 채 남는 일이 없습니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use depmend_core::metrics as m;
use depmend_core::types::{
    ActionOutcome, DependencyDeclaration, Ecosystem, ManifestFile, RegistryPackageInfo,
    RemediationAction, RemediationMode, base_version,
};
use depmend_registry::AdvisoryDb;
use depmend_registry::version::{compare_versions, same_major};
use depmend_scanner::adapter_for;

use crate::backup::{BackupStore, atomic_write};
use crate::command::{CommandOutcome, EcosystemCommands};
use crate::config::RemediationConfig;

/// 한 매니페스트에 대해 계획된 교정 작업
#[derive(Debug, Clone)]
pub struct ManifestPlan {
    /// 대상 매니페스트
    pub manifest: ManifestFile,
    /// 계획된 버전 변경 (package, old_requested, new_requested, reason)
    pub changes: Vec<PlannedChange>,
}

/// 계획된 단일 버전 변경
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// 패키지 이름
    pub package: String,
    /// 기존 선언 범위
    pub old_requested: String,
    /// 새 선언 범위
    pub new_requested: String,
    /// 변경 사유
    pub reason: String,
}

/// 자동 교정 엔진
#[derive(Clone)]
pub struct RemediationEngine {
    config: RemediationConfig,
    backups: Arc<BackupStore>,
    commands: Arc<HashMap<Ecosystem, EcosystemCommands>>,
    advisories: Arc<AdvisoryDb>,
}

impl RemediationEngine {
    /// 엔진을 생성합니다.
    pub fn new(
        config: RemediationConfig,
        backups: Arc<BackupStore>,
        commands: HashMap<Ecosystem, EcosystemCommands>,
        advisories: Arc<AdvisoryDb>,
    ) -> Self {
        Self {
            config,
            backups,
            commands: Arc::new(commands),
            advisories,
        }
    }

    /// 엔진 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &RemediationConfig {
        &self.config
    }

    /// 해석된 버전 정보를 바탕으로 매니페스트별 교정 계획을 세웁니다.
    ///
    /// 모드별 타깃 선정:
    ///
    /// - **Conservative**: 현재 기준 버전과 같은 메이저 내에서 더 새로운
    ///   최소 버전. 메이저 경계를 넘지 않습니다.
    /// - **Aggressive**: 레지스트리가 보고한 최신 버전.
    /// - **SecurityOnly**: 매칭된 어드바이저리를 모두 해소하는 메이저 내
    ///   최소 버전. 해당 생태계의 어드바이저리 데이터가 없으면
    ///   conservative 로직으로 fallback합니다.
    ///
    /// 타깃이 현재 버전과 같으면 계획에 포함되지 않습니다.
    pub fn plan(
        &self,
        manifests: &[ManifestFile],
        declarations: &[DependencyDeclaration],
        resolved: &BTreeMap<(Ecosystem, String), RegistryPackageInfo>,
    ) -> Vec<ManifestPlan> {
        let mut plans: Vec<ManifestPlan> = Vec::new();

        for manifest in manifests {
            let mut changes = Vec::new();

            for decl in declarations
                .iter()
                .filter(|d| d.manifest_path == manifest.path)
            {
                let Some(info) = resolved.get(&(manifest.ecosystem, decl.name.clone())) else {
                    continue; // 해석 실패/NotFound는 교정 대상이 아님
                };

                if let Some(change) = self.plan_declaration(manifest.ecosystem, decl, info) {
                    changes.push(change);
                }
            }

            if !changes.is_empty() {
                changes.sort_by(|a, b| a.package.cmp(&b.package));
                plans.push(ManifestPlan {
                    manifest: manifest.clone(),
                    changes,
                });
            }
        }

        plans
    }

    /// 단일 선언에 대한 타깃 버전을 계산합니다.
    fn plan_declaration(
        &self,
        ecosystem: Ecosystem,
        decl: &DependencyDeclaration,
        info: &RegistryPackageInfo,
    ) -> Option<PlannedChange> {
        if info.available.is_empty() {
            return None;
        }

        let base = base_version(&decl.requested);
        if base == "*" || base.is_empty() {
            return None; // 와일드카드 선언은 항상 최신을 허용
        }

        let (target, reason) = match self.config.mode {
            RemediationMode::Conservative => (
                smallest_newer_same_major(base, &info.available)?,
                "conservative bump within current major".to_owned(),
            ),
            RemediationMode::Aggressive => {
                let latest = info.latest.clone();
                if versions_equal(base, &latest) {
                    return None;
                }
                (latest, "aggressive bump to registry latest".to_owned())
            }
            RemediationMode::SecurityOnly => {
                if !self.advisories.has_ecosystem(ecosystem) {
                    // 어드바이저리 데이터가 없으면 conservative 로직으로 fallback
                    (
                        smallest_newer_same_major(base, &info.available)?,
                        "conservative bump (no advisory data)".to_owned(),
                    )
                } else {
                    let matched = self.advisories.lookup(&decl.name, ecosystem);
                    let affecting: Vec<_> = matched
                        .iter()
                        .filter(|a| {
                            depmend_registry::version::is_affected(base, &a.affected_ranges)
                        })
                        .collect();
                    if affecting.is_empty() {
                        return None; // 해소할 취약점 없음
                    }

                    let target = info
                        .available
                        .iter()
                        .filter(|v| same_major(v, base))
                        .filter(|v| compare_versions(v, base) == std::cmp::Ordering::Greater)
                        .filter(|v| {
                            affecting.iter().all(|a| {
                                !depmend_registry::version::is_affected(v, &a.affected_ranges)
                            })
                        })
                        .min_by(|a, b| compare_versions(a, b))?
                        .clone();

                    let ids: Vec<&str> = affecting
                        .iter()
                        .map(|a| a.advisory_id.as_str())
                        .collect();
                    (target, format!("resolves {}", ids.join(", ")))
                }
            }
        };

        let new_requested = carry_range_prefix(&decl.requested, &target);
        if new_requested == decl.requested {
            return None;
        }

        Some(PlannedChange {
            package: decl.name.clone(),
            old_requested: decl.requested.clone(),
            new_requested,
            reason,
        })
    }

    /// 계획된 모든 매니페스트를 독립적으로 교정합니다.
    ///
    /// 매니페스트별 파이프라인은 세마포어로 제한된 워커 풀에서 병렬
    /// 수행됩니다. `deadline`이 지난 시점에 아직 시작하지 않은
    /// 매니페스트는 변경 없이 Skipped 처리됩니다.
    ///
    /// 반환 목록은 (manifest_path, package) 순으로 정렬됩니다.
    pub async fn remediate_all(
        &self,
        plans: Vec<ManifestPlan>,
        deadline: Option<Instant>,
    ) -> Vec<RemediationAction> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();

        for plan in plans {
            let engine = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;

                // 데드라인 체크는 변경 시작 전에만 수행 -- 쓰기 도중에는
                // 절대 중단하지 않는다
                if let Some(deadline) = deadline
                    && Instant::now() >= deadline
                {
                    return skip_plan(&plan, "run deadline exceeded before mutation began");
                }

                engine.remediate_manifest(&plan).await
            });
        }

        let mut actions = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(manifest_actions) => actions.extend(manifest_actions),
                Err(e) => warn!(error = %e, "remediation task panicked"),
            }
        }

        actions.sort_by(|a, b| (&a.manifest_path, &a.package).cmp(&(&b.manifest_path, &b.package)));

        for action in &actions {
            let result = match action.outcome {
                ActionOutcome::Applied => "success",
                _ => "failure",
            };
            metrics::counter!(m::REMEDY_ACTIONS_TOTAL, m::LABEL_RESULT => result).increment(1);
        }

        actions
    }

    /// 단일 매니페스트의 교정 파이프라인을 수행합니다.
    async fn remediate_manifest(&self, plan: &ManifestPlan) -> Vec<RemediationAction> {
        let manifest = &plan.manifest;
        let path = &manifest.path;

        let Some(commands) = self.commands.get(&manifest.ecosystem) else {
            return skip_plan(
                plan,
                &format!("no validation command registered for {}", manifest.ecosystem),
            );
        };

        // Scanned -> BackedUp: 백업 없이는 어떤 쓰기도 일어나지 않음
        let record = match self.backups.create(path).await {
            Ok(record) => record,
            Err(e) => {
                warn!(manifest = %path.display(), error = %e, "backup failed, mutation aborted");
                return skip_plan(plan, &format!("backup failed: {e}"));
            }
        };

        let original = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(manifest = %path.display(), error = %e, "failed to read manifest");
                return skip_plan(plan, &format!("failed to read manifest: {e}"));
            }
        };

        // BackedUp -> Mutated: 대상 선언만 어댑터로 재작성
        let adapter = adapter_for(manifest.ecosystem);
        let mut content = original.clone();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for change in &plan.changes {
            match adapter.set_version(&content, &change.package, &change.new_requested) {
                Ok(updated) => {
                    content = updated;
                    applied.push(change.clone());
                }
                Err(e) => {
                    warn!(
                        manifest = %path.display(),
                        package = %change.package,
                        error = %e,
                        "failed to rewrite declaration, skipping"
                    );
                    skipped.push(make_action(
                        manifest,
                        change,
                        ActionOutcome::Skipped {
                            reason: format!("rewrite failed: {e}"),
                        },
                    ));
                }
            }
        }

        if applied.is_empty() {
            return skipped;
        }

        if let Err(e) = atomic_write(path, content.as_bytes()) {
            warn!(manifest = %path.display(), error = %e, "failed to write mutated manifest");
            let mut actions = fail_changes(manifest, &applied, &format!("write failed: {e}"));
            actions.extend(skipped);
            return actions;
        }

        debug!(
            manifest = %path.display(),
            changes = applied.len(),
            "manifest mutated, regenerating lock artifact"
        );

        let manifest_dir = path.parent().unwrap_or(std::path::Path::new("."));

        // Mutated -> Validated | RolledBack
        let lock_outcome = self.run_command(&commands.lock_regen, manifest_dir).await;
        let validate_outcome = if lock_outcome.success {
            self.run_command(&commands.validate, manifest_dir).await
        } else {
            lock_outcome.clone()
        };

        if validate_outcome.success {
            info!(
                manifest = %path.display(),
                changes = applied.len(),
                "remediation validated"
            );
            let mut actions: Vec<RemediationAction> = applied
                .iter()
                .map(|c| make_action(manifest, c, ActionOutcome::Applied))
                .collect();
            actions.extend(skipped);
            return actions;
        }

        // 검증 실패: 백업에서 복원, 검증 출력은 원문 그대로 기록
        warn!(
            manifest = %path.display(),
            "validation failed, rolling back from backup"
        );

        if let Err(e) = self.backups.restore(&record).await {
            // 복원 실패는 해당 매니페스트에 한정된 치명적 상태 -- 그대로 노출
            warn!(manifest = %path.display(), error = %e, "rollback failed");
            let mut actions = fail_changes(
                manifest,
                &applied,
                &format!(
                    "validation failed: {}; rollback also failed: {e}",
                    validate_outcome.output
                ),
            );
            actions.extend(skipped);
            return actions;
        }

        let mut actions = fail_changes(manifest, &applied, &validate_outcome.output);
        actions.extend(skipped);
        actions
    }

    /// 검증 명령을 타임아웃과 함께 실행합니다.
    async fn run_command(
        &self,
        command: &Arc<dyn crate::command::DynValidationCommand>,
        manifest_dir: &std::path::Path,
    ) -> CommandOutcome {
        match tokio::time::timeout(self.config.validation_timeout(), command.run(manifest_dir))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => CommandOutcome::failed(format!(
                "validation timed out after {}s",
                self.config.validation_timeout_secs
            )),
        }
    }
}

/// 현재 기준 버전과 같은 메이저 내에서 더 새로운 최소 버전을 찾습니다.
fn smallest_newer_same_major(base: &str, available: &[String]) -> Option<String> {
    available
        .iter()
        .filter(|v| same_major(v, base))
        .filter(|v| compare_versions(v, base) == std::cmp::Ordering::Greater)
        .min_by(|a, b| compare_versions(a, b))
        .cloned()
}

/// 두 버전이 같은지 비교합니다 (v 접두어 무시).
fn versions_equal(a: &str, b: &str) -> bool {
    compare_versions(a, b) == std::cmp::Ordering::Equal
}

/// 기존 요청 범위의 연산자 접두어를 새 타깃에 이어 붙입니다.
///
/// 예: "^1.2.0" + "1.3.0" -> "^1.3.0", "==2.31.0" + "2.32.0" -> "==2.32.0"
/// 복합 범위는 첫 조건의 접두어만 유지합니다.
fn carry_range_prefix(old_requested: &str, target: &str) -> String {
    let first = old_requested
        .split(',')
        .next()
        .unwrap_or(old_requested)
        .trim();
    let base = base_version(old_requested);
    let prefix_len = first.len().saturating_sub(base.len());
    let prefix = &first[..prefix_len];
    // 타깃 자체의 접두어(go의 v 등)는 제거하고 기존 접두어만 유지
    format!("{prefix}{}", base_version(target))
}

/// 계획 전체를 Skipped 액션으로 변환합니다.
fn skip_plan(plan: &ManifestPlan, reason: &str) -> Vec<RemediationAction> {
    plan.changes
        .iter()
        .map(|change| {
            make_action(
                &plan.manifest,
                change,
                ActionOutcome::Skipped {
                    reason: reason.to_owned(),
                },
            )
        })
        .collect()
}

/// 적용된 변경 전체를 Failed 액션으로 변환합니다.
fn fail_changes(
    manifest: &ManifestFile,
    changes: &[PlannedChange],
    reason: &str,
) -> Vec<RemediationAction> {
    changes
        .iter()
        .map(|change| {
            make_action(
                manifest,
                change,
                ActionOutcome::Failed {
                    reason: reason.to_owned(),
                },
            )
        })
        .collect()
}

fn make_action(
    manifest: &ManifestFile,
    change: &PlannedChange,
    outcome: ActionOutcome,
) -> RemediationAction {
    RemediationAction {
        id: uuid::Uuid::new_v4().to_string(),
        manifest_path: manifest.path.clone(),
        package: change.package.clone(),
        old_version: change.old_requested.clone(),
        new_version: change.new_requested.clone(),
        reason: change.reason.clone(),
        outcome,
    }
}
