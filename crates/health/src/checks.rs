//! 매니페스트 단위 건강 검사 -- lock 산출물, 신선도, 어드바이저리 스캔
//!
//! [`HealthChecker`]는 스캔/탐지 단계의 산출물을 입력으로 받아
//! 카테고리별 [`HealthCheckResult`]를 생성합니다.
//!
//! 어드바이저리 소스가 없는 생태계의 취약점 검사는 skipped로 기록되고
//! 점수 분모에서 제외됩니다 -- 도구 부재는 페널티가 아닙니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use depmend_core::metrics as m;
use depmend_core::types::{
    CheckStatus, Conflict, DependencyDeclaration, Ecosystem, HealthCheckResult, ManifestFile,
    RegistryPackageInfo, Vulnerability, base_version,
};
use depmend_registry::AdvisoryDb;
use depmend_registry::version::is_affected;

use crate::config::HealthCheckConfig;

/// 건강 검사기
pub struct HealthChecker {
    config: HealthCheckConfig,
    advisories: Arc<AdvisoryDb>,
}

impl HealthChecker {
    /// 검사기를 생성합니다.
    pub fn new(config: HealthCheckConfig, advisories: Arc<AdvisoryDb>) -> Self {
        Self { config, advisories }
    }

    /// 검사기 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// lock/해석 산출물 존재 검사를 수행합니다.
    ///
    /// lockfile 개념이 없는 생태계(pip)는 검사 대상에서 제외됩니다.
    pub fn lockfile_presence(&self, manifests: &[ManifestFile]) -> HealthCheckResult {
        let mut result = HealthCheckResult::healthy("lockfile-presence");
        let mut checked = 0usize;

        for manifest in manifests {
            let Some(lockfile_name) = manifest.ecosystem.lockfile_name() else {
                continue;
            };
            checked += 1;

            let lockfile = manifest
                .path
                .parent()
                .map(|dir| dir.join(lockfile_name))
                .filter(|p| p.is_file());

            if lockfile.is_none() {
                result.issues.push(format!(
                    "{}: missing {} next to manifest",
                    manifest.path.display(),
                    lockfile_name,
                ));
            }
        }

        result
            .details
            .insert("manifests_checked".to_owned(), checked.to_string());

        if !result.issues.is_empty() {
            result.status = CheckStatus::Warning;
        }

        result
    }

    /// 신선도 검사: 해석된 최신 버전과 선언이 다른 개수를 셉니다.
    ///
    /// 반환값의 두 번째 요소가 점수 계산에 쓰이는 stale 카운트입니다.
    pub fn staleness(
        &self,
        declarations: &[DependencyDeclaration],
        resolved: &std::collections::BTreeMap<(Ecosystem, String), RegistryPackageInfo>,
    ) -> (HealthCheckResult, usize) {
        let mut result = HealthCheckResult::healthy("dependency-staleness");
        let mut stale = 0usize;

        for decl in declarations {
            let file_name = decl.manifest_path.file_name().and_then(|n| n.to_str());
            let ecosystem = Ecosystem::ALL
                .into_iter()
                .find(|eco| Some(eco.manifest_name()) == file_name);
            let Some(info) =
                ecosystem.and_then(|eco| resolved.get(&(eco, decl.name.clone())))
            else {
                continue;
            };

            let base = base_version(&decl.requested);
            if base == "*" || base.is_empty() {
                continue;
            }

            if !versions_match_loose(base, &info.latest) {
                stale += 1;
                result.issues.push(format!(
                    "{}: {} {} is behind latest {}",
                    decl.manifest_path.display(),
                    decl.name,
                    decl.requested,
                    info.latest,
                ));
            }
        }

        result
            .details
            .insert("stale_count".to_owned(), stale.to_string());

        if stale > 0 {
            result.status = CheckStatus::Issues;
        }

        (result, stale)
    }

    /// 충돌 검사: 레지스트리가 확인한 충돌을 하드 에러 카테고리로 집계합니다.
    pub fn conflicts(&self, conflicts: &[Conflict]) -> HealthCheckResult {
        let mut result = HealthCheckResult::healthy("dependency-conflicts");

        for conflict in conflicts {
            result.issues.push(conflict.to_string());
        }

        result
            .details
            .insert("conflict_count".to_owned(), conflicts.len().to_string());

        if !conflicts.is_empty() {
            result.status = CheckStatus::Error;
        }

        result
    }

    /// 생태계별 어드바이저리 스캔을 수행합니다.
    ///
    /// 어드바이저리 소스가 없는 생태계는 skipped 카테고리로 기록되고
    /// 점수에 영향을 주지 않습니다. `min_severity` 미만의 매칭은
    /// 리포트에 포함되지 않습니다.
    pub fn vulnerability_scan(
        &self,
        manifests: &[ManifestFile],
        declarations: &[DependencyDeclaration],
    ) -> (Vec<HealthCheckResult>, Vec<Vulnerability>) {
        let ecosystems: BTreeSet<Ecosystem> =
            manifests.iter().map(|manifest| manifest.ecosystem).collect();

        let mut results = Vec::new();
        let mut vulnerabilities = Vec::new();

        for ecosystem in ecosystems {
            let category = format!("vulnerability-scan ({ecosystem})");

            if !self.advisories.has_ecosystem(ecosystem) {
                tracing::info!(
                    ecosystem = %ecosystem,
                    "advisory source unavailable, skipping vulnerability scan"
                );
                results.push(HealthCheckResult::skipped(
                    category,
                    format!("no advisory source for {ecosystem}"),
                ));
                continue;
            }

            let mut result = HealthCheckResult::healthy(category);
            let mut found = 0usize;

            for decl in declarations
                .iter()
                .filter(|d| manifest_of(manifests, d).is_some_and(|m| m.ecosystem == ecosystem))
            {
                let base = base_version(&decl.requested);

                for entry in self.advisories.lookup(&decl.name, ecosystem) {
                    if !is_affected(base, &entry.affected_ranges) {
                        continue;
                    }
                    if entry.severity < self.config.min_severity {
                        continue;
                    }

                    found += 1;
                    result.issues.push(format!(
                        "{}: {} {} affected by {} [{}]",
                        decl.manifest_path.display(),
                        decl.name,
                        decl.requested,
                        entry.advisory_id,
                        entry.severity,
                    ));
                    vulnerabilities.push(Vulnerability {
                        advisory_id: entry.advisory_id.clone(),
                        package: decl.name.clone(),
                        ecosystem,
                        affected_version: base.to_owned(),
                        fixed_version: entry.fixed_version.clone(),
                        severity: entry.severity,
                        title: entry.title.clone(),
                        manifest_path: decl.manifest_path.clone(),
                    });
                }
            }

            result
                .details
                .insert("vulnerabilities_found".to_owned(), found.to_string());
            if found > 0 {
                result.status = CheckStatus::Issues;
            }

            results.push(result);
        }

        vulnerabilities.sort_by(|a, b| {
            (&a.manifest_path, &a.package, &a.advisory_id)
                .cmp(&(&b.manifest_path, &b.package, &b.advisory_id))
        });

        for vuln in &vulnerabilities {
            metrics::gauge!(
                m::HEALTH_VULNERABILITIES_FOUND,
                m::LABEL_SEVERITY => vuln.severity.to_string().to_lowercase()
            )
            .increment(1.0);
        }

        (results, vulnerabilities)
    }
}

/// 선언이 속한 매니페스트를 찾습니다.
fn manifest_of<'a>(
    manifests: &'a [ManifestFile],
    decl: &DependencyDeclaration,
) -> Option<&'a ManifestFile> {
    manifests.iter().find(|m| m.path == decl.manifest_path)
}

/// 신선도 판정용 느슨한 버전 일치 (정확/접두).
fn versions_match_loose(a: &str, b: &str) -> bool {
    let a = a.trim_start_matches('v');
    let b = b.trim_start_matches('v');
    a == b || b.starts_with(&format!("{a}.")) || a.starts_with(&format!("{b}."))
}
