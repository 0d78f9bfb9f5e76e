//! 리포트 조립 및 영속화
//!
//! [`HealthReport`]는 런당 한 번 조립되어 JSON으로 기록되며,
//! 기록 후에는 변경되지 않습니다. 쓰기는 임시 파일 + rename으로
//! 원자적으로 수행됩니다.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use depmend_core::types::{
    ActionOutcome, Conflict, ConflictKind, Ecosystem, RegistryPackageInfo, RemediationAction,
    Vulnerability,
};
use depmend_core::types::HealthReport;

use crate::error::HealthError;

/// 검사 결과로부터 실행 가능한 권고 목록을 생성합니다.
///
/// 출력 순서는 입력 순서에만 의존하므로 결정적입니다.
pub fn build_recommendations(
    conflicts: &[Conflict],
    vulnerabilities: &[Vulnerability],
    actions: &[RemediationAction],
    resolved: &BTreeMap<(Ecosystem, String), RegistryPackageInfo>,
    stale_count: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    for conflict in conflicts {
        let hint = match conflict.kind {
            ConflictKind::NotFound => format!(
                "remove or replace '{}' in {}: package not found in its registry",
                conflict.name,
                conflict.manifest_path.display(),
            ),
            ConflictKind::NoVersionsAvailable => format!(
                "investigate '{}' in {}: registry returned no versions",
                conflict.name,
                conflict.manifest_path.display(),
            ),
            ConflictKind::RequestedVersionUnavailable => format!(
                "adjust '{}' constraint '{}' in {}: requested version unavailable{}",
                conflict.name,
                conflict.requested,
                conflict.manifest_path.display(),
                conflict
                    .available_latest
                    .as_deref()
                    .map(|l| format!(", registry latest is {l}"))
                    .unwrap_or_default(),
            ),
        };
        recommendations.push(hint);
    }

    for vuln in vulnerabilities {
        match &vuln.fixed_version {
            Some(fixed) => recommendations.push(format!(
                "upgrade '{}' to {fixed} or later to resolve {} [{}]",
                vuln.package, vuln.advisory_id, vuln.severity,
            )),
            None => recommendations.push(format!(
                "no fixed release yet for {} in '{}' [{}]: consider replacing the package",
                vuln.advisory_id, vuln.package, vuln.severity,
            )),
        }
    }

    for action in actions {
        if let ActionOutcome::Failed { .. } = action.outcome {
            recommendations.push(format!(
                "manual intervention needed for '{}' in {}: automatic bump {} -> {} was rolled back",
                action.package,
                action.manifest_path.display(),
                action.old_version,
                action.new_version,
            ));
        }
    }

    // deprecated 최신 릴리스는 충돌이 아니라 권고로만 노출
    for ((_, name), info) in resolved {
        if info.deprecated {
            recommendations.push(format!(
                "'{name}' latest release {} is deprecated: plan a migration",
                info.latest,
            ));
        }
    }

    if stale_count > 0 {
        recommendations.push(format!(
            "{stale_count} declaration(s) are behind their registry latest: schedule an update pass",
        ));
    }

    recommendations
}

/// 리포트를 pretty JSON으로 직렬화하여 기록합니다.
///
/// 부모 디렉토리가 없으면 생성합니다. 기록된 파일은 이후 변경되지 않습니다.
pub async fn write_report(report: &HealthReport, path: &Path) -> Result<(), HealthError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| HealthError::ReportWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HealthError::ReportWrite {
                path: path.display().to_string(),
                reason: format!("failed to create report directory: {e}"),
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| HealthError::ReportWrite {
            path: tmp_path.display().to_string(),
            reason: e.to_string(),
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| HealthError::ReportWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    info!(path = %path.display(), "health report written");
    Ok(())
}
