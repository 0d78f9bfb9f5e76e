//! 건강 점수 산정 -- 결정적 가중 합산
//!
//! 점수는 100에서 시작하여:
//!
//! - 취약점 심각도별 페널티 차감 (critical 25, high 15, moderate 5, low 1)
//! - 신선도 페널티 `min(stale_count * 2, 20)` 차감
//! - 하드 에러 카테고리당 5 차감
//!
//! 후 [0, 100]으로 클램프합니다. skipped 카테고리는 점수에 전혀
//! 영향을 주지 않습니다 (도구 부재는 페널티가 아님).
//!
//! 종합 상태는 에러 카테고리나 critical/high 취약점이 있으면 critical,
//! 점수가 100 미만이면 warning, 그 외에는 healthy입니다.

use depmend_core::types::{
    CheckStatus, HealthCheckResult, OverallStatus, Severity, Vulnerability,
};

/// 신선도 페널티 상한
const STALENESS_PENALTY_CAP: u32 = 20;

/// 하드 에러 카테고리당 페널티
const ERROR_CATEGORY_PENALTY: u32 = 5;

/// 건강 점수를 계산합니다.
///
/// 동일 입력에 대해 항상 동일한 점수를 반환합니다.
pub fn compute_score(
    checks: &[HealthCheckResult],
    vulnerabilities: &[Vulnerability],
    stale_count: usize,
) -> u8 {
    let mut penalty: u32 = 0;

    for vuln in vulnerabilities {
        penalty += vuln.severity.score_penalty();
    }

    let stale_penalty = (stale_count as u32).saturating_mul(2).min(STALENESS_PENALTY_CAP);
    penalty += stale_penalty;

    let error_categories = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Error)
        .count() as u32;
    penalty += error_categories * ERROR_CATEGORY_PENALTY;

    100u32.saturating_sub(penalty).min(100) as u8
}

/// 종합 상태를 도출합니다.
///
/// - `Critical`: 에러 카테고리 존재 또는 critical/high 취약점 존재
/// - `Warning`: 점수 < 100 (하드 에러 없음)
/// - `Healthy`: 그 외
///
/// skipped 카테고리는 상태에 영향을 주지 않습니다.
pub fn derive_overall(
    checks: &[HealthCheckResult],
    vulnerabilities: &[Vulnerability],
    score: u8,
) -> OverallStatus {
    let has_error_category = checks.iter().any(|c| c.status == CheckStatus::Error);
    let has_severe_vuln = vulnerabilities
        .iter()
        .any(|v| v.severity >= Severity::High);

    if has_error_category || has_severe_vuln {
        return OverallStatus::Critical;
    }

    if score < 100 {
        return OverallStatus::Warning;
    }

    OverallStatus::Healthy
}
