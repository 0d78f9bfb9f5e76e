//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `depmend_`
//! - 모듈명: `scanner_`, `registry_`, `detect_`, `remedy_`, `health_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 생태계 레이블 키 (npm, cargo, pip, pipenv, go)
pub const LABEL_ECOSYSTEM: &str = "ecosystem";

/// 심각도 레이블 키 (low, moderate, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 교정 모드 레이블 키 (conservative, aggressive, security-only)
pub const LABEL_MODE: &str = "mode";

// ─── Scanner 메트릭 ────────────────────────────────────────────────

/// Scanner: 발견된 매니페스트 수 (counter, label: ecosystem)
pub const SCANNER_MANIFESTS_FOUND_TOTAL: &str = "depmend_scanner_manifests_found_total";

/// Scanner: 파싱된 의존성 선언 수 (counter, label: ecosystem)
pub const SCANNER_DECLARATIONS_TOTAL: &str = "depmend_scanner_declarations_total";

/// Scanner: 읽기 실패로 건너뛴 경로 수 (counter)
pub const SCANNER_SKIPPED_PATHS_TOTAL: &str = "depmend_scanner_skipped_paths_total";

// ─── Registry 메트릭 ───────────────────────────────────────────────

/// Registry: 아웃바운드 조회 수 (counter, label: ecosystem)
pub const REGISTRY_LOOKUPS_TOTAL: &str = "depmend_registry_lookups_total";

/// Registry: 캐시 적중 수 (counter)
pub const REGISTRY_CACHE_HITS_TOTAL: &str = "depmend_registry_cache_hits_total";

/// Registry: 재시도 수 (counter)
pub const REGISTRY_RETRIES_TOTAL: &str = "depmend_registry_retries_total";

/// Registry: 조회 지연 시간 (histogram, 초)
pub const REGISTRY_LOOKUP_DURATION_SECONDS: &str = "depmend_registry_lookup_duration_seconds";

// ─── Conflict Detection 메트릭 ─────────────────────────────────────

/// Detect: 탐지된 충돌 수 (counter, label: ecosystem)
pub const DETECT_CONFLICTS_TOTAL: &str = "depmend_detect_conflicts_total";

/// Detect: 해석 실패로 건너뛴 선언 수 (counter)
pub const DETECT_UNRESOLVED_TOTAL: &str = "depmend_detect_unresolved_total";

// ─── Remediation 메트릭 ────────────────────────────────────────────

/// Remedy: 생성된 백업 수 (counter)
pub const REMEDY_BACKUPS_CREATED_TOTAL: &str = "depmend_remedy_backups_created_total";

/// Remedy: 적용된 액션 수 (counter, label: result)
pub const REMEDY_ACTIONS_TOTAL: &str = "depmend_remedy_actions_total";

/// Remedy: 롤백 수 (counter)
pub const REMEDY_ROLLBACKS_TOTAL: &str = "depmend_remedy_rollbacks_total";

// ─── Health 메트릭 ─────────────────────────────────────────────────

/// Health: 최종 건강 점수 (gauge, 0-100)
pub const HEALTH_SCORE: &str = "depmend_health_score";

/// Health: 발견된 취약점 수 (gauge, label: severity)
pub const HEALTH_VULNERABILITIES_FOUND: &str = "depmend_health_vulnerabilities_found";

/// Health: 런 소요 시간 (histogram, 초)
pub const RUN_DURATION_SECONDS: &str = "depmend_run_duration_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 레지스트리 조회 지연 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 60s 범위 (타임아웃 30s + 재시도 여유)
pub const LOOKUP_DURATION_BUCKETS: [f64; 8] = [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0];

/// 런 소요 시간 히스토그램 버킷 (초)
///
/// 1s ~ 600s 범위 (검증 명령 실행 포함)
pub const RUN_DURATION_BUCKETS: [f64; 8] = [1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `depmend-cli`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Scanner
    describe_counter!(
        SCANNER_MANIFESTS_FOUND_TOTAL,
        "Total number of package manifests discovered per ecosystem"
    );
    describe_counter!(
        SCANNER_DECLARATIONS_TOTAL,
        "Total number of dependency declarations parsed"
    );
    describe_counter!(
        SCANNER_SKIPPED_PATHS_TOTAL,
        "Total number of unreadable paths skipped during the walk"
    );

    // Registry
    describe_counter!(
        REGISTRY_LOOKUPS_TOTAL,
        "Total number of outbound registry lookups"
    );
    describe_counter!(
        REGISTRY_CACHE_HITS_TOTAL,
        "Total number of run-cache hits for registry lookups"
    );
    describe_counter!(REGISTRY_RETRIES_TOTAL, "Total number of registry retries");
    describe_histogram!(
        REGISTRY_LOOKUP_DURATION_SECONDS,
        "Registry lookup latency in seconds"
    );

    // Detect
    describe_counter!(
        DETECT_CONFLICTS_TOTAL,
        "Total number of dependency conflicts detected"
    );
    describe_counter!(
        DETECT_UNRESOLVED_TOTAL,
        "Total number of declarations skipped due to transient resolver failures"
    );

    // Remedy
    describe_counter!(
        REMEDY_BACKUPS_CREATED_TOTAL,
        "Total number of manifest backups created"
    );
    describe_counter!(
        REMEDY_ACTIONS_TOTAL,
        "Total number of remediation actions by result"
    );
    describe_counter!(
        REMEDY_ROLLBACKS_TOTAL,
        "Total number of rollbacks after failed validation"
    );

    // Health
    describe_gauge!(HEALTH_SCORE, "Final health score of the run (0-100)");
    describe_gauge!(
        HEALTH_VULNERABILITIES_FOUND,
        "Number of vulnerabilities found by severity level"
    );
    describe_histogram!(RUN_DURATION_SECONDS, "Total run duration in seconds");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        SCANNER_MANIFESTS_FOUND_TOTAL,
        SCANNER_DECLARATIONS_TOTAL,
        SCANNER_SKIPPED_PATHS_TOTAL,
        REGISTRY_LOOKUPS_TOTAL,
        REGISTRY_CACHE_HITS_TOTAL,
        REGISTRY_RETRIES_TOTAL,
        REGISTRY_LOOKUP_DURATION_SECONDS,
        DETECT_CONFLICTS_TOTAL,
        DETECT_UNRESOLVED_TOTAL,
        REMEDY_BACKUPS_CREATED_TOTAL,
        REMEDY_ACTIONS_TOTAL,
        REMEDY_ROLLBACKS_TOTAL,
        HEALTH_SCORE,
        HEALTH_VULNERABILITIES_FOUND,
        RUN_DURATION_SECONDS,
    ];

    #[test]
    fn all_metrics_start_with_depmend_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("depmend_"),
                "Metric '{}' does not start with 'depmend_' prefix",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // describe_all() should not panic even without a recorder installed
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [LABEL_ECOSYSTEM, LABEL_SEVERITY, LABEL_RESULT, LABEL_MODE];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }

    #[test]
    fn histogram_buckets_are_sorted() {
        for buckets in [&LOOKUP_DURATION_BUCKETS[..], &RUN_DURATION_BUCKETS[..]] {
            for i in 1..buckets.len() {
                assert!(
                    buckets[i] > buckets[i - 1],
                    "Bucket values must be in ascending order"
                );
            }
        }
    }
}
