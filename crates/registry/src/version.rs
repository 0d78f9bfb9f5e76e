//! 시맨틱 버전 비교 -- 정렬, 메이저 경계, 범위 매칭
//!
//! `semver` 크레이트를 사용하여 버전을 비교하고, 취약점 영향 범위 매칭을
//! 수행합니다. SemVer가 아닌 버전 문자열은 문자열 비교로 fallback합니다.
//! Go 스타일의 `v` 접두어는 비교 전에 제거됩니다.

use std::cmp::Ordering;

use crate::advisory::VersionRange;

/// 두 버전 문자열을 비교합니다.
///
/// SemVer 파싱이 양쪽 모두 성공하면 SemVer 비교,
/// 실패하면 문자열 비교로 fallback합니다.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_norm = normalize(a);
    let b_norm = normalize(b);

    match (
        semver::Version::parse(a_norm),
        semver::Version::parse(b_norm),
    ) {
        (Ok(av), Ok(bv)) => av.cmp(&bv),
        _ => a_norm.cmp(b_norm),
    }
}

/// 버전 목록을 오름차순으로 정렬합니다.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b));
}

/// 버전의 선두(메이저) 컴포넌트를 반환합니다.
///
/// 예: "1.2.3" -> "1", "v2.0.0" -> "2", "1" -> "1"
pub fn major_of(version: &str) -> &str {
    let norm = normalize(version);
    norm.split(['.', '-', '+']).next().unwrap_or(norm)
}

/// 두 버전의 메이저 컴포넌트가 같은지 확인합니다.
pub fn same_major(a: &str, b: &str) -> bool {
    major_of(a) == major_of(b)
}

/// `v` 접두어와 양쪽 공백을 제거합니다.
fn normalize(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// 주어진 버전이 취약점 영향 범위에 포함되는지 확인합니다.
///
/// # 매칭 규칙
///
/// - `introduced`가 None이면 모든 버전이 영향받음 (시작 제한 없음)
/// - `fixed`가 None이면 아직 수정되지 않음 (모든 이후 버전이 영향)
/// - `introduced <= version < fixed`이면 영향받음
///
/// SemVer 파싱이 실패하면 문자열 비교로 fallback합니다.
///
/// 여러 범위 중 하나라도 매칭되면 `true`를 반환합니다.
pub fn is_affected(version_str: &str, ranges: &[VersionRange]) -> bool {
    // 범위가 비어있으면 매칭하지 않음
    if ranges.is_empty() {
        return false;
    }

    ranges.iter().any(|range| is_in_range(version_str, range))
}

/// 단일 버전 범위에 대해 매칭 여부를 확인합니다.
fn is_in_range(version_str: &str, range: &VersionRange) -> bool {
    if let Some(ref introduced) = range.introduced
        && compare_versions(version_str, introduced) == Ordering::Less
    {
        return false;
    }

    if let Some(ref fixed) = range.fixed
        && compare_versions(version_str, fixed) != Ordering::Less
    {
        return false;
    }

    true
}
