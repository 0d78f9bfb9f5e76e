//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 매니페스트, 의존성 선언, 충돌, 취약점, 교정 액션, 건강 리포트 등
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 패키지 생태계 (언어/패키지 관리자)
///
/// 각 매니페스트 형식에 대응하는 패키지 생태계를 나타냅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// JavaScript/TypeScript (package.json)
    Npm,
    /// Rust (Cargo.toml)
    Cargo,
    /// Python (requirements.txt)
    Pip,
    /// Python 가상환경 (Pipfile)
    Pipenv,
    /// Go (go.mod)
    Go,
}

impl Ecosystem {
    /// 지원하는 모든 생태계 목록
    pub const ALL: [Ecosystem; 5] = [
        Ecosystem::Npm,
        Ecosystem::Cargo,
        Ecosystem::Pip,
        Ecosystem::Pipenv,
        Ecosystem::Go,
    ];

    /// 생태계의 매니페스트 파일명을 반환합니다.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            Self::Npm => "package.json",
            Self::Cargo => "Cargo.toml",
            Self::Pip => "requirements.txt",
            Self::Pipenv => "Pipfile",
            Self::Go => "go.mod",
        }
    }

    /// 생태계의 lock/해석 산출물 파일명을 반환합니다 (없는 생태계는 None).
    pub fn lockfile_name(&self) -> Option<&'static str> {
        match self {
            Self::Npm => Some("package-lock.json"),
            Self::Cargo => Some("Cargo.lock"),
            Self::Pip => None,
            Self::Pipenv => Some("Pipfile.lock"),
            Self::Go => Some("go.sum"),
        }
    }

    /// 생태계별 어드바이저리 DB 파일명을 반환합니다.
    pub fn advisory_file(&self) -> &'static str {
        match self {
            Self::Npm => "npm.json",
            Self::Cargo => "cargo.json",
            Self::Pip => "pip.json",
            Self::Pipenv => "pipenv.json",
            Self::Go => "go.json",
        }
    }

    /// 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "npm" | "node" | "javascript" | "js" => Some(Self::Npm),
            "cargo" | "rust" | "crate" | "crates" => Some(Self::Cargo),
            "pip" | "python" | "pypi" => Some(Self::Pip),
            "pipenv" | "pipfile" => Some(Self::Pipenv),
            "go" | "golang" => Some(Self::Go),
            _ => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::Cargo => write!(f, "cargo"),
            Self::Pip => write!(f, "pip"),
            Self::Pipenv => write!(f, "pipenv"),
            Self::Go => write!(f, "go"),
        }
    }
}

/// 매니페스트 내 의존성 구분 (런타임/개발)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencySection {
    /// 런타임 의존성
    Runtime,
    /// 개발(테스트/빌드) 의존성
    Dev,
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// 스캔으로 발견된 매니페스트 파일
///
/// 한 런 동안 불변이며 모든 하위 컴포넌트가 참조합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// 매니페스트 파일 경로
    pub path: PathBuf,
    /// 생태계
    pub ecosystem: Ecosystem,
}

impl fmt::Display for ManifestFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.ecosystem)
    }
}

/// 매니페스트에서 파싱된 단일 의존성 선언
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// 소유 매니페스트 경로
    pub manifest_path: PathBuf,
    /// 섹션 (runtime/dev)
    pub section: DependencySection,
    /// 패키지 이름
    pub name: String,
    /// 선언된 버전 범위 (예: "^1.2.0", ">=2.0", "1.4.1")
    pub requested: String,
}

impl DependencyDeclaration {
    /// 선언된 범위에서 범위 연산자를 제거한 기준 버전을 반환합니다.
    ///
    /// 예: "^1.2.0" -> "1.2.0", ">=2.0,<3.0" -> "2.0", "==1.4.1" -> "1.4.1"
    pub fn base_version(&self) -> &str {
        base_version(&self.requested)
    }
}

impl fmt::Display for DependencyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] ({})",
            self.name,
            self.requested,
            self.section,
            self.manifest_path.display(),
        )
    }
}

/// 버전 범위 문자열에서 범위 연산자/공백을 제거한 기준 버전을 추출합니다.
///
/// 복합 범위(쉼표 구분)는 첫 조건만 사용합니다. 전체 범위 산술이 아닌
/// 기준 버전 추출용 헬퍼입니다.
pub fn base_version(requested: &str) -> &str {
    let first = requested.split(',').next().unwrap_or(requested).trim();
    first
        .trim_start_matches(['^', '~', '=', '>', '<', 'v', ' '])
        .trim()
}

/// 레지스트리에서 조회한 패키지 정보
///
/// (ecosystem, name) 단위로 한 런 동안 캐시됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPackageInfo {
    /// 패키지 이름
    pub name: String,
    /// 생태계
    pub ecosystem: Ecosystem,
    /// 레지스트리가 보고한 최신 버전
    pub latest: String,
    /// 사용 가능한 버전 목록 (레지스트리 순서 보존)
    pub available: Vec<String>,
    /// 최신 릴리스가 deprecated/yanked 상태인지 여부
    pub deprecated: bool,
}

impl fmt::Display for RegistryPackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({}, {} versions{})",
            self.name,
            self.latest,
            self.ecosystem,
            self.available.len(),
            if self.deprecated { ", deprecated" } else { "" },
        )
    }
}

/// 충돌 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// 레지스트리에 패키지가 존재하지 않음
    NotFound,
    /// 패키지는 존재하나 버전 목록이 비어 있음
    NoVersionsAvailable,
    /// 요청한 버전도 최신 버전도 알려진 버전 집합에 없음
    RequestedVersionUnavailable,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not-found"),
            Self::NoVersionsAvailable => write!(f, "no-versions-available"),
            Self::RequestedVersionUnavailable => write!(f, "requested-version-unavailable"),
        }
    }
}

/// 선언된 제약과 레지스트리 현실 사이의 불일치
///
/// 레지스트리가 확인해 준 문제만 충돌로 기록됩니다.
/// 일시적 해석 실패는 [`UnresolvedDeclaration`]으로 분리됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// 매니페스트 경로
    pub manifest_path: PathBuf,
    /// 패키지 이름
    pub name: String,
    /// 선언된 버전 범위
    pub requested: String,
    /// 레지스트리 최신 버전 (조회된 경우)
    pub available_latest: Option<String>,
    /// 충돌 분류
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} ({})",
            self.manifest_path.display(),
            self.name,
            self.requested,
            self.kind,
        )
    }
}

/// 레지스트리 해석이 일시적으로 실패한 선언
///
/// 충돌 목록이 아닌 런 로그에 첨부됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedDeclaration {
    /// 매니페스트 경로
    pub manifest_path: PathBuf,
    /// 패키지 이름
    pub package: String,
    /// 실패 사유
    pub reason: String,
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Moderate < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Moderate,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" | "medium" | "med" => Some(Self::Moderate),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 건강 점수 계산 시 차감되는 페널티를 반환합니다.
    pub fn score_penalty(&self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Moderate => 5,
            Self::High => 15,
            Self::Critical => 25,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 어드바이저리 DB에서 매칭된 취약점 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 어드바이저리 ID (예: CVE-2024-1234, GHSA-xxxx)
    pub advisory_id: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 생태계
    pub ecosystem: Ecosystem,
    /// 영향받는 (선언된) 버전
    pub affected_version: String,
    /// 수정된 버전 (있을 경우)
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 취약점 제목
    pub title: String,
    /// 해당 선언이 속한 매니페스트 경로
    pub manifest_path: PathBuf,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {} (fixed: {})",
            self.advisory_id,
            self.severity,
            self.package,
            self.affected_version,
            self.fixed_version.as_deref().unwrap_or("N/A"),
        )
    }
}

/// 교정 모드 — 버전 범프의 공격성을 결정하는 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationMode {
    /// 요청된 메이저 컴포넌트 내 최소 버전 (메이저 경계를 넘지 않음)
    #[default]
    Conservative,
    /// 레지스트리가 보고한 최신 버전 (메이저 경계 무시)
    Aggressive,
    /// 취약점을 해소하는 메이저 내 최소 버전 (데이터 없으면 conservative로 fallback)
    SecurityOnly,
}

impl RemediationMode {
    /// 문자열에서 교정 모드를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conservative" => Some(Self::Conservative),
            "aggressive" => Some(Self::Aggressive),
            "security-only" | "security_only" | "security" => Some(Self::SecurityOnly),
            _ => None,
        }
    }
}

impl fmt::Display for RemediationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
            Self::SecurityOnly => write!(f, "security-only"),
        }
    }
}

/// 교정 액션의 최종 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// 적용 및 검증 완료
    Applied,
    /// 검증 실패로 롤백됨 (검증 도구 출력 원문 포함)
    Failed { reason: String },
    /// 적용 전 중단됨 (백업 실패, 데드라인 초과 등)
    Skipped { reason: String },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// 충돌에 대해 계산/적용된 교정 액션
///
/// 액션은 자신이 대상으로 하는 매니페스트에만 적용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    /// 액션 고유 ID (UUID v4)
    pub id: String,
    /// 대상 매니페스트 경로
    pub manifest_path: PathBuf,
    /// 패키지 이름
    pub package: String,
    /// 기존 선언 버전 범위
    pub old_version: String,
    /// 새 선언 버전 범위
    pub new_version: String,
    /// 액션 사유 (모드, 충돌/취약점 근거)
    pub reason: String,
    /// 결과
    pub outcome: ActionOutcome,
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {} ({})",
            self.manifest_path.display(),
            self.package,
            self.old_version,
            self.new_version,
            self.outcome,
        )
    }
}

/// 건강 검사 카테고리의 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// 정상
    Healthy,
    /// 경미한 문제 존재
    Issues,
    /// 주의 필요
    Warning,
    /// 하드 에러
    Error,
    /// 도구 부재로 건너뜀 — 점수 분모에서 제외
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Issues => write!(f, "issues"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// 단일 검사 카테고리의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// 카테고리 이름 (예: "lockfile-presence", "vulnerability-scan")
    pub category: String,
    /// 상태
    pub status: CheckStatus,
    /// 발견된 문제 목록
    pub issues: Vec<String>,
    /// 상세 정보 (결정적 직렬화를 위해 BTreeMap)
    pub details: BTreeMap<String, String>,
}

impl HealthCheckResult {
    /// 문제 없는 healthy 결과를 생성합니다.
    pub fn healthy(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            status: CheckStatus::Healthy,
            issues: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    /// 도구 부재로 건너뛴 결과를 생성합니다.
    pub fn skipped(category: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut details = BTreeMap::new();
        details.insert("skip_reason".to_owned(), reason.into());
        Self {
            category: category.into(),
            status: CheckStatus::Skipped,
            issues: Vec::new(),
            details,
        }
    }
}

/// 런 전체의 종합 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    /// 건강함
    Healthy,
    /// 경고 (점수 < 100, 하드 에러 없음)
    Warning,
    /// 치명적 (에러 카테고리 또는 critical/high 취약점 존재)
    Critical,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// 런당 한 번 생성되는 구조화 리포트
///
/// 디스크에 JSON으로 기록된 후에는 변경되지 않습니다.
/// 처리된 모든 매니페스트, 건너뛴 카테고리, 롤백이 빠짐없이 기록되어
/// 어떤 실패도 조용히 사라지지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// 런 고유 ID (UUID v4)
    pub run_id: String,
    /// 리포트 생성 시각
    pub generated_at: SystemTime,
    /// 런에 사용된 교정 모드
    pub mode: RemediationMode,
    /// 스캔 루트 경로
    pub root: PathBuf,
    /// 종합 상태
    pub overall: OverallStatus,
    /// 건강 점수 (0-100)
    pub score: u8,
    /// 처리된 매니페스트 전체 목록
    pub manifests: Vec<ManifestFile>,
    /// 카테고리별 검사 결과
    pub checks: Vec<HealthCheckResult>,
    /// 탐지된 충돌 (manifest_path, name 순 정렬)
    pub conflicts: Vec<Conflict>,
    /// 수행된 교정 액션 (롤백 포함)
    pub actions: Vec<RemediationAction>,
    /// 발견된 취약점
    pub vulnerabilities: Vec<Vulnerability>,
    /// 해석 실패로 건너뛴 선언 (런 로그)
    pub unresolved: Vec<UnresolvedDeclaration>,
    /// 실행 가능한 권고 사항
    pub recommendations: Vec<String>,
}
