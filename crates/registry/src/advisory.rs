//! 어드바이저리 데이터베이스 -- 로컬 JSON DB 로딩 및 조회
//!
//! [`AdvisoryDb`]는 로컬 파일시스템의 생태계별 JSON 파일에서
//! 취약점 어드바이저리를 로드합니다.
//!
//! # DB 디렉토리 구조
//!
//! ```text
//! /var/lib/depmend/advisory-db/
//!   npm.json       # npm 생태계 어드바이저리
//!   cargo.json     # cargo 생태계 어드바이저리
//!   pip.json       # pip 생태계 어드바이저리
//!   pipenv.json
//!   go.json
//! ```
//!
//! 파일이 없는 생태계는 "어드바이저리 소스 없음"으로 기록되어
//! 건강 검사에서 해당 카테고리가 skipped 처리됩니다.
//!
//! # JSON 형식
//!
//! ```json
//! [
//!   {
//!     "advisory_id": "CVE-2024-1234",
//!     "package": "lodash",
//!     "ecosystem": "Npm",
//!     "affected_ranges": [{ "introduced": "4.0.0", "fixed": "4.17.21" }],
//!     "fixed_version": "4.17.21",
//!     "severity": "High",
//!     "title": "Prototype pollution",
//!     "published": "2024-01-15"
//!   }
//! ]
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use depmend_core::types::{Ecosystem, Severity};

use crate::error::RegistryError;

/// 어드바이저리 DB 파일 최대 크기 (50 MB)
const MAX_ADVISORY_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 전체 어드바이저리 엔트리 최대 개수
const MAX_ADVISORY_ENTRIES: usize = 1_000_000;

/// 어드바이저리 DB 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryEntry {
    /// 어드바이저리 ID (예: CVE-2024-1234, GHSA-xxxx)
    pub advisory_id: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 패키지 생태계
    pub ecosystem: Ecosystem,
    /// 영향받는 버전 범위
    pub affected_ranges: Vec<VersionRange>,
    /// 수정된 버전 (있을 경우)
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 어드바이저리 제목
    pub title: String,
    /// 공개 일자 (ISO 8601)
    pub published: String,
}

/// 영향받는 버전 범위
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRange {
    /// 도입 버전 (이 버전부터 영향)
    pub introduced: Option<String>,
    /// 수정 버전 (이 버전에서 수정됨, None이면 미수정)
    pub fixed: Option<String>,
}

/// 어드바이저리 데이터베이스
///
/// 로컬 JSON 파일에서 로드된 어드바이저리 엔트리를 보유합니다.
/// 패키지 이름과 생태계로 조회할 수 있습니다.
///
/// # 인덱싱
///
/// O(1) 조회를 위해 `(package_name, ecosystem)` 쌍으로 인덱싱된 HashMap을 사용합니다.
pub struct AdvisoryDb {
    /// 전체 어드바이저리 엔트리
    entries: Vec<AdvisoryEntry>,
    /// 패키지 이름과 생태계로 인덱싱된 조회 맵
    index: HashMap<(String, Ecosystem), Vec<usize>>,
    /// DB 파일이 존재했던 생태계 목록
    loaded_ecosystems: BTreeSet<Ecosystem>,
}

impl AdvisoryDb {
    /// 빈 데이터베이스를 생성합니다.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            loaded_ecosystems: BTreeSet::new(),
        }
    }

    /// 인덱스를 구축합니다.
    fn build_index(entries: &[AdvisoryEntry]) -> HashMap<(String, Ecosystem), Vec<usize>> {
        let mut index = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            let key = (entry.package.clone(), entry.ecosystem);
            index.entry(key).or_insert_with(Vec::new).push(idx);
        }
        index
    }

    /// 엔트리 목록으로 데이터베이스를 생성합니다 (테스트용).
    ///
    /// 엔트리에 등장하는 생태계는 모두 로드된 것으로 간주합니다.
    pub fn from_entries(entries: Vec<AdvisoryEntry>) -> Self {
        let index = Self::build_index(&entries);
        let loaded_ecosystems = entries.iter().map(|e| e.ecosystem).collect();
        Self {
            entries,
            index,
            loaded_ecosystems,
        }
    }

    /// JSON 문자열에서 데이터베이스를 파싱합니다.
    ///
    /// JSON 형식: `AdvisoryEntry` 배열
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<AdvisoryEntry> = serde_json::from_str(json).map_err(|e| {
            RegistryError::AdvisoryParse(format!("failed to parse advisory JSON: {e}"))
        })?;

        Ok(Self::from_entries(entries))
    }

    /// 디렉토리에서 모든 생태계의 어드바이저리 DB를 로드합니다.
    ///
    /// 각 파일은 `{ecosystem}.json` 형식이어야 합니다.
    /// 파일이 존재하지 않는 생태계는 건너뛰며, 해당 생태계는
    /// [`has_ecosystem`](Self::has_ecosystem)이 `false`를 반환합니다.
    /// 디렉토리 자체가 없으면 빈 DB를 반환합니다 (모든 생태계 미로드).
    ///
    /// # 보안 제한
    ///
    /// - 파일당 최대 50MB (`MAX_ADVISORY_FILE_SIZE`)
    /// - 전체 엔트리 최대 1,000,000개 (`MAX_ADVISORY_ENTRIES`)
    ///
    /// # Note
    ///
    /// 이 함수는 동기 I/O를 수행합니다. async 컨텍스트에서 호출할 때는
    /// `tokio::task::spawn_blocking`으로 감싸세요.
    pub fn load_from_dir(dir_path: &Path) -> Result<Self, RegistryError> {
        if !dir_path.is_dir() {
            tracing::warn!(path = %dir_path.display(), "advisory db directory not found");
            return Ok(Self::empty());
        }

        let mut all_entries = Vec::new();
        let mut loaded_ecosystems = BTreeSet::new();

        for ecosystem in Ecosystem::ALL {
            let file_path = dir_path.join(ecosystem.advisory_file());

            let metadata = match std::fs::metadata(&file_path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %file_path.display(), "advisory file not found, skipping");
                    continue;
                }
                Err(e) => {
                    return Err(RegistryError::AdvisoryLoad {
                        path: file_path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            let file_size = metadata.len();
            if file_size > MAX_ADVISORY_FILE_SIZE {
                return Err(RegistryError::AdvisoryLoad {
                    path: file_path.display().to_string(),
                    reason: format!(
                        "file size {} bytes exceeds maximum {} bytes",
                        file_size, MAX_ADVISORY_FILE_SIZE
                    ),
                });
            }

            let content =
                std::fs::read_to_string(&file_path).map_err(|e| RegistryError::AdvisoryLoad {
                    path: file_path.display().to_string(),
                    reason: e.to_string(),
                })?;

            let entries: Vec<AdvisoryEntry> = serde_json::from_str(&content).map_err(|e| {
                RegistryError::AdvisoryParse(format!("failed to parse {}: {e}", file_path.display()))
            })?;

            loaded_ecosystems.insert(ecosystem);

            if all_entries.len() + entries.len() > MAX_ADVISORY_ENTRIES {
                tracing::warn!(
                    current = all_entries.len(),
                    new = entries.len(),
                    max = MAX_ADVISORY_ENTRIES,
                    "advisory entry limit reached, truncating"
                );
                let remaining = MAX_ADVISORY_ENTRIES.saturating_sub(all_entries.len());
                all_entries.extend(entries.into_iter().take(remaining));
                break;
            }

            tracing::info!(
                path = %file_path.display(),
                entries = entries.len(),
                "loaded advisory file"
            );

            all_entries.extend(entries);
        }

        let index = Self::build_index(&all_entries);
        Ok(Self {
            entries: all_entries,
            index,
            loaded_ecosystems,
        })
    }

    /// 데이터베이스 내 전체 엔트리 수를 반환합니다.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// 해당 생태계의 어드바이저리 파일이 로드되었는지 반환합니다.
    ///
    /// `false`면 해당 생태계의 취약점 검사는 skipped로 처리되어야 합니다.
    pub fn has_ecosystem(&self, ecosystem: Ecosystem) -> bool {
        self.loaded_ecosystems.contains(&ecosystem)
    }

    /// 패키지 이름과 생태계로 어드바이저리를 조회합니다.
    ///
    /// O(1) 인덱스 조회를 통해 일치하는 모든 엔트리의 참조를 반환합니다.
    pub fn lookup(&self, package: &str, ecosystem: Ecosystem) -> Vec<&AdvisoryEntry> {
        let key = (package.to_owned(), ecosystem);
        if let Some(indices) = self.index.get(&key) {
            indices
                .iter()
                .filter_map(|&idx| self.entries.get(idx))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// 전체 엔트리에 대한 참조를 반환합니다.
    pub fn entries(&self) -> &[AdvisoryEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<AdvisoryEntry> {
        vec![
            AdvisoryEntry {
                advisory_id: "CVE-2024-0001".to_owned(),
                package: "lodash".to_owned(),
                ecosystem: Ecosystem::Npm,
                affected_ranges: vec![VersionRange {
                    introduced: Some("4.0.0".to_owned()),
                    fixed: Some("4.17.21".to_owned()),
                }],
                fixed_version: Some("4.17.21".to_owned()),
                severity: Severity::High,
                title: "Prototype pollution".to_owned(),
                published: "2024-01-01".to_owned(),
            },
            AdvisoryEntry {
                advisory_id: "RUSTSEC-2024-0002".to_owned(),
                package: "time".to_owned(),
                ecosystem: Ecosystem::Cargo,
                affected_ranges: vec![VersionRange {
                    introduced: Some("0.1.0".to_owned()),
                    fixed: None,
                }],
                fixed_version: None,
                severity: Severity::Low,
                title: "Segfault in localtime_r".to_owned(),
                published: "2024-02-01".to_owned(),
            },
        ]
    }

    #[test]
    fn empty_db() {
        let db = AdvisoryDb::empty();
        assert_eq!(db.entry_count(), 0);
        assert!(db.lookup("anything", Ecosystem::Npm).is_empty());
        assert!(!db.has_ecosystem(Ecosystem::Npm));
    }

    #[test]
    fn from_entries_builds_index() {
        let db = AdvisoryDb::from_entries(sample_entries());
        assert_eq!(db.entry_count(), 2);
        assert!(db.has_ecosystem(Ecosystem::Npm));
        assert!(db.has_ecosystem(Ecosystem::Cargo));
        assert!(!db.has_ecosystem(Ecosystem::Go));
    }

    #[test]
    fn lookup_by_package_and_ecosystem() {
        let db = AdvisoryDb::from_entries(sample_entries());

        let results = db.lookup("lodash", Ecosystem::Npm);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].advisory_id, "CVE-2024-0001");

        let results = db.lookup("time", Ecosystem::Cargo);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn lookup_wrong_ecosystem_returns_empty() {
        let db = AdvisoryDb::from_entries(sample_entries());
        // lodash exists for Npm but not Cargo
        assert!(db.lookup("lodash", Ecosystem::Cargo).is_empty());
    }

    #[test]
    fn from_json_valid() {
        let json = r#"[
            {
                "advisory_id": "CVE-2024-9999",
                "package": "test-pkg",
                "ecosystem": "Npm",
                "affected_ranges": [],
                "fixed_version": null,
                "severity": "Moderate",
                "title": "Test",
                "published": "2024-01-01"
            }
        ]"#;

        let db = AdvisoryDb::from_json(json).unwrap();
        assert_eq!(db.entry_count(), 1);
        assert_eq!(db.entries()[0].advisory_id, "CVE-2024-9999");
    }

    #[test]
    fn from_json_invalid() {
        assert!(AdvisoryDb::from_json("not json").is_err());
    }

    #[test]
    fn from_json_missing_required_fields() {
        let result = AdvisoryDb::from_json(r#"[ { "advisory_id": "CVE-1" } ]"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_from_dir_nonexistent_directory_is_empty() {
        let db = AdvisoryDb::load_from_dir(Path::new("/nonexistent/advisory/dir")).unwrap();
        assert_eq!(db.entry_count(), 0);
        for eco in Ecosystem::ALL {
            assert!(!db.has_ecosystem(eco));
        }
    }

    #[test]
    fn load_from_dir_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db = AdvisoryDb::load_from_dir(tmp.path()).unwrap();
        assert_eq!(db.entry_count(), 0);
        assert!(!db.has_ecosystem(Ecosystem::Npm));
    }

    #[test]
    fn load_from_dir_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("npm.json"),
            r#"[
            {
                "advisory_id": "CVE-2024-0001",
                "package": "lodash",
                "ecosystem": "Npm",
                "affected_ranges": [],
                "fixed_version": null,
                "severity": "High",
                "title": "test",
                "published": "2024-01-01"
            }
        ]"#,
        )
        .unwrap();

        let db = AdvisoryDb::load_from_dir(tmp.path()).unwrap();
        assert_eq!(db.entry_count(), 1);
        assert!(db.has_ecosystem(Ecosystem::Npm));
        // cargo.json이 없으므로 cargo는 미로드
        assert!(!db.has_ecosystem(Ecosystem::Cargo));
    }

    #[test]
    fn load_from_dir_empty_file_counts_as_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("cargo.json"), "[]").unwrap();

        let db = AdvisoryDb::load_from_dir(tmp.path()).unwrap();
        assert_eq!(db.entry_count(), 0);
        // 빈 파일이라도 소스 자체는 존재 → 검사 수행 가능
        assert!(db.has_ecosystem(Ecosystem::Cargo));
    }

    #[test]
    fn load_from_dir_invalid_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("npm.json"), "invalid json").unwrap();

        let result = AdvisoryDb::load_from_dir(tmp.path());
        assert!(matches!(result, Err(RegistryError::AdvisoryParse(_))));
    }

    #[test]
    fn multiple_advisories_same_package() {
        let mut entries = sample_entries();
        entries.push(AdvisoryEntry {
            advisory_id: "CVE-2024-0003".to_owned(),
            package: "lodash".to_owned(),
            ecosystem: Ecosystem::Npm,
            affected_ranges: vec![],
            fixed_version: None,
            severity: Severity::Critical,
            title: "Second vuln".to_owned(),
            published: "2024-03-01".to_owned(),
        });
        let db = AdvisoryDb::from_entries(entries);
        assert_eq!(db.lookup("lodash", Ecosystem::Npm).len(), 2);
    }

    #[test]
    fn version_range_serialization() {
        let range = VersionRange {
            introduced: Some("1.0.0".to_owned()),
            fixed: Some("1.0.5".to_owned()),
        };
        let json = serde_json::to_string(&range).unwrap();
        let parsed: VersionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.introduced, Some("1.0.0".to_owned()));
        assert_eq!(parsed.fixed, Some("1.0.5".to_owned()));
    }
}
