//! 매니페스트 탐지기 -- 파일명으로 생태계 분류
//!
//! [`ManifestDetector`]는 디렉토리 순회 중 만난 파일이 지원되는
//! 패키지 매니페스트인지 판별하고 생태계를 분류합니다.

use std::path::Path;

use depmend_core::types::Ecosystem;

/// 매니페스트 탐지기
///
/// 알려진 매니페스트 파일명 목록을 기반으로 파일 이름 매칭을 수행합니다.
pub struct ManifestDetector {
    /// 알려진 매니페스트 파일명 목록
    known_filenames: Vec<(String, Ecosystem)>,
}

impl ManifestDetector {
    /// 기본 매니페스트 패턴으로 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self {
            known_filenames: Ecosystem::ALL
                .iter()
                .map(|eco| (eco.manifest_name().to_owned(), *eco))
                .collect(),
        }
    }

    /// 제외 생태계를 반영한 탐지기를 생성합니다.
    pub fn with_excluded(excluded: &[Ecosystem]) -> Self {
        Self {
            known_filenames: Ecosystem::ALL
                .iter()
                .filter(|eco| !excluded.contains(eco))
                .map(|eco| (eco.manifest_name().to_owned(), *eco))
                .collect(),
        }
    }

    /// 알려진 매니페스트 파일명 목록을 반환합니다.
    pub fn known_filenames(&self) -> &[(String, Ecosystem)] {
        &self.known_filenames
    }

    /// 주어진 경로가 알려진 매니페스트인지 확인합니다.
    pub fn is_manifest(&self, path: &Path) -> bool {
        self.detect_ecosystem(path).is_some()
    }

    /// 매니페스트의 생태계를 반환합니다.
    pub fn detect_ecosystem(&self, path: &Path) -> Option<Ecosystem> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;

        self.known_filenames
            .iter()
            .find(|(known, _)| known == file_name)
            .map(|(_, eco)| *eco)
    }
}

impl Default for ManifestDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detector_recognizes_package_json() {
        let detector = ManifestDetector::new();
        let path = PathBuf::from("/project/package.json");
        assert!(detector.is_manifest(&path));
        assert_eq!(detector.detect_ecosystem(&path), Some(Ecosystem::Npm));
    }

    #[test]
    fn detector_recognizes_cargo_toml() {
        let detector = ManifestDetector::new();
        let path = PathBuf::from("/project/Cargo.toml");
        assert!(detector.is_manifest(&path));
        assert_eq!(detector.detect_ecosystem(&path), Some(Ecosystem::Cargo));
    }

    #[test]
    fn detector_recognizes_requirements_txt() {
        let detector = ManifestDetector::new();
        assert_eq!(
            detector.detect_ecosystem(Path::new("requirements.txt")),
            Some(Ecosystem::Pip)
        );
    }

    #[test]
    fn detector_recognizes_pipfile_and_go_mod() {
        let detector = ManifestDetector::new();
        assert_eq!(
            detector.detect_ecosystem(Path::new("Pipfile")),
            Some(Ecosystem::Pipenv)
        );
        assert_eq!(
            detector.detect_ecosystem(Path::new("go.mod")),
            Some(Ecosystem::Go)
        );
    }

    #[test]
    fn detector_rejects_lockfiles() {
        let detector = ManifestDetector::new();
        assert!(!detector.is_manifest(Path::new("package-lock.json")));
        assert!(!detector.is_manifest(Path::new("Cargo.lock")));
        assert!(!detector.is_manifest(Path::new("go.sum")));
    }

    #[test]
    fn detector_rejects_unknown_file() {
        let detector = ManifestDetector::new();
        let path = PathBuf::from("/project/unknown.txt");
        assert!(!detector.is_manifest(&path));
        assert_eq!(detector.detect_ecosystem(&path), None);
    }

    #[test]
    fn detector_rejects_empty_path() {
        let detector = ManifestDetector::new();
        assert!(!detector.is_manifest(Path::new("")));
    }

    #[test]
    fn detector_with_excluded_skips_ecosystem() {
        let detector = ManifestDetector::with_excluded(&[Ecosystem::Go]);
        assert!(!detector.is_manifest(Path::new("go.mod")));
        assert!(detector.is_manifest(Path::new("package.json")));
        assert_eq!(detector.known_filenames().len(), 4);
    }

    #[test]
    fn detector_known_filenames() {
        let detector = ManifestDetector::new();
        assert_eq!(detector.known_filenames().len(), 5);
    }
}
