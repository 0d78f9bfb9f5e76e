//! 소스 트리 순회 -- 매니페스트 탐색 및 선언 파싱
//!
//! [`ManifestScanner`]는 루트 디렉토리를 재귀적으로 순회하여 매니페스트를
//! 수집하고, 등록된 어댑터로 의존성 선언을 파싱합니다.
//!
//! 읽을 수 없는 하위 경로는 런을 실패시키지 않고 경고 로그와 함께
//! 건너뜁니다 (부분 결과). 파일시스템 읽기 외의 부수 효과는 없습니다.
//!
//! # Note
//!
//! 순회는 동기 I/O를 수행합니다. async 컨텍스트에서 호출할 때는
//! `tokio::task::spawn_blocking`으로 감싸세요.

use std::path::Path;

use tracing::{debug, warn};

use depmend_core::metrics as m;
use depmend_core::types::{DependencyDeclaration, ManifestFile};

use crate::adapter::{ManifestAdapter, default_adapters};
use crate::config::ScannerConfig;
use crate::detector::ManifestDetector;
use crate::error::ScannerError;

/// 스캔 결과
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// 발견된 매니페스트 (경로순 정렬)
    pub manifests: Vec<ManifestFile>,
    /// 파싱된 의존성 선언
    pub declarations: Vec<DependencyDeclaration>,
    /// 읽기/파싱 실패로 건너뛴 경로와 사유
    pub skipped: Vec<(String, String)>,
}

/// 매니페스트 스캐너
///
/// 디렉토리 순회, 매니페스트 분류, 선언 파싱의 전체 흐름을 담당합니다.
pub struct ManifestScanner {
    config: ScannerConfig,
    detector: ManifestDetector,
    adapters: Vec<Box<dyn ManifestAdapter>>,
}

impl ManifestScanner {
    /// 설정으로 스캐너를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정 유효성 검증 실패 시 `ScannerError::Config` 반환
    pub fn new(config: ScannerConfig) -> Result<Self, ScannerError> {
        config.validate()?;
        let detector = ManifestDetector::with_excluded(&config.exclude_ecosystems);
        Ok(Self {
            config,
            detector,
            adapters: default_adapters(),
        })
    }

    /// 스캐너 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// 루트 디렉토리를 스캔하여 매니페스트와 선언을 수집합니다.
    ///
    /// # 동작
    ///
    /// 1. 루트에서 재귀 순회 (제외 디렉토리/깊이 제한 적용)
    /// 2. [`ManifestDetector`]로 매니페스트 분류
    /// 3. 생태계 어댑터로 선언 파싱 (실패 시 건너뛰고 기록)
    ///
    /// 결과는 경로순으로 정렬되어 결정적입니다.
    ///
    /// # Errors
    ///
    /// 루트 디렉토리 자체가 존재하지 않거나 읽을 수 없으면 에러를 반환합니다.
    /// 하위 경로의 실패는 `skipped`에 기록되고 런은 계속됩니다.
    pub fn scan(&self) -> Result<ScanOutput, ScannerError> {
        let root = &self.config.root;
        if !root.is_dir() {
            return Err(ScannerError::Io {
                path: root.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "scan root is not a directory",
                ),
            });
        }

        let mut output = ScanOutput::default();
        self.walk_dir(root, 0, &mut output);

        output.manifests.sort_by(|a, b| a.path.cmp(&b.path));
        output
            .declarations
            .sort_by(|a, b| (&a.manifest_path, &a.name).cmp(&(&b.manifest_path, &b.name)));

        for manifest in &output.manifests {
            metrics::counter!(
                m::SCANNER_MANIFESTS_FOUND_TOTAL,
                m::LABEL_ECOSYSTEM => manifest.ecosystem.to_string()
            )
            .increment(1);
        }
        metrics::counter!(m::SCANNER_SKIPPED_PATHS_TOTAL)
            .increment(output.skipped.len() as u64);

        Ok(output)
    }

    /// 디렉토리를 재귀적으로 순회합니다.
    fn walk_dir(&self, dir: &Path, depth: usize, output: &mut ScanOutput) {
        if depth >= self.config.max_depth {
            debug!(dir = %dir.display(), depth, "max depth reached, not descending");
            return;
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory, skipping");
                output
                    .skipped
                    .push((dir.display().to_string(), e.to_string()));
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                    output
                        .skipped
                        .push((dir.display().to_string(), e.to_string()));
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read file type");
                    output
                        .skipped
                        .push((path.display().to_string(), e.to_string()));
                    continue;
                }
            };

            if file_type.is_dir() {
                let dir_name = entry.file_name();
                let dir_name = dir_name.to_string_lossy();
                if self
                    .config
                    .exclude_dirs
                    .iter()
                    .any(|ex| ex.as_str() == dir_name.as_ref())
                {
                    debug!(dir = %path.display(), "excluded directory, not descending");
                    continue;
                }
                self.walk_dir(&path, depth + 1, output);
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let Some(ecosystem) = self.detector.detect_ecosystem(&path) else {
                continue;
            };

            match self.parse_manifest(&path, ecosystem) {
                Ok(declarations) => {
                    metrics::counter!(
                        m::SCANNER_DECLARATIONS_TOTAL,
                        m::LABEL_ECOSYSTEM => ecosystem.to_string()
                    )
                    .increment(declarations.len() as u64);

                    output.manifests.push(ManifestFile {
                        path: path.clone(),
                        ecosystem,
                    });
                    output.declarations.extend(declarations);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse manifest, skipping");
                    output
                        .skipped
                        .push((path.display().to_string(), e.to_string()));
                }
            }
        }
    }

    /// 단일 매니페스트를 읽고 파싱합니다.
    fn parse_manifest(
        &self,
        path: &Path,
        ecosystem: depmend_core::types::Ecosystem,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScannerError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.config.max_file_size {
            return Err(ScannerError::FileTooBig {
                path: path.display().to_string(),
                size: file_size,
                max: self.config.max_file_size,
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ScannerError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let adapter = self
            .adapters
            .iter()
            .find(|a| a.ecosystem() == ecosystem)
            .ok_or_else(|| ScannerError::ManifestParse {
                path: path.display().to_string(),
                reason: format!("no adapter registered for ecosystem {ecosystem}"),
            })?;

        adapter.parse(&content, path)
    }
}
