//! go.mod 어댑터
//!
//! [`GoAdapter`]는 go.mod의 require 지시문에서 직접 의존성을 파싱합니다.
//! `// indirect` 주석이 붙은 전이 의존성은 최상위 선언이 아니므로 건너뜁니다.
//!
//! # go.mod 형식 예시
//!
//! ```text
//! module example.com/app
//!
//! go 1.22
//!
//! require (
//!     github.com/pkg/errors v0.9.1
//!     golang.org/x/sync v0.7.0 // indirect
//! )
//!
//! require github.com/single/dep v1.0.0
//! ```

use std::path::Path;

use depmend_core::types::{DependencyDeclaration, DependencySection, Ecosystem};

use crate::adapter::ManifestAdapter;
use crate::error::ScannerError;

/// go.mod 어댑터
pub struct GoAdapter;

impl ManifestAdapter for GoAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "go.mod")
    }

    fn parse(
        &self,
        content: &str,
        manifest_path: &Path,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let mut declarations = Vec::new();
        let mut in_require_block = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if in_require_block {
                if trimmed == ")" {
                    in_require_block = false;
                    continue;
                }
                if let Some((module, version)) = parse_require_entry(trimmed) {
                    declarations.push(DependencyDeclaration {
                        manifest_path: manifest_path.to_path_buf(),
                        section: DependencySection::Runtime,
                        name: module.to_owned(),
                        requested: version.to_owned(),
                    });
                }
                continue;
            }

            if trimmed == "require (" {
                in_require_block = true;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("require ")
                && let Some((module, version)) = parse_require_entry(rest.trim())
            {
                declarations.push(DependencyDeclaration {
                    manifest_path: manifest_path.to_path_buf(),
                    section: DependencySection::Runtime,
                    name: module.to_owned(),
                    requested: version.to_owned(),
                });
            }
        }

        declarations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(declarations)
    }

    fn set_version(
        &self,
        content: &str,
        package: &str,
        new_requested: &str,
    ) -> Result<String, ScannerError> {
        let mut result = String::with_capacity(content.len());
        let mut in_require_block = false;
        let mut replaced = false;

        for line in content.split_inclusive('\n') {
            let trimmed = line.trim();

            if trimmed == "require (" {
                in_require_block = true;
            } else if in_require_block && trimmed == ")" {
                in_require_block = false;
            }

            let in_require_context = in_require_block || trimmed.starts_with("require ");

            if !replaced
                && in_require_context
                && let Some(new_line) = rewrite_require_line(line, package, new_requested)
            {
                result.push_str(&new_line);
                replaced = true;
                continue;
            }

            result.push_str(line);
        }

        if !replaced {
            return Err(ScannerError::PackageNotDeclared {
                path: "go.mod".to_owned(),
                package: package.to_owned(),
            });
        }

        Ok(result)
    }
}

/// require 엔트리 한 줄을 (모듈 경로, 버전)으로 파싱합니다.
///
/// `// indirect` 주석이 붙은 엔트리와 빈/주석 라인은 None을 반환합니다.
fn parse_require_entry(entry: &str) -> Option<(&str, &str)> {
    if entry.is_empty() || entry.starts_with("//") {
        return None;
    }

    if entry.ends_with("// indirect") {
        return None;
    }

    let mut parts = entry.split_whitespace();
    let module = parts.next()?;
    let version = parts.next()?;

    if !version.starts_with('v') {
        return None;
    }

    Some((module, version))
}

/// require 라인에서 대상 모듈의 버전 토큰만 교체합니다.
///
/// 버전 뒤의 주석 접미는 그대로 보존됩니다.
fn rewrite_require_line(line: &str, package: &str, new_requested: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let body = trimmed.strip_prefix("require ").unwrap_or(trimmed);

    let mut parts = body.split_whitespace();
    if parts.next()? != package {
        return None;
    }
    let version = parts.next()?;

    // 모듈 경로 뒤의 버전 토큰 위치를 원본 라인에서 찾아 교체
    let module_pos = line.find(package)?;
    let after_module = &line[module_pos + package.len()..];
    let version_pos = after_module.find(version)?;
    let version_end = module_pos + package.len() + version_pos + version.len();

    let mut new_line =
        String::with_capacity(line.len() - version.len() + new_requested.len());
    new_line.push_str(&line[..module_pos + package.len() + version_pos]);
    new_line.push_str(new_requested);
    new_line.push_str(&line[version_end..]);
    Some(new_line)
}
