//! Python 어댑터 -- requirements.txt 및 Pipfile
//!
//! [`PipAdapter`]는 라인 기반 requirements.txt를,
//! [`PipenvAdapter`]는 TOML 기반 Pipfile을 처리합니다.
//!
//! # requirements.txt 형식 예시
//!
//! ```text
//! requests==2.31.0
//! flask>=2.0,<3.0
//! numpy~=1.26  # pinned for ABI
//! ```
//!
//! # Pipfile 형식 예시
//!
//! ```toml
//! [packages]
//! requests = "==2.31.0"
//! flask = { version = ">=2.0", extras = ["async"] }
//!
//! [dev-packages]
//! pytest = "*"
//! ```

use std::path::Path;

use serde::Deserialize;

use depmend_core::types::{DependencyDeclaration, DependencySection, Ecosystem};

use crate::adapter::{ManifestAdapter, toml_edit};
use crate::error::ScannerError;

/// 버전 스펙 시작 문자
const SPEC_CHARS: [char; 5] = ['=', '<', '>', '!', '~'];

/// requirements.txt 어댑터
pub struct PipAdapter;

impl ManifestAdapter for PipAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pip
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "requirements.txt")
    }

    fn parse(
        &self,
        content: &str,
        manifest_path: &Path,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let mut declarations = Vec::new();

        for line in content.lines() {
            let Some((name, requested)) = parse_requirement_line(line) else {
                continue;
            };

            declarations.push(DependencyDeclaration {
                manifest_path: manifest_path.to_path_buf(),
                section: DependencySection::Runtime,
                name: name.to_owned(),
                requested: requested.to_owned(),
            });
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
        let mut replaced = false;

        for line in content.split_inclusive('\n') {
            if !replaced
                && let Some((name, _)) = parse_requirement_line(line)
                && name == package
            {
                result.push_str(&rewrite_requirement_line(line, new_requested));
                replaced = true;
                continue;
            }
            result.push_str(line);
        }

        if !replaced {
            return Err(ScannerError::PackageNotDeclared {
                path: "requirements.txt".to_owned(),
                package: package.to_owned(),
            });
        }

        Ok(result)
    }
}

/// requirements.txt 한 라인을 (이름, 요청 범위)로 파싱합니다.
///
/// 주석, 빈 라인, 옵션 라인(`-r`, `--index-url` 등)은 None을 반환합니다.
/// 버전 스펙이 없는 패키지는 범위 `"*"`로 취급합니다.
fn parse_requirement_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }

    // 환경 마커와 주석 제거
    let line = line.split(';').next().unwrap_or(line);
    let line = line.split('#').next().unwrap_or(line).trim();
    if line.is_empty() {
        return None;
    }

    let spec_start = line.find(SPEC_CHARS);
    let (name_part, spec) = match spec_start {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, "*"),
    };

    // extras 제거: "requests[security]" -> "requests"
    let name = name_part.split('[').next().unwrap_or(name_part).trim();
    if name.is_empty() {
        return None;
    }

    Some((name, spec))
}

/// 요청 라인의 버전 스펙 부분만 새 값으로 교체합니다.
///
/// 환경 마커(`;`)와 주석(`#`) 접미는 그대로 보존됩니다.
fn rewrite_requirement_line(line: &str, new_requested: &str) -> String {
    // 스펙 교체 구간: 첫 스펙 문자부터 스펙 끝(공백 제외)까지
    let suffix_start = line.find([';', '#']).unwrap_or(line.len());
    let (head, tail) = line.split_at(suffix_start);
    let content_end = head.trim_end().len();
    let ws = &head[content_end..];
    let spec_start = head.find(SPEC_CHARS).unwrap_or(content_end);
    let name_part = head[..spec_start].trim_end();
    format!("{name_part}{new_requested}{ws}{tail}")
}

/// Pipfile 어댑터
pub struct PipenvAdapter;

/// Pipfile 구조 (파싱용)
#[derive(Deserialize)]
struct Pipfile {
    #[serde(default)]
    packages: Option<toml::Table>,
    #[serde(default, rename = "dev-packages")]
    dev_packages: Option<toml::Table>,
}

impl ManifestAdapter for PipenvAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pipenv
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "Pipfile")
    }

    fn parse(
        &self,
        content: &str,
        manifest_path: &Path,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let parsed: Pipfile = toml::from_str(content).map_err(|e| ScannerError::ManifestParse {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut declarations = Vec::new();

        for (section, table) in [
            (DependencySection::Runtime, &parsed.packages),
            (DependencySection::Dev, &parsed.dev_packages),
        ] {
            if let Some(table) = table {
                for (name, value) in table {
                    let requested = match value {
                        toml::Value::String(s) => s.clone(),
                        toml::Value::Table(t) => match t.get("version").and_then(|v| v.as_str()) {
                            Some(v) => v.to_owned(),
                            None => continue, // git/path 참조
                        },
                        _ => continue,
                    };

                    declarations.push(DependencyDeclaration {
                        manifest_path: manifest_path.to_path_buf(),
                        section,
                        name: name.clone(),
                        requested,
                    });
                }
            }
        }

        declarations.sort_by(|a, b| (a.section as u8, &a.name).cmp(&(b.section as u8, &b.name)));
        Ok(declarations)
    }

    fn set_version(
        &self,
        content: &str,
        package: &str,
        new_requested: &str,
    ) -> Result<String, ScannerError> {
        toml_edit::set_version_in_sections(
            content,
            &["packages", "dev-packages"],
            package,
            new_requested,
        )
        .ok_or_else(|| ScannerError::PackageNotDeclared {
            path: "Pipfile".to_owned(),
            package: package.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUIREMENTS: &str = "\
# production dependencies
requests==2.31.0
flask>=2.0,<3.0
numpy~=1.26  # pinned for ABI
gunicorn

-r dev-requirements.txt
";

    const SAMPLE_PIPFILE: &str = r#"[[source]]
url = "https://pypi.org/simple"
verify_ssl = true
name = "pypi"

[packages]
requests = "==2.31.0"
flask = { version = ">=2.0", extras = ["async"] }

[dev-packages]
pytest = "*"
"#;

    // --- PipAdapter ---

    #[test]
    fn pip_can_handle_requirements_txt() {
        let adapter = PipAdapter;
        assert!(adapter.can_handle(Path::new("requirements.txt")));
        assert!(!adapter.can_handle(Path::new("requirements-dev.txt")));
        assert!(!adapter.can_handle(Path::new("Pipfile")));
    }

    #[test]
    fn pip_parse_sample() {
        let adapter = PipAdapter;
        let decls = adapter
            .parse(SAMPLE_REQUIREMENTS, Path::new("/app/requirements.txt"))
            .unwrap();

        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].name, "flask");
        assert_eq!(decls[0].requested, ">=2.0,<3.0");
        assert_eq!(decls[1].name, "gunicorn");
        assert_eq!(decls[1].requested, "*");
        assert_eq!(decls[2].name, "numpy");
        assert_eq!(decls[2].requested, "~=1.26");
        assert_eq!(decls[3].name, "requests");
        assert_eq!(decls[3].requested, "==2.31.0");
    }

    #[test]
    fn pip_parse_skips_comments_and_options() {
        let adapter = PipAdapter;
        let decls = adapter
            .parse(
                "# only comments\n--index-url https://example.com\n\n",
                Path::new("requirements.txt"),
            )
            .unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn pip_parse_strips_extras() {
        let adapter = PipAdapter;
        let decls = adapter
            .parse("requests[security]==2.31.0\n", Path::new("requirements.txt"))
            .unwrap();
        assert_eq!(decls[0].name, "requests");
    }

    #[test]
    fn pip_parse_strips_env_markers() {
        let adapter = PipAdapter;
        let decls = adapter
            .parse(
                "pywin32==306; sys_platform == 'win32'\n",
                Path::new("requirements.txt"),
            )
            .unwrap();
        assert_eq!(decls[0].name, "pywin32");
        assert_eq!(decls[0].requested, "==306");
    }

    #[test]
    fn pip_set_version_rewrites_target_line() {
        let adapter = PipAdapter;
        let updated = adapter
            .set_version(SAMPLE_REQUIREMENTS, "requests", "==2.32.0")
            .unwrap();
        assert!(updated.contains("requests==2.32.0"));
        assert!(updated.contains("flask>=2.0,<3.0"));
        assert!(updated.contains("# production dependencies"));
    }

    #[test]
    fn pip_set_version_preserves_comment_suffix() {
        let adapter = PipAdapter;
        let updated = adapter
            .set_version(SAMPLE_REQUIREMENTS, "numpy", "~=1.27")
            .unwrap();
        assert!(updated.contains("numpy~=1.27  # pinned for ABI"));
    }

    #[test]
    fn pip_set_version_bare_package() {
        let adapter = PipAdapter;
        let updated = adapter
            .set_version("gunicorn\n", "gunicorn", "==21.2.0")
            .unwrap();
        assert_eq!(updated, "gunicorn==21.2.0\n");
    }

    #[test]
    fn pip_set_version_missing_package_fails() {
        let adapter = PipAdapter;
        let result = adapter.set_version(SAMPLE_REQUIREMENTS, "django", "==5.0");
        assert!(matches!(
            result,
            Err(ScannerError::PackageNotDeclared { .. })
        ));
    }

    // --- PipenvAdapter ---

    #[test]
    fn pipenv_can_handle_pipfile() {
        let adapter = PipenvAdapter;
        assert!(adapter.can_handle(Path::new("Pipfile")));
        assert!(!adapter.can_handle(Path::new("Pipfile.lock")));
    }

    #[test]
    fn pipenv_parse_sample() {
        let adapter = PipenvAdapter;
        let decls = adapter
            .parse(SAMPLE_PIPFILE, Path::new("/app/Pipfile"))
            .unwrap();

        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].name, "flask");
        assert_eq!(decls[0].requested, ">=2.0");
        assert_eq!(decls[0].section, DependencySection::Runtime);
        assert_eq!(decls[1].name, "requests");
        assert_eq!(decls[2].name, "pytest");
        assert_eq!(decls[2].requested, "*");
        assert_eq!(decls[2].section, DependencySection::Dev);
    }

    #[test]
    fn pipenv_parse_invalid_toml_returns_error() {
        let adapter = PipenvAdapter;
        let result = adapter.parse("[packages\nbad", Path::new("Pipfile"));
        assert!(matches!(result, Err(ScannerError::ManifestParse { .. })));
    }

    #[test]
    fn pipenv_set_version_string_form() {
        let adapter = PipenvAdapter;
        let updated = adapter
            .set_version(SAMPLE_PIPFILE, "requests", "==2.32.0")
            .unwrap();
        assert!(updated.contains("requests = \"==2.32.0\""));
        // [[source]] 섹션은 그대로
        assert!(updated.contains("url = \"https://pypi.org/simple\""));
    }

    #[test]
    fn pipenv_set_version_inline_table_form() {
        let adapter = PipenvAdapter;
        let updated = adapter
            .set_version(SAMPLE_PIPFILE, "flask", ">=3.0")
            .unwrap();
        assert!(updated.contains("flask = { version = \">=3.0\", extras = [\"async\"] }"));
    }

    #[test]
    fn pipenv_set_version_missing_package_fails() {
        let adapter = PipenvAdapter;
        let result = adapter.set_version(SAMPLE_PIPFILE, "django", "==5.0");
        assert!(matches!(
            result,
            Err(ScannerError::PackageNotDeclared { .. })
        ));
    }
}
