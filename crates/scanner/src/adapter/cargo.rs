//! Cargo.toml 어댑터
//!
//! [`CargoAdapter`]는 Cargo.toml의 `[dependencies]` / `[dev-dependencies]`
//! 섹션에서 최상위 의존성 선언을 파싱합니다.
//!
//! # 처리하는 선언 형태
//!
//! ```toml
//! [dependencies]
//! serde = "1.0"
//! tokio = { version = "1.35", features = ["full"] }
//!
//! [dependencies.uuid]
//! version = "1"
//! ```
//!
//! version 키가 없는 path/git 의존성은 레지스트리 대상이 아니므로 건너뜁니다.

use std::path::Path;

use serde::Deserialize;

use depmend_core::types::{DependencyDeclaration, DependencySection, Ecosystem};

use crate::adapter::{ManifestAdapter, toml_edit};
use crate::error::ScannerError;

/// Cargo.toml 어댑터
pub struct CargoAdapter;

/// Cargo.toml 구조 (파싱용)
#[derive(Deserialize)]
struct CargoManifest {
    #[serde(default)]
    dependencies: Option<toml::Table>,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: Option<toml::Table>,
}

impl ManifestAdapter for CargoAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "Cargo.toml")
    }

    fn parse(
        &self,
        content: &str,
        manifest_path: &Path,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let parsed: CargoManifest =
            toml::from_str(content).map_err(|e| ScannerError::ManifestParse {
                path: manifest_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut declarations = Vec::new();

        for (section, table) in [
            (DependencySection::Runtime, &parsed.dependencies),
            (DependencySection::Dev, &parsed.dev_dependencies),
        ] {
            if let Some(table) = table {
                for (name, value) in table {
                    let requested = match value {
                        toml::Value::String(s) => s.clone(),
                        toml::Value::Table(t) => match t.get("version").and_then(|v| v.as_str()) {
                            Some(v) => v.to_owned(),
                            None => continue, // path/git 의존성
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
            &["dependencies", "dev-dependencies"],
            package,
            new_requested,
        )
        .ok_or_else(|| ScannerError::PackageNotDeclared {
            path: "Cargo.toml".to_owned(),
            package: package.to_owned(),
        })
    }
}
