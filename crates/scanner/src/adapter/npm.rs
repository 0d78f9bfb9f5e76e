//! package.json 어댑터
//!
//! [`NpmAdapter`]는 NPM의 package.json에서 최상위 의존성 선언을 파싱하고
//! 단일 선언을 바이트 보존 방식으로 재작성합니다.
//!
//! # package.json 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "dependencies": { "lodash": "^4.17.21" },
//!   "devDependencies": { "jest": "^29.0.0" }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use depmend_core::types::{DependencyDeclaration, DependencySection, Ecosystem};

use crate::adapter::ManifestAdapter;
use crate::error::ScannerError;

/// package.json 어댑터
pub struct NpmAdapter;

/// package.json 구조 (파싱용)
#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: Option<HashMap<String, String>>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: Option<HashMap<String, String>>,
}

impl ManifestAdapter for NpmAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "package.json")
    }

    fn parse(
        &self,
        content: &str,
        manifest_path: &Path,
    ) -> Result<Vec<DependencyDeclaration>, ScannerError> {
        let parsed: PackageJson =
            serde_json::from_str(content).map_err(|e| ScannerError::ManifestParse {
                path: manifest_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut declarations = Vec::new();

        for (section, deps) in [
            (DependencySection::Runtime, &parsed.dependencies),
            (DependencySection::Dev, &parsed.dev_dependencies),
        ] {
            if let Some(deps) = deps {
                for (name, requested) in deps {
                    declarations.push(DependencyDeclaration {
                        manifest_path: manifest_path.to_path_buf(),
                        section,
                        name: name.clone(),
                        requested: requested.clone(),
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
        // 키 "package" 뒤에 콜론과 따옴표로 감싼 버전이 오는 지점만 치환.
        // 최상위 "name" 필드의 값으로 패키지명이 등장하는 경우는 콜론이
        // 뒤따르지 않으므로 건너뛰어진다.
        let needle = format!("\"{package}\"");
        let mut result = String::with_capacity(content.len());
        let mut rest = content;
        let mut replaced = false;

        while let Some(pos) = rest.find(&needle) {
            let (before, after_key) = rest.split_at(pos + needle.len());
            result.push_str(before);

            let trimmed = after_key.trim_start();
            if let Some(after_colon) = trimmed.strip_prefix(':') {
                let value_part = after_colon.trim_start();
                if let Some(after_quote) = value_part.strip_prefix('"')
                    && let Some(close) = after_quote.find('"')
                {
                    // 따옴표 사이의 기존 버전을 새 버전으로 치환
                    let ws_colon_len = after_key.len() - after_quote.len();
                    result.push_str(&after_key[..ws_colon_len]);
                    result.push_str(new_requested);
                    rest = &after_quote[close..];
                    replaced = true;
                    continue;
                }
            }

            // 콜론이 뒤따르지 않는 등장 (값 위치) -- 그대로 두고 진행
            rest = after_key;
        }
        result.push_str(rest);

        if !replaced {
            return Err(ScannerError::PackageNotDeclared {
                path: "package.json".to_owned(),
                package: package.to_owned(),
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PACKAGE_JSON: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "dependencies": {
    "lodash": "^4.17.21",
    "express": "^4.18.2"
  },
  "devDependencies": {
    "jest": "^29.0.0"
  }
}"#;

    #[test]
    fn can_handle_package_json() {
        let adapter = NpmAdapter;
        assert!(adapter.can_handle(Path::new("package.json")));
        assert!(adapter.can_handle(Path::new("/project/package.json")));
        assert!(!adapter.can_handle(Path::new("package-lock.json")));
        assert!(!adapter.can_handle(Path::new("Cargo.toml")));
    }

    #[test]
    fn parse_sample_package_json() {
        let adapter = NpmAdapter;
        let decls = adapter
            .parse(SAMPLE_PACKAGE_JSON, Path::new("/app/package.json"))
            .unwrap();

        assert_eq!(decls.len(), 3);
        // runtime 섹션이 먼저, 이름순 정렬
        assert_eq!(decls[0].name, "express");
        assert_eq!(decls[0].section, DependencySection::Runtime);
        assert_eq!(decls[1].name, "lodash");
        assert_eq!(decls[1].requested, "^4.17.21");
        assert_eq!(decls[2].name, "jest");
        assert_eq!(decls[2].section, DependencySection::Dev);
        assert_eq!(decls[2].manifest_path, Path::new("/app/package.json"));
    }

    #[test]
    fn parse_no_dependency_sections() {
        let adapter = NpmAdapter;
        let decls = adapter
            .parse(r#"{ "name": "empty" }"#, Path::new("package.json"))
            .unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn parse_invalid_json_returns_error() {
        let adapter = NpmAdapter;
        let result = adapter.parse("not json!", Path::new("package.json"));
        assert!(matches!(result, Err(ScannerError::ManifestParse { .. })));
    }

    #[test]
    fn set_version_rewrites_only_target() {
        let adapter = NpmAdapter;
        let updated = adapter
            .set_version(SAMPLE_PACKAGE_JSON, "lodash", "^4.18.0")
            .unwrap();

        assert!(updated.contains("\"lodash\": \"^4.18.0\""));
        // 다른 선언과 포맷은 그대로
        assert!(updated.contains("\"express\": \"^4.18.2\""));
        assert!(updated.contains("\"jest\": \"^29.0.0\""));
        assert!(updated.contains("\"name\": \"my-app\""));
        assert_eq!(updated.len(), SAMPLE_PACKAGE_JSON.len() - 1); // "^4.18.0" is 1 byte shorter
    }

    #[test]
    fn set_version_does_not_touch_name_value() {
        // 패키지명이 최상위 name 필드의 값으로 등장해도 치환하지 않음
        let content = r#"{
  "name": "lodash",
  "dependencies": {
    "lodash": "^4.17.21"
  }
}"#;
        let adapter = NpmAdapter;
        let updated = adapter.set_version(content, "lodash", "^5.0.0").unwrap();
        assert!(updated.contains("\"name\": \"lodash\""));
        assert!(updated.contains("\"lodash\": \"^5.0.0\""));
    }

    #[test]
    fn set_version_missing_package_fails() {
        let adapter = NpmAdapter;
        let result = adapter.set_version(SAMPLE_PACKAGE_JSON, "nonexistent", "^1.0.0");
        assert!(matches!(
            result,
            Err(ScannerError::PackageNotDeclared { .. })
        ));
    }

    #[test]
    fn set_version_scoped_package() {
        let content = r#"{
  "dependencies": {
    "@types/node": "^20.0.0"
  }
}"#;
        let adapter = NpmAdapter;
        let updated = adapter
            .set_version(content, "@types/node", "^22.0.0")
            .unwrap();
        assert!(updated.contains("\"@types/node\": \"^22.0.0\""));
    }

    #[test]
    fn parse_then_set_version_roundtrip_parses() {
        let adapter = NpmAdapter;
        let updated = adapter
            .set_version(SAMPLE_PACKAGE_JSON, "express", "^5.0.0")
            .unwrap();
        let decls = adapter.parse(&updated, Path::new("package.json")).unwrap();
        let express = decls.iter().find(|d| d.name == "express").unwrap();
        assert_eq!(express.requested, "^5.0.0");
    }
}
