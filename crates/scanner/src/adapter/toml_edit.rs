//! TOML 매니페스트의 표적 치환 헬퍼
//!
//! Cargo.toml과 Pipfile 어댑터가 공유하는 라인 단위 치환 로직입니다.
//! 전체 문서를 재직렬화하지 않고 대상 선언의 버전 문자열만 바꿔치기하여
//! 나머지 바이트(포맷, 주석, 순서)를 그대로 보존합니다.

/// 주어진 섹션들에서 패키지 선언의 버전만 치환한 새 내용을 반환합니다.
///
/// 처리하는 선언 형태:
///
/// ```toml
/// [dependencies]
/// serde = "1.0"
/// tokio = { version = "1.35", features = ["full"] }
///
/// [dependencies.uuid]
/// version = "1"
/// ```
///
/// 치환에 성공하면 `Some(새 내용)`, 선언을 찾지 못하면 `None`을 반환합니다.
pub(crate) fn set_version_in_sections(
    content: &str,
    section_names: &[&str],
    package: &str,
    new_requested: &str,
) -> Option<String> {
    let mut result = String::with_capacity(content.len());
    let mut current_section = String::new();
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();

        if !replaced && trimmed.starts_with('[') {
            if let Some(end) = trimmed.find(']') {
                current_section = trimmed[1..end].trim().to_owned();
            }
        }

        if !replaced {
            // 인라인 선언: name = "..." 또는 name = { version = "...", ... }
            if section_names.contains(&current_section.as_str())
                && let Some(value_part) = key_value_rest(trimmed, package)
            {
                let value_trimmed = value_part.trim_start();
                if value_trimmed.starts_with('"') {
                    if let Some(new_line) = replace_first_quoted(line, value_part, new_requested) {
                        result.push_str(&new_line);
                        replaced = true;
                        continue;
                    }
                } else if value_trimmed.starts_with('{')
                    && let Some(version_rest) = find_version_key(value_trimmed)
                    && let Some(new_line) = replace_first_quoted(line, version_rest, new_requested)
                {
                    result.push_str(&new_line);
                    replaced = true;
                    continue;
                }
            }

            // 테이블 선언: [section.package] 아래의 version = "..."
            let is_package_table = section_names
                .iter()
                .any(|s| current_section == format!("{s}.{package}")
                    || current_section == format!("{s}.\"{package}\""));
            if is_package_table
                && let Some(version_rest) = key_value_rest(trimmed, "version")
                && let Some(new_line) = replace_first_quoted(line, version_rest, new_requested)
            {
                result.push_str(&new_line);
                replaced = true;
                continue;
            }
        }

        result.push_str(line);
    }

    if replaced { Some(result) } else { None }
}

/// 라인이 `key = ...` 형태로 시작하면 `=` 뒤의 나머지를 반환합니다.
///
/// 키는 따옴표로 감싸져 있을 수 있습니다 (`"flask-cors" = "*"`).
fn key_value_rest<'a>(trimmed_line: &'a str, key: &str) -> Option<&'a str> {
    let after_key = if let Some(rest) = trimmed_line.strip_prefix('"') {
        rest.strip_prefix(key)?.strip_prefix('"')?
    } else {
        trimmed_line.strip_prefix(key)?
    };

    let after_ws = after_key.trim_start_matches([' ', '\t']);
    // "serde_json"이 "serde"의 접두 일치로 잡히지 않도록 '=' 확인
    after_ws.strip_prefix('=')
}

/// 인라인 테이블 내부에서 `version = ` 키 뒤의 나머지를 찾습니다.
fn find_version_key(inline_table: &str) -> Option<&str> {
    let mut rest = inline_table;
    while let Some(pos) = rest.find("version") {
        let after = &rest[pos + "version".len()..];
        let after_ws = after.trim_start_matches([' ', '\t']);
        if let Some(value) = after_ws.strip_prefix('=') {
            return Some(value);
        }
        rest = after;
    }
    None
}

/// `value_rest`(원본 라인의 접미 슬라이스) 안의 첫 따옴표 문자열을 치환합니다.
///
/// `value_rest`는 `line` 내부를 가리키는 슬라이스여야 합니다.
fn replace_first_quoted(line: &str, value_rest: &str, new_value: &str) -> Option<String> {
    // line 내에서 value_rest가 시작하는 오프셋 계산
    let offset = line.len().checked_sub(value_rest.len())?;
    let open = value_rest.find('"')?;
    let after_open = &value_rest[open + 1..];
    let close = after_open.find('"')?;

    let mut new_line = String::with_capacity(line.len());
    new_line.push_str(&line[..offset + open + 1]);
    new_line.push_str(new_value);
    new_line.push_str(&after_open[close..]);
    Some(new_line)
}
