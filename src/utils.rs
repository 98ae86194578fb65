use std::path::{Path, PathBuf};

use crate::error::{DictError, DictResult};

/// 사용자가 입력한 경로를 정규화한다.
/// - 파일이 있으면 canonicalize
/// - 없으면(새로 만들 파일) 부모 디렉토리를 canonicalize 한 뒤 파일명을 붙인다
pub fn resolve_path(path_str: &str) -> DictResult<PathBuf> {
    let path = Path::new(path_str);

    if path.exists() {
        return path
            .canonicalize()
            .map_err(|e| DictError::Connection(format!("Invalid path {}: {}", path_str, e)));
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| DictError::Connection(format!("Invalid path: {}", path_str)))?;

    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(PathBuf::from(path_str)),
        Some(parent) if parent.exists() => {
            let canonical_parent = parent.canonicalize().map_err(|e| {
                DictError::Connection(format!("Invalid parent path {}: {}", parent.display(), e))
            })?;
            Ok(canonical_parent.join(file_name))
        }
        Some(parent) => Err(DictError::Connection(format!(
            "Parent directory does not exist: {}",
            parent.display()
        ))),
        None => Ok(PathBuf::from(path_str)),
    }
}

/// 새 사전 파일 경로에 `.db` 확장자를 보장
pub fn with_db_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "db" => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_os_string();
            name.push(".db");
            PathBuf::from(name)
        }
    }
}

/// 바이트 수를 사람이 읽기 쉬운 크기로 (소수 둘째 자리)
pub fn format_size(size_bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if size_bytes == 0 {
        return "0B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// 셸 한 줄을 인자 목록으로 나눈다. 큰따옴표/작은따옴표로 공백을 묶을 수 있다.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next) => current.push(next),
                None => return Err("dangling escape".to_string()),
            },
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1 MB");
    }

    #[test]
    fn test_with_db_extension() {
        assert_eq!(with_db_extension(Path::new("words")), PathBuf::from("words.db"));
        assert_eq!(with_db_extension(Path::new("words.db")), PathBuf::from("words.db"));
        assert_eq!(with_db_extension(Path::new("words.txt")), PathBuf::from("words.txt.db"));
    }

    #[test]
    fn test_split_args_quotes() {
        assert_eq!(
            split_args(r#"add "ice cream" -m 'cold dessert' -m x"#).unwrap(),
            vec!["add", "ice cream", "-m", "cold dessert", "-m", "x"]
        );
        assert_eq!(split_args(r#"note "say \"hi\"""#).unwrap(), vec!["note", r#"say "hi""#]);
        assert_eq!(split_args(r#"empty """#).unwrap(), vec!["empty", ""]);
        assert!(split_args("broken \"quote").is_err());
    }

    #[test]
    fn test_resolve_path_for_new_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.csv");
        let resolved = resolve_path(target.to_str().unwrap()).unwrap();
        assert_eq!(resolved.file_name().unwrap(), "out.csv");

        let missing_parent = dir.path().join("nope").join("out.csv");
        assert!(resolve_path(missing_parent.to_str().unwrap()).is_err());
    }
}
