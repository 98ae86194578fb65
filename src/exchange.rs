//! Import/Export Formats
//!
//! CSV/JSON 교환 포맷.
//!
//! - CSV: 헤더 `id, headword, variation, part_of_speech, notes, meanings`,
//!   의미는 `;;`로 이어 붙인 한 셀. 의미 안에 `;;`가 있으면 왕복 시 쪼개진다.
//! - JSON: 객체 배열, `meanings`는 문자열 배열.
//!
//! 가져오기는 파일 전체를 먼저 검증한 다음에야 저장소에 쓴다.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::db::Database;
use crate::error::{DictError, DictResult};
use crate::models::{ExportRow, ImportRow};

/// 의미 구분자. 의미 자체에 포함되면 CSV 왕복이 손실된다.
pub const MEANING_SEPARATOR: &str = ";;";

pub const EXPORT_COLUMNS: [&str; 6] = [
    "id",
    "headword",
    "variation",
    "part_of_speech",
    "notes",
    "meanings",
];

/// 가져오기에 반드시 있어야 하는 컬럼/키
pub const REQUIRED_COLUMNS: [&str; 5] = ["headword", "variation", "part_of_speech", "notes", "meanings"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeFormat {
    Csv,
    Json,
}

impl ExchangeFormat {
    /// 확장자로 포맷 추정
    pub fn from_path(path: &Path) -> DictResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(DictError::Format(format!(
                "Cannot infer format from file name: {}",
                path.display()
            ))),
        }
    }
}

impl std::str::FromStr for ExchangeFormat {
    type Err = DictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(DictError::Format(format!("Unknown format: {other}"))),
        }
    }
}

pub fn join_meanings(meanings: &[String]) -> String {
    meanings.join(MEANING_SEPARATOR)
}

/// `;;`로 나누고 공백뿐인 조각은 버린다. 남은 의미는 적힌 그대로 둔다.
pub fn split_meanings(cell: &str) -> Vec<String> {
    cell.split(MEANING_SEPARATOR)
        .filter(|m| !m.trim().is_empty())
        .map(String::from)
        .collect()
}

// ----------------------------------------------------------------------
// 내보내기
// ----------------------------------------------------------------------

pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> DictResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_COLUMNS)?;

    for row in rows {
        csv_writer.write_record([
            row.id.to_string(),
            row.headword.clone(),
            row.variation.clone(),
            row.part_of_speech.clone(),
            row.notes.clone(),
            join_meanings(&row.meanings),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(rows: &[ExportRow], writer: W) -> DictResult<()> {
    let data: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "headword": row.headword,
                "variation": row.variation,
                "part_of_speech": row.part_of_speech,
                "notes": row.notes,
                "meanings": row.meanings,
            })
        })
        .collect();

    serde_json::to_writer_pretty(writer, &data)?;
    Ok(())
}

// ----------------------------------------------------------------------
// 가져오기
// ----------------------------------------------------------------------

/// CSV 파싱. 헤더(앞뒤 공백 무시)에 필수 컬럼이 모두 있어야 한다.
pub fn parse_csv<R: Read>(reader: R) -> DictResult<Vec<ImportRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(DictError::Format(format!(
            "Invalid CSV: missing columns {:?}",
            missing
        )));
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let idx = [
        column("headword"),
        column("variation"),
        column("part_of_speech"),
        column("notes"),
        column("meanings"),
    ];

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let cell = |i: Option<usize>| {
            i.and_then(|i| record.get(i))
                .map(String::from)
                .unwrap_or_default()
        };
        rows.push(ImportRow {
            headword: cell(idx[0]),
            variation: cell(idx[1]),
            part_of_speech: cell(idx[2]),
            notes: cell(idx[3]),
            meanings: split_meanings(&cell(idx[4])),
        });
    }

    Ok(rows)
}

/// JSON 파싱. 최상위는 배열이어야 하고, 형태가 잘못된 첫 항목 번호를 보고한다.
pub fn parse_json<R: Read>(reader: R) -> DictResult<Vec<ImportRow>> {
    let data: Value = serde_json::from_reader(reader)
        .map_err(|e| DictError::Format(format!("Invalid JSON: {}", e)))?;

    let Value::Array(items) = data else {
        return Err(DictError::Format(
            "Invalid JSON: top-level structure must be a list of entries.".to_string(),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_json_item(idx, item))
        .collect()
}

fn parse_json_item(idx: usize, item: &Value) -> DictResult<ImportRow> {
    let Value::Object(map) = item else {
        return Err(DictError::Format(format!("Entry {} is not an object.", idx)));
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|key| !map.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(DictError::Format(format!(
            "Entry {} missing keys: {:?}",
            idx, missing
        )));
    }

    let text = |key: &str| -> DictResult<String> {
        match &map[key] {
            Value::String(s) => Ok(s.clone()),
            _ => Err(DictError::Format(format!(
                "Entry {}: '{}' must be a string.",
                idx, key
            ))),
        }
    };

    let Value::Array(raw_meanings) = &map["meanings"] else {
        return Err(DictError::Format(format!(
            "Entry {}: 'meanings' must be a list.",
            idx
        )));
    };

    let meanings = raw_meanings
        .iter()
        .map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|m| !m.trim().is_empty())
        .collect();

    Ok(ImportRow {
        headword: text("headword")?,
        variation: text("variation")?,
        part_of_speech: text("part_of_speech")?,
        notes: text("notes")?,
        meanings,
    })
}

// ----------------------------------------------------------------------
// 파일 단위
// ----------------------------------------------------------------------

/// 내보내기, 내보낸 행 수 반환
pub fn export_file(db: &Database, path: &Path, format: ExchangeFormat) -> DictResult<usize> {
    let rows = db.export_rows()?;
    let file = File::create(path)?;
    match format {
        ExchangeFormat::Csv => write_csv(&rows, file)?,
        ExchangeFormat::Json => write_json(&rows, std::io::BufWriter::new(file))?,
    }
    tracing::info!("Exported {} entries to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// 파일 전체를 검증한 뒤 한 트랜잭션으로 가져온다. 가져온 행 수 반환.
pub fn import_file(db: &Database, path: &Path, format: ExchangeFormat) -> DictResult<usize> {
    let file = File::open(path)?;
    let rows = match format {
        ExchangeFormat::Csv => parse_csv(file)?,
        ExchangeFormat::Json => parse_json(std::io::BufReader::new(file))?,
    };
    db.import_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_row(id: i64, headword: &str, meanings: &[&str]) -> ExportRow {
        ExportRow {
            id,
            headword: headword.into(),
            variation: String::new(),
            part_of_speech: "noun".into(),
            notes: String::new(),
            meanings: meanings.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_split_meanings_drops_empty_segments() {
        assert_eq!(split_meanings(" a ;;;; b;;  "), vec![" a ", " b"]);
        assert!(split_meanings("").is_empty());
    }

    #[test]
    fn test_csv_header_and_joined_meanings() {
        let mut out = Vec::new();
        write_csv(&[export_row(1, "cat", &["feline", "pet, small"])], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,headword,variation,part_of_speech,notes,meanings"));
        assert_eq!(lines.next(), Some(r#"1,cat,,noun,,"feline;;pet, small""#));
    }

    #[test]
    fn test_parse_csv_missing_columns() {
        let input = "headword,variation,notes,meanings\ncat,,,feline\n";
        let err = parse_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, DictError::Format(ref msg) if msg.contains("part_of_speech")));
    }

    #[test]
    fn test_parse_csv_trims_headers_but_keeps_cells() {
        let input = " headword , variation,part_of_speech,notes, meanings\nCat ,,n, note ,feline;; pet\n";
        let rows = parse_csv(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].headword, "Cat ");
        assert_eq!(rows[0].notes, " note ");
        assert_eq!(rows[0].meanings, vec!["feline", " pet"]);
    }

    #[test]
    fn test_csv_and_json_keep_surrounding_whitespace() {
        let mut row = export_row(1, "Cat ", &[" to vomit", "feline"]);
        row.notes = " note ".into();

        let mut csv_out = Vec::new();
        write_csv(&[row.clone()], &mut csv_out).unwrap();
        let mut json_out = Vec::new();
        write_json(&[row.clone()], &mut json_out).unwrap();

        for parsed in [
            parse_csv(csv_out.as_slice()).unwrap(),
            parse_json(json_out.as_slice()).unwrap(),
        ] {
            assert_eq!(parsed[0].headword, "Cat ");
            assert_eq!(parsed[0].notes, " note ");
            assert_eq!(parsed[0].meanings, vec![" to vomit", "feline"]);
        }
    }

    #[test]
    fn test_parse_json_rejects_null_fields() {
        let input = r#"[
            {"headword":"a","variation":"","part_of_speech":"","notes":"","meanings":["x"]},
            {"headword":"b","variation":null,"part_of_speech":"","notes":"","meanings":["y"]}
        ]"#;
        let err = parse_json(input.as_bytes()).unwrap_err();
        assert!(matches!(err, DictError::Format(ref msg) if msg.starts_with("Entry 1") && msg.contains("variation")));
    }

    #[test]
    fn test_parse_json_shapes() {
        let ok = r#"[{"headword":"cat","variation":"","part_of_speech":"n","notes":"","meanings":["feline", " ", 3]}]"#;
        let rows = parse_json(ok.as_bytes()).unwrap();
        assert_eq!(rows[0].meanings, vec!["feline", "3"]);

        let not_list = r#"{"headword":"cat"}"#;
        assert!(matches!(parse_json(not_list.as_bytes()), Err(DictError::Format(_))));

        let second_bad = r#"[
            {"headword":"a","variation":"","part_of_speech":"","notes":"","meanings":[]},
            {"headword":"b","variation":"","part_of_speech":"","notes":"","meanings":"x;;y"}
        ]"#;
        let err = parse_json(second_bad.as_bytes()).unwrap_err();
        assert!(matches!(err, DictError::Format(ref msg) if msg.starts_with("Entry 1")));

        let missing = r#"[{"headword":"a"}]"#;
        let err = parse_json(missing.as_bytes()).unwrap_err();
        assert!(matches!(err, DictError::Format(ref msg) if msg.contains("missing keys")));
    }

    #[test]
    fn test_failed_import_leaves_store_untouched() {
        let db = Database::in_memory().unwrap();
        let bad = r#"[
            {"headword":"a","variation":"","part_of_speech":"","notes":"","meanings":["x"]},
            "oops"
        ]"#;
        assert!(parse_json(bad.as_bytes()).and_then(|rows| db.import_rows(&rows)).is_err());
        assert_eq!(db.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExchangeFormat::from_path(Path::new("a.CSV")).unwrap(), ExchangeFormat::Csv);
        assert_eq!(ExchangeFormat::from_path(Path::new("a.json")).unwrap(), ExchangeFormat::Json);
        assert!(ExchangeFormat::from_path(Path::new("a.txt")).is_err());
    }
}
