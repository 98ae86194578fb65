//! DictMaker Data Models
//!
//! 저장소, 명령 로그, 교환 포맷이 공유하는 데이터 모델

use serde::{Deserialize, Serialize};

use crate::error::{DictError, DictResult};

/// 표제어 한 건 (Entry 테이블 + 소속 Senses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub headword: String,
    pub variation: String,
    pub part_of_speech: String,
    pub notes: String,
    /// Senses 행 순서(id 오름차순)대로 정렬된 의미 목록
    pub meanings: Vec<String>,
}

impl Entry {
    pub fn fields(&self) -> EntryFields {
        EntryFields {
            headword: self.headword.clone(),
            variation: self.variation.clone(),
            part_of_speech: self.part_of_speech.clone(),
            notes: self.notes.clone(),
            meanings: self.meanings.clone(),
        }
    }
}

/// Senses 테이블 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub id: i64,
    pub entry_id: i64,
    pub meaning: String,
}

/// 편집 폼에서 넘어오는 표제어 필드 (id 제외)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    pub headword: String,
    #[serde(default)]
    pub variation: String,
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub meanings: Vec<String>,
}

impl EntryFields {
    pub fn new(headword: impl Into<String>, meanings: Vec<String>) -> Self {
        Self {
            headword: headword.into(),
            meanings,
            ..Self::default()
        }
    }

    /// 의미 앞뒤 공백을 제거하고 빈 줄은 버린다.
    pub fn normalized(mut self) -> Self {
        self.meanings = self
            .meanings
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.headword.trim().is_empty() && self.meanings.iter().any(|m| !m.trim().is_empty())
    }

    /// 저장 버튼 정책: 표제어와 의미가 모두 있어야 한다.
    /// 저장소 자체는 어떤 문자열이든 받는다.
    pub fn validate(&self) -> DictResult<()> {
        if self.headword.trim().is_empty() {
            return Err(DictError::Validation("Headword is required".to_string()));
        }
        if !self.meanings.iter().any(|m| !m.trim().is_empty()) {
            return Err(DictError::Validation(
                "At least one meaning is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// 명령 로그가 보관하는 표제어 전체 상태 (스칼라 필드 + 순서 있는 의미 목록)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub id: i64,
    pub fields: EntryFields,
}

impl From<Entry> for EntrySnapshot {
    fn from(entry: Entry) -> Self {
        let fields = entry.fields();
        Self {
            id: entry.id,
            fields,
        }
    }
}

/// 검색 대상 컬럼
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    #[default]
    All,
    Headword,
    PartOfSpeech,
    Variation,
    Meaning,
}

impl std::str::FromStr for SearchField {
    type Err = DictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "headword" => Ok(Self::Headword),
            "pos" | "part_of_speech" | "part-of-speech" => Ok(Self::PartOfSpeech),
            "variation" => Ok(Self::Variation),
            "meaning" => Ok(Self::Meaning),
            other => Err(DictError::Validation(format!("Unknown search field: {other}"))),
        }
    }
}

/// 검색/목록 결과 한 줄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub headword: String,
}

/// 정규화 표제어 기준 중복 그룹
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub normalized_headword: String,
    pub count: i64,
}

/// 내보내기 행 (표제어 1건 = 1행)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub id: i64,
    pub headword: String,
    pub variation: String,
    pub part_of_speech: String,
    pub notes: String,
    pub meanings: Vec<String>,
}

/// 가져오기 행. 기존 데이터와 중복 검사 없이 새 표제어로 들어간다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub headword: String,
    pub variation: String,
    pub part_of_speech: String,
    pub notes: String,
    pub meanings: Vec<String>,
}

impl From<ImportRow> for EntryFields {
    fn from(row: ImportRow) -> Self {
        Self {
            headword: row.headword,
            variation: row.variation,
            part_of_speech: row.part_of_speech,
            notes: row.notes,
            meanings: row.meanings,
        }
    }
}

/// 데이터베이스 통계
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStatistics {
    pub headword_count: i64,
    pub meaning_count: i64,
    pub duplicate_count: i64,
    pub database_file: Option<String>,
    pub file_size: Option<String>,
    pub last_modified: Option<String>,
}
