//! Database Module
//!
//! 사전 SQLite 저장소 (Entry + Senses 두 테이블)
//!
//! 여러 문장으로 이루어진 변경(생성, 수정, 삭제, 병합, 중복 삭제, 가져오기)은
//! 모두 하나의 트랜잭션으로 묶는다. 중간에 실패하면 롤백되어 Sense가
//! 존재하지 않는 Entry를 가리키는 상태가 남지 않는다.

mod schema;
pub mod similarity;

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::backup::Backup;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};

use crate::error::{DictError, DictResult};
use crate::models::{
    DbStatistics, DuplicateGroup, Entry, EntryFields, EntrySnapshot, ExportRow, ImportRow,
    SearchField, SearchHit,
};
use crate::utils::format_size;

pub use schema::REQUIRED_TABLES;

/// 중복 판정용 표제어 정규화: 앞뒤 공백 제거 + 소문자. 내부 공백은 그대로 둔다.
pub fn normalize_headword(headword: &str) -> String {
    headword.trim().to_lowercase()
}

/// 사전 데이터베이스 래퍼. 한 번에 하나의 연결만 소유한다.
///
/// `high_water`는 이 연결에서 지금까지 본 가장 큰 Entry id다. 새 표제어는 항상
/// 그보다 큰 id를 받으므로, 삭제된 id는 재사용되지 않고 실행 취소로 되살릴 수 있다.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
    high_water: Cell<i64>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// 새 사전 파일 생성. 파일이 이미 있으면 실패한다 (덮어쓰기는 호출자가 먼저 지운다).
    pub fn create(path: &Path) -> DictResult<Self> {
        if path.exists() {
            return Err(DictError::Connection(format!(
                "Database file already exists: {}",
                path.display()
            )));
        }

        let conn = Connection::open(path)
            .map_err(|e| DictError::Connection(format!("{}: {}", path.display(), e)))?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;

        let db = Self::with_connection(conn, Some(path.to_path_buf()))?;
        tracing::info!("Created new database: {}", path.display());
        Ok(db)
    }

    /// 기존 사전 파일 열기. 필수 테이블이 없으면 연결을 닫고 거부한다.
    pub fn open(path: &Path) -> DictResult<Self> {
        if !path.exists() {
            return Err(DictError::Connection(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DictError::Connection(format!("{}: {}", path.display(), e)))?;

        let db = Self::with_connection(conn, Some(path.to_path_buf()))?;
        if !db.check_structure()? {
            return Err(DictError::Structure(path.display().to_string()));
        }

        tracing::info!("Loaded database: {}", path.display());
        Ok(db)
    }

    /// 메모리 DB (테스트 및 임시 작업용)
    pub fn in_memory() -> DictResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DictError::Connection(e.to_string()))?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> DictResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // SQLite LOWER()는 ASCII만 바꾼다
        conn.create_scalar_function(
            "ulower",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )?;

        // 구조 검사 전이라 테이블이 없을 수 있다
        let max_id: i64 = conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM Entry", [], |row| row.get(0))
            .unwrap_or(0);

        Ok(Self {
            conn,
            path,
            high_water: Cell::new(max_id),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Entry, Senses 테이블이 정확한 이름으로 모두 있는지 검사
    pub fn check_structure(&self) -> DictResult<bool> {
        for table in REQUIRED_TABLES {
            let found: Option<String> = self
                .conn
                .query_row(schema::TABLE_EXISTS, [table], |row| row.get(0))
                .optional()?;
            if found.is_none() {
                tracing::warn!("Required table missing: {}", table);
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// 표제어 1건 + 의미 N건 생성, 새 id 반환
    pub fn create_entry(&self, fields: &EntryFields) -> DictResult<i64> {
        let tx = self.conn.unchecked_transaction()?;

        let entry_id = self.next_entry_id(&tx)?;
        insert_entry(&tx, entry_id, fields)?;
        insert_senses(&tx, entry_id, &fields.meanings)?;

        tx.commit()?;
        self.high_water.set(entry_id);
        tracing::debug!("Created entry {} ({})", entry_id, fields.headword);
        Ok(entry_id)
    }

    /// 스칼라 필드 교체 + 의미 전체 교체 (전부 지우고 다시 넣기)
    pub fn update_entry(&self, id: i64, fields: &EntryFields) -> DictResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE Entry SET headword = ?1, variation = ?2, part_of_speech = ?3, notes = ?4 WHERE id = ?5",
            params![
                fields.headword,
                fields.variation,
                fields.part_of_speech,
                fields.notes,
                id
            ],
        )?;
        if changed == 0 {
            return Err(DictError::NotFound(id));
        }

        tx.execute("DELETE FROM Senses WHERE entry_id = ?1", [id])?;
        insert_senses(&tx, id, &fields.meanings)?;

        tx.commit()?;
        tracing::debug!("Updated entry {}", id);
        Ok(())
    }

    /// 표제어와 소속 의미 삭제
    pub fn delete_entry(&self, id: i64) -> DictResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        if delete_entry_rows(&tx, id)? == 0 {
            return Err(DictError::NotFound(id));
        }
        tx.commit()?;
        tracing::debug!("Deleted entry {}", id);
        Ok(())
    }

    /// 여러 표제어 일괄 삭제. 없는 id는 건너뛰고 실제 삭제된 건수를 반환한다.
    pub fn delete_entries(&self, ids: &[i64]) -> DictResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        for &id in ids {
            deleted += delete_entry_rows(&tx, id)?;
        }
        tx.commit()?;
        tracing::debug!("Deleted {} of {} entries", deleted, ids.len());
        Ok(deleted)
    }

    /// 표제어 문자열이 정확히 같은 모든 항목 삭제
    pub fn delete_by_headword(&self, headword: &str) -> DictResult<usize> {
        let ids = {
            let mut stmt = self.conn.prepare("SELECT id FROM Entry WHERE headword = ?1")?;
            let iter = stmt.query_map([headword], |row| row.get::<_, i64>(0))?;
            iter.collect::<Result<Vec<_>, _>>()?
        };
        self.delete_entries(&ids)
    }

    /// 삭제된 표제어를 원래 id 그대로 되살린다.
    pub fn restore_entry(&self, snapshot: &EntrySnapshot) -> DictResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        insert_entry(&tx, snapshot.id, &snapshot.fields)?;
        insert_senses(&tx, snapshot.id, &snapshot.fields.meanings)?;

        tx.commit()?;
        self.high_water.set(self.high_water.get().max(snapshot.id));
        tracing::debug!("Restored entry {}", snapshot.id);
        Ok(())
    }

    /// 표제어 조회 (의미는 행 순서대로)
    pub fn get_entry(&self, id: i64) -> DictResult<Entry> {
        let row = self
            .conn
            .query_row(
                "SELECT id, COALESCE(headword, ''), COALESCE(variation, ''),
                        COALESCE(part_of_speech, ''), COALESCE(notes, '')
                 FROM Entry WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (id, headword, variation, part_of_speech, notes) =
            row.ok_or(DictError::NotFound(id))?;

        Ok(Entry {
            id,
            headword,
            variation,
            part_of_speech,
            notes,
            meanings: self.meanings_of(id)?,
        })
    }

    pub fn snapshot(&self, id: i64) -> DictResult<EntrySnapshot> {
        self.get_entry(id).map(EntrySnapshot::from)
    }

    pub fn meanings_of(&self, entry_id: i64) -> DictResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT COALESCE(meaning, '') FROM Senses WHERE entry_id = ?1 ORDER BY id")?;
        let iter = stmt.query_map([entry_id], |row| row.get::<_, String>(0))?;
        Ok(iter.collect::<Result<Vec<_>, _>>()?)
    }

    // ------------------------------------------------------------------
    // 목록 / 통계
    // ------------------------------------------------------------------

    /// 표제어 목록 (표제어순)
    pub fn list_headwords(&self) -> DictResult<Vec<SearchHit>> {
        self.query_hits(
            "SELECT id, COALESCE(headword, '') AS hw FROM Entry ORDER BY hw, id",
            params![],
        )
    }

    pub fn entry_count(&self) -> DictResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM Entry", [], |row| row.get(0))?)
    }

    pub fn sense_count(&self) -> DictResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM Senses", [], |row| row.get(0))?)
    }

    /// 비어 있지 않은 표제어의 첫 글자 목록 (정렬, 중복 제거)
    pub fn first_letters(&self) -> DictResult<Vec<String>> {
        let letters: BTreeSet<String> = self
            .list_headwords()?
            .into_iter()
            .filter_map(|hit| hit.headword.chars().next())
            .map(String::from)
            .collect();
        Ok(letters.into_iter().collect())
    }

    /// 주어진 글자로 시작하는 표제어 (대소문자 무시, 표제어순)
    pub fn filter_by_letter(&self, letter: &str) -> DictResult<Vec<SearchHit>> {
        let prefix = letter.to_lowercase();
        Ok(self
            .list_headwords()?
            .into_iter()
            .filter(|hit| hit.headword.to_lowercase().starts_with(&prefix))
            .collect())
    }

    pub fn statistics(&self) -> DictResult<DbStatistics> {
        let mut stats = DbStatistics {
            headword_count: self.entry_count()?,
            meaning_count: self.sense_count()?,
            duplicate_count: self.find_duplicates()?.len() as i64,
            database_file: None,
            file_size: None,
            last_modified: None,
        };

        if let Some(path) = self.path.as_deref() {
            stats.database_file = Some(path.display().to_string());
            if let Ok(meta) = std::fs::metadata(path) {
                stats.file_size = Some(format_size(meta.len()));
                stats.last_modified = meta.modified().ok().map(|t| {
                    chrono::DateTime::<chrono::Local>::from(t)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                });
            }
        }

        Ok(stats)
    }

    // ------------------------------------------------------------------
    // 중복 처리
    // ------------------------------------------------------------------

    /// 정규화 표제어 기준으로 2건 이상인 그룹
    pub fn find_duplicates(&self) -> DictResult<Vec<DuplicateGroup>> {
        Ok(duplicate_members(&self.conn)?
            .into_iter()
            .map(|(normalized_headword, ids)| DuplicateGroup {
                normalized_headword,
                count: ids.len() as i64,
            })
            .collect())
    }

    /// 그룹마다 가장 작은 id를 마스터로 두고 나머지의 의미를 마스터로 옮긴 뒤
    /// 나머지 표제어를 삭제한다. 제거된 표제어 수를 반환한다.
    pub fn merge_duplicates(&self) -> DictResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;

        for (normalized, ids) in duplicate_members(&tx)? {
            let Some((&master_id, others)) = ids.split_first() else {
                continue;
            };
            for &duplicate_id in others {
                tx.execute(
                    "UPDATE Senses SET entry_id = ?1 WHERE entry_id = ?2",
                    [master_id, duplicate_id],
                )?;
                tx.execute("DELETE FROM Entry WHERE id = ?1", [duplicate_id])?;
                removed += 1;
            }
            tracing::debug!("Merged {} duplicates of '{}' into {}", others.len(), normalized, master_id);
        }

        tx.commit()?;
        tracing::info!("Merged duplicates: {} entries removed", removed);
        Ok(removed)
    }

    /// 그룹마다 가장 작은 id만 남기고 나머지 표제어와 그 의미를 삭제한다.
    pub fn delete_duplicates(&self) -> DictResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;

        for (_, ids) in duplicate_members(&tx)? {
            for &duplicate_id in ids.iter().skip(1) {
                removed += delete_entry_rows(&tx, duplicate_id)?;
            }
        }

        tx.commit()?;
        tracing::info!("Deleted duplicates: {} entries removed", removed);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // 검색
    // ------------------------------------------------------------------

    /// 검색어가 비어 있으면 전체 목록.
    /// 일반 검색은 id순, 퍼지 검색은 표제어 알파벳순으로 정렬된다.
    pub fn search(&self, term: &str, field: SearchField, fuzzy: bool) -> DictResult<Vec<SearchHit>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.list_headwords();
        }

        if fuzzy {
            self.fuzzy_search(&term, field)
        } else {
            self.substring_search(&term, field)
        }
    }

    fn substring_search(&self, term: &str, field: SearchField) -> DictResult<Vec<SearchHit>> {
        let pattern = format!("%{}%", escape_like(term));
        let meaning_subquery =
            "id IN (SELECT entry_id FROM Senses WHERE ulower(meaning) LIKE ?1 ESCAPE '\\')";

        let condition = match field {
            SearchField::Headword => "ulower(headword) LIKE ?1 ESCAPE '\\'".to_string(),
            SearchField::PartOfSpeech => "ulower(part_of_speech) LIKE ?1 ESCAPE '\\'".to_string(),
            SearchField::Variation => "ulower(variation) LIKE ?1 ESCAPE '\\'".to_string(),
            SearchField::Meaning => meaning_subquery.to_string(),
            SearchField::All => format!(
                "ulower(headword) LIKE ?1 ESCAPE '\\'
                 OR ulower(part_of_speech) LIKE ?1 ESCAPE '\\'
                 OR ulower(variation) LIKE ?1 ESCAPE '\\'
                 OR {meaning_subquery}"
            ),
        };

        let sql = format!(
            "SELECT id, COALESCE(headword, '') FROM Entry WHERE {condition} ORDER BY id"
        );
        self.query_hits(&sql, [pattern])
    }

    fn fuzzy_search(&self, term: &str, field: SearchField) -> DictResult<Vec<SearchHit>> {
        let needs_meanings = matches!(field, SearchField::All | SearchField::Meaning);
        let meanings = if needs_meanings {
            self.all_meanings()?
        } else {
            HashMap::new()
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, COALESCE(headword, ''), COALESCE(part_of_speech, ''), COALESCE(variation, '')
             FROM Entry ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let close = |value: &str| similarity::is_close_match(term, &value.to_lowercase());
        let mut hits = Vec::new();
        for row in rows {
            let (id, headword, pos, variation) = row?;
            let entry_meanings = meanings.get(&id).map(Vec::as_slice).unwrap_or(&[]);

            let matched = match field {
                SearchField::Headword => close(headword.as_str()),
                SearchField::PartOfSpeech => close(pos.as_str()),
                SearchField::Variation => close(variation.as_str()),
                SearchField::Meaning => entry_meanings.iter().any(|m| close(m.as_str())),
                SearchField::All => {
                    close(headword.as_str())
                        || close(pos.as_str())
                        || close(variation.as_str())
                        || entry_meanings.iter().any(|m| close(m.as_str()))
                }
            };
            if matched {
                hits.push(SearchHit { id, headword });
            }
        }

        hits.sort_by(|a, b| a.headword.cmp(&b.headword));
        Ok(hits)
    }

    fn query_hits<P: rusqlite::Params>(&self, sql: &str, params: P) -> DictResult<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let iter = stmt.query_map(params, |row| {
            Ok(SearchHit {
                id: row.get(0)?,
                headword: row.get(1)?,
            })
        })?;
        Ok(iter.collect::<Result<Vec<_>, _>>()?)
    }

    /// entry_id -> 의미 목록 (Senses 행 순서)
    fn all_meanings(&self) -> DictResult<HashMap<i64, Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT entry_id, COALESCE(meaning, '') FROM Senses ORDER BY id")?;
        let iter = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut map: HashMap<i64, Vec<String>> = HashMap::new();
        for row in iter {
            let (entry_id, meaning) = row?;
            map.entry(entry_id).or_default().push(meaning);
        }
        Ok(map)
    }

    // ------------------------------------------------------------------
    // 가져오기 / 내보내기 / 백업
    // ------------------------------------------------------------------

    /// 표제어 1건당 1행 (id순)
    pub fn export_rows(&self) -> DictResult<Vec<ExportRow>> {
        let mut meanings = self.all_meanings()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, COALESCE(headword, ''), COALESCE(variation, ''),
                    COALESCE(part_of_speech, ''), COALESCE(notes, '')
             FROM Entry ORDER BY id",
        )?;
        let iter = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in iter {
            let (id, headword, variation, part_of_speech, notes) = row?;
            out.push(ExportRow {
                id,
                headword,
                variation,
                part_of_speech,
                notes,
                meanings: meanings.remove(&id).unwrap_or_default(),
            });
        }
        Ok(out)
    }

    /// 검증이 끝난 행을 새 표제어로 추가한다. 기존 데이터와 중복 검사를 하지 않는다.
    pub fn import_rows(&self, rows: &[ImportRow]) -> DictResult<usize> {
        let tx = self.conn.unchecked_transaction()?;

        let mut entry_id = self.next_entry_id(&tx)? - 1;
        for row in rows {
            entry_id += 1;
            let fields = EntryFields::from(row.clone());
            insert_entry(&tx, entry_id, &fields)?;
            insert_senses(&tx, entry_id, &fields.meanings)?;
        }

        tx.commit()?;
        self.high_water.set(self.high_water.get().max(entry_id));
        tracing::info!("Imported {} entries", rows.len());
        Ok(rows.len())
    }

    /// 테이블의 최대 id와 이 연결이 발급했던 최대 id 중 큰 값 + 1
    fn next_entry_id(&self, tx: &Transaction<'_>) -> DictResult<i64> {
        let max_id: i64 = tx.query_row("SELECT COALESCE(MAX(id), 0) FROM Entry", [], |row| row.get(0))?;
        Ok(max_id.max(self.high_water.get()) + 1)
    }

    /// 현재 DB를 다른 파일로 복제 (SQLite 온라인 백업)
    pub fn backup_to(&self, out_path: &Path) -> DictResult<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out_conn = Connection::open(out_path)?;
        let backup = Backup::new(&self.conn, &mut out_conn)?;
        backup.run_to_completion(5, std::time::Duration::from_millis(10), None)?;
        Ok(())
    }
}

fn insert_entry(conn: &Connection, entry_id: i64, fields: &EntryFields) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO Entry (id, headword, variation, part_of_speech, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry_id,
            fields.headword,
            fields.variation,
            fields.part_of_speech,
            fields.notes
        ],
    )?;
    Ok(())
}

fn insert_senses(conn: &Connection, entry_id: i64, meanings: &[String]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached("INSERT INTO Senses (entry_id, meaning) VALUES (?1, ?2)")?;
    for meaning in meanings {
        stmt.execute(params![entry_id, meaning])?;
    }
    Ok(())
}

/// 의미 먼저, 표제어 나중. 삭제된 Entry 행 수(0 또는 1) 반환.
fn delete_entry_rows(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM Senses WHERE entry_id = ?1", [id])?;
    conn.execute("DELETE FROM Entry WHERE id = ?1", [id])
}

/// 정규화 표제어 -> id 오름차순 목록 (2건 이상만)
fn duplicate_members(conn: &Connection) -> rusqlite::Result<BTreeMap<String, Vec<i64>>> {
    let mut stmt = conn.prepare("SELECT id, COALESCE(headword, '') FROM Entry ORDER BY id")?;
    let iter = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for row in iter {
        let (id, headword) = row?;
        groups.entry(normalize_headword(&headword)).or_default().push(id);
    }
    groups.retain(|_, ids| ids.len() > 1);
    Ok(groups)
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
