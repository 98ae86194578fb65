//! Database Schema
//!
//! SQLite 테이블 스키마 정의. 한번 만들어진 사전 파일의 구조는 바뀌지 않는다.

/// 유효한 사전 데이터베이스가 반드시 가져야 하는 테이블
pub const REQUIRED_TABLES: [&str; 2] = ["Entry", "Senses"];

/// 새 사전 데이터베이스 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 표제어 테이블
CREATE TABLE Entry (
    id INTEGER PRIMARY KEY,
    headword TEXT,
    variation TEXT,
    part_of_speech TEXT,
    notes TEXT
);

-- 의미 테이블 (표제어 1 : N)
CREATE TABLE Senses (
    id INTEGER PRIMARY KEY,
    entry_id INTEGER,
    meaning TEXT,
    FOREIGN KEY(entry_id) REFERENCES Entry(id)
);
"#;

/// 테이블 존재 여부 조회
pub const TABLE_EXISTS: &str = "SELECT name FROM sqlite_master WHERE type='table' AND name=?1";
