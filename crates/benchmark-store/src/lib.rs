//! Persistent benchmark record storage for EnviroLLM
//!
//! SQLite-backed store for `BenchmarkRecord`s. Records are insert-only: the
//! orchestrator writes each record exactly once and the only mutations are
//! explicit deletes. Writes run inside a transaction so a failed save rolls
//! back and no partial row is ever visible to readers.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use common::error::{Error, Result};
use common::models::{
    BenchmarkRecord, BenchmarkSource, BenchmarkStatus, PerformanceMetrics, QualityMetrics,
};

pub mod schema;

/// Column list shared by every SELECT, in schema order
const SELECT_COLUMNS: &str = "id, model_name, quantization, prompt, timestamp, source, status, \
     avg_cpu_usage, avg_memory_usage, avg_power_watts, peak_memory_gb, total_energy_wh, \
     duration_seconds, tokens_generated, tokens_per_second, prompt_tokens, total_tokens, \
     char_count, word_count, unique_words, unique_word_ratio, avg_word_length, sentence_count, \
     quality_score, response_text, response_preview, error";

/// CSV header, fixed column order for downstream tooling
const CSV_HEADER: &str = "id,model,timestamp,status,source,energy_wh,energy_per_token_wh,\
     duration_seconds,tokens_per_second,quality_score,avg_cpu_percent,avg_memory_percent,\
     avg_power_watts,prompt,response_preview";

/// SQLite-backed benchmark record store
pub struct BenchmarkStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl BenchmarkStore {
    /// Opens (or creates) a file-backed store
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(storage_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(storage_err)?;
        conn.execute_batch(schema::SCHEMA).map_err(storage_err)?;

        info!("Opened benchmark store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store for tests
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        conn.execute_batch(schema::SCHEMA).map_err(storage_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Path of the backing database file, if file-backed
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Persists a record; insert-only, the whole record or nothing
    pub fn save(&self, record: &BenchmarkRecord) -> Result<()> {
        let mut conn = self.conn.lock().expect("benchmark db lock");
        let tx = conn.transaction().map_err(storage_err)?;

        let metrics = record.metrics.as_ref();
        let quality = record.quality.as_ref();

        tx.execute(
            "INSERT INTO benchmark_records (
                id, model_name, quantization, prompt, timestamp, source, status,
                avg_cpu_usage, avg_memory_usage, avg_power_watts, peak_memory_gb,
                total_energy_wh, duration_seconds, tokens_generated, tokens_per_second,
                prompt_tokens, total_tokens,
                char_count, word_count, unique_words, unique_word_ratio, avg_word_length,
                sentence_count, quality_score,
                response_text, response_preview, error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
            params![
                record.id,
                record.model_name,
                record.quantization,
                record.prompt,
                record.timestamp.to_rfc3339(),
                record.source.as_str(),
                record.status.as_str(),
                metrics.map(|m| m.avg_cpu_usage),
                metrics.map(|m| m.avg_memory_usage),
                metrics.map(|m| m.avg_power_watts),
                metrics.map(|m| m.peak_memory_gb),
                metrics.map(|m| m.total_energy_wh),
                metrics.map(|m| m.duration_seconds),
                metrics.and_then(|m| m.tokens_generated).map(|v| v as i64),
                metrics.and_then(|m| m.tokens_per_second),
                metrics.and_then(|m| m.prompt_tokens).map(|v| v as i64),
                metrics.and_then(|m| m.total_tokens).map(|v| v as i64),
                quality.map(|q| q.char_count as i64),
                quality.map(|q| q.word_count as i64),
                quality.map(|q| q.unique_words as i64),
                quality.map(|q| q.unique_word_ratio),
                quality.map(|q| q.avg_word_length),
                quality.map(|q| q.sentence_count as i64),
                quality.map(|q| q.quality_score),
                record.response_text,
                record.response_preview,
                record.error,
            ],
        )
        .map_err(storage_err)?;

        tx.commit().map_err(storage_err)?;

        debug!("Saved benchmark record {}", record.id);
        Ok(())
    }

    /// Returns all records, newest first
    pub fn get_all(&self) -> Result<Vec<BenchmarkRecord>> {
        let conn = self.conn.lock().expect("benchmark db lock");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM benchmark_records ORDER BY timestamp DESC",
                SELECT_COLUMNS
            ))
            .map_err(storage_err)?;

        let records = stmt
            .query_map([], row_to_record)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(records)
    }

    /// Returns a single record by id
    pub fn get_by_id(&self, id: &str) -> Result<BenchmarkRecord> {
        let conn = self.conn.lock().expect("benchmark db lock");
        conn.query_row(
            &format!(
                "SELECT {} FROM benchmark_records WHERE id = ?1",
                SELECT_COLUMNS
            ),
            params![id],
            row_to_record,
        )
        .optional()
        .map_err(storage_err)?
        .ok_or_else(|| Error::NotFound(format!("benchmark {}", id)))
    }

    /// Returns the subset of records matching any of the given ids
    ///
    /// Order is unspecified; unknown ids are silently skipped.
    pub fn get_by_ids(&self, ids: &[String]) -> Result<Vec<BenchmarkRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=ids.len())
            .map(|n| format!("?{}", n))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.conn.lock().expect("benchmark db lock");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM benchmark_records WHERE id IN ({})",
                SELECT_COLUMNS, placeholders
            ))
            .map_err(storage_err)?;

        let records = stmt
            .query_map(params_from_iter(ids.iter()), row_to_record)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(records)
    }

    /// Deletes a record; returns whether it existed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("benchmark db lock");
        let deleted = conn
            .execute("DELETE FROM benchmark_records WHERE id = ?1", params![id])
            .map_err(storage_err)?;

        Ok(deleted > 0)
    }

    /// Deletes all records; returns how many were removed
    pub fn delete_all(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("benchmark db lock");
        let deleted = conn
            .execute("DELETE FROM benchmark_records", [])
            .map_err(storage_err)?;

        info!("Cleared {} benchmark records", deleted);
        Ok(deleted)
    }

    /// Serializes all records to CSV with a fixed column order
    ///
    /// `energy_per_token_wh` is computed on the fly and left blank when
    /// either energy or token count is absent.
    pub fn export_csv(&self) -> Result<String> {
        let records = self.get_all()?;

        let mut out = String::from(CSV_HEADER);
        out.push('\n');

        for record in &records {
            let metrics = record.metrics.as_ref();
            let energy = metrics.map(|m| m.total_energy_wh);
            let energy_per_token = metrics.and_then(|m| {
                m.tokens_generated.filter(|&tokens| tokens > 0).map(|tokens| {
                    m.total_energy_wh / tokens as f64
                })
            });

            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                csv_field(&record.id),
                csv_field(&record.model_name),
                record.timestamp.to_rfc3339(),
                record.status.as_str(),
                record.source.as_str(),
                opt_f64(energy),
                opt_f64(energy_per_token),
                opt_f64(metrics.map(|m| m.duration_seconds)),
                opt_f64(metrics.and_then(|m| m.tokens_per_second)),
                opt_f64(record.quality.as_ref().map(|q| q.quality_score)),
                opt_f64(metrics.map(|m| m.avg_cpu_usage)),
                opt_f64(metrics.map(|m| m.avg_memory_usage)),
                opt_f64(metrics.map(|m| m.avg_power_watts)),
                csv_field(&record.prompt),
                csv_field(record.response_preview.as_deref().unwrap_or("")),
            );
        }

        Ok(out)
    }
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Formats an optional float, blank when absent
fn opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Maps a row in `SELECT_COLUMNS` order back to a record
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<BenchmarkRecord> {
    let timestamp_raw: String = row.get(4)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let source_raw: String = row.get(5)?;
    let source = BenchmarkSource::parse(&source_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown source: {}", source_raw).into(),
        )
    })?;

    let status_raw: String = row.get(6)?;
    let status = BenchmarkStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown status: {}", status_raw).into(),
        )
    })?;

    let metrics = match row.get::<_, Option<f64>>(7)? {
        Some(avg_cpu_usage) => Some(PerformanceMetrics {
            avg_cpu_usage,
            avg_memory_usage: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            avg_power_watts: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
            peak_memory_gb: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
            total_energy_wh: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
            duration_seconds: row.get::<_, Option<f64>>(12)?.unwrap_or(0.0),
            tokens_generated: row.get::<_, Option<i64>>(13)?.map(|v| v as u64),
            tokens_per_second: row.get(14)?,
            prompt_tokens: row.get::<_, Option<i64>>(15)?.map(|v| v as u64),
            total_tokens: row.get::<_, Option<i64>>(16)?.map(|v| v as u64),
        }),
        None => None,
    };

    let quality = match row.get::<_, Option<i64>>(17)? {
        Some(char_count) => Some(QualityMetrics {
            char_count: char_count as usize,
            word_count: row.get::<_, Option<i64>>(18)?.unwrap_or(0) as usize,
            unique_words: row.get::<_, Option<i64>>(19)?.unwrap_or(0) as usize,
            unique_word_ratio: row.get::<_, Option<f64>>(20)?.unwrap_or(0.0),
            avg_word_length: row.get::<_, Option<f64>>(21)?.unwrap_or(0.0),
            sentence_count: row.get::<_, Option<i64>>(22)?.unwrap_or(0) as usize,
            quality_score: row.get::<_, Option<f64>>(23)?.unwrap_or(0.0),
        }),
        None => None,
    };

    Ok(BenchmarkRecord {
        id: row.get(0)?,
        model_name: row.get(1)?,
        quantization: row.get(2)?,
        prompt: row.get(3)?,
        timestamp,
        source,
        status,
        metrics,
        quality,
        response_text: row.get(24)?,
        response_preview: row.get(25)?,
        error: row.get(26)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn completed_record(model: &str, energy: f64, tokens: Option<u64>) -> BenchmarkRecord {
        let tokens_per_second = tokens.map(|t| t as f64 / 2.0);
        BenchmarkRecord {
            id: Uuid::new_v4().to_string(),
            model_name: model.to_string(),
            quantization: "Q4_K_M".to_string(),
            prompt: "Explain entropy, briefly.".to_string(),
            timestamp: Utc::now(),
            source: BenchmarkSource::Ollama,
            status: BenchmarkStatus::Completed,
            metrics: Some(PerformanceMetrics {
                avg_cpu_usage: 35.5,
                avg_memory_usage: 61.2,
                avg_power_watts: 121.0,
                peak_memory_gb: 19.6,
                total_energy_wh: energy,
                duration_seconds: 2.0,
                tokens_generated: tokens,
                tokens_per_second,
                prompt_tokens: Some(11),
                total_tokens: tokens.map(|t| t + 11),
            }),
            quality: Some(QualityMetrics {
                char_count: 120,
                word_count: 22,
                unique_words: 20,
                unique_word_ratio: 20.0 / 22.0,
                avg_word_length: 4.5,
                sentence_count: 2,
                quality_score: 87.3,
            }),
            response_text: Some("Entropy measures disorder. It always grows.".to_string()),
            response_preview: Some("Entropy measures disorder. It always grows.".to_string()),
            error: None,
        }
    }

    fn failed_record(model: &str) -> BenchmarkRecord {
        BenchmarkRecord {
            id: Uuid::new_v4().to_string(),
            model_name: model.to_string(),
            quantization: "Unknown".to_string(),
            prompt: "hello".to_string(),
            timestamp: Utc::now(),
            source: BenchmarkSource::OpenAiCompatible,
            status: BenchmarkStatus::Failed,
            metrics: None,
            quality: None,
            response_text: None,
            response_preview: None,
            error: Some("HTTP 503".to_string()),
        }
    }

    #[test]
    fn test_save_then_get_by_id_round_trips() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let record = completed_record("llama3:8b", 0.42, Some(64));

        store.save(&record).unwrap();
        let loaded = store.get_by_id(&record.id).unwrap();

        assert_eq!(loaded, record);
    }

    #[test]
    fn test_failed_record_round_trips() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let record = failed_record("phi3:mini");

        store.save(&record).unwrap();
        let loaded = store.get_by_id(&record.id).unwrap();

        assert_eq!(loaded, record);
        assert!(loaded.metrics.is_none());
        assert!(loaded.quality.is_none());
    }

    #[test]
    fn test_get_by_id_unknown_is_not_found() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let err = store.get_by_id("no-such-id").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_all_newest_first() {
        let store = BenchmarkStore::new_in_memory().unwrap();

        let mut older = completed_record("a", 0.1, None);
        older.timestamp = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut newer = completed_record("b", 0.2, None);
        newer.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newer.id);
        assert_eq!(all[1].id, older.id);
    }

    #[test]
    fn test_get_by_ids_skips_unknown() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let record = completed_record("llama3:8b", 0.3, Some(10));
        store.save(&record).unwrap();

        let found = store
            .get_by_ids(&[record.id.clone(), "missing".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, record.id);

        assert!(store.get_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_delete_reports_existence() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let record = failed_record("gemma:2b");
        store.save(&record).unwrap();

        assert!(store.delete(&record.id).unwrap());
        assert!(!store.delete(&record.id).unwrap());
    }

    #[test]
    fn test_delete_all_empties_store() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        store.save(&completed_record("a", 0.1, None)).unwrap();
        store.save(&failed_record("b")).unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let record = completed_record("llama3:8b", 0.3, Some(10));

        store.save(&record).unwrap();
        let err = store.save(&record).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_csv_energy_per_token() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let with_tokens = completed_record("with-tokens", 0.5, Some(100));
        let without_tokens = completed_record("without-tokens", 0.5, None);
        store.save(&with_tokens).unwrap();
        store.save(&without_tokens).unwrap();

        let csv = store.export_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);

        let tokens_line = lines[1..]
            .iter()
            .find(|l| l.contains("with-tokens"))
            .unwrap();
        let fields: Vec<&str> = tokens_line.split(',').collect();
        assert_eq!(fields[6], "0.005", "energy 0.5 Wh over 100 tokens");

        let no_tokens_line = lines[1..]
            .iter()
            .find(|l| l.contains("without-tokens"))
            .unwrap();
        let fields: Vec<&str> = no_tokens_line.split(',').collect();
        assert_eq!(fields[6], "", "blank when tokens are absent");
    }

    #[test]
    fn test_csv_quotes_free_text() {
        let store = BenchmarkStore::new_in_memory().unwrap();
        let mut record = completed_record("m", 0.1, Some(5));
        record.prompt = "compare a, b and \"c\"".to_string();
        store.save(&record).unwrap();

        let csv = store.export_csv().unwrap();
        assert!(csv.contains("\"compare a, b and \"\"c\"\"\""));
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.db");
        let record = completed_record("persistent", 1.2, Some(42));

        {
            let store = BenchmarkStore::new(&path).unwrap();
            store.save(&record).unwrap();
        }

        let reopened = BenchmarkStore::new(&path).unwrap();
        let loaded = reopened.get_by_id(&record.id).unwrap();
        assert_eq!(loaded, record);
    }
}
