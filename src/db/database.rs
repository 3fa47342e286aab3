use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::models::ai::AISuggestion;
use crate::models::settings::AppSettings;
use crate::models::signal::{SectorPattern, SignalRecord, StoredSignal};

// 列长度上限（按字符）
const MAX_CODE_LEN: usize = 10;
const MAX_NAME_LEN: usize = 32;
const MAX_TRIGGER_TIME_LEN: usize = 16;
const MAX_SECTOR_LABEL_LEN: usize = 32;

const SIGNAL_COLUMNS: &str = "id, date, code, name, sector, sector_pattern, turnover, trigger_time, chg, amount, debt_ratio, score, reason, created_at, updated_at";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join("signal_journal.db");
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database lock poisoned"))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                id TEXT PRIMARY KEY DEFAULT 'default',
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                code TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                sector TEXT NOT NULL DEFAULT '[]',
                sector_pattern TEXT,
                turnover REAL,
                trigger_time TEXT,
                chg REAL,
                amount REAL,
                debt_ratio REAL,
                score INTEGER NOT NULL DEFAULT 0,
                reason TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_signals_date ON signals(date);
            CREATE INDEX IF NOT EXISTS idx_signals_code ON signals(code);

            CREATE TABLE IF NOT EXISTS ai_suggestions (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                model_name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_ai_suggestions_date ON ai_suggestions(date);

            CREATE TABLE IF NOT EXISTS token_usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                model_name TEXT NOT NULL,
                prompt_tokens INTEGER NOT NULL,
                completion_tokens INTEGER NOT NULL,
                total_tokens INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_token_date ON token_usage(date);
            ",
        )?;
        Ok(())
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let conn = self.lock()?;
        let data = serde_json::to_string(settings)?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (id, data, updated_at) VALUES ('default', ?1, datetime('now'))",
            rusqlite::params![data],
        )?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<AppSettings> {
        let conn = self.lock()?;
        let result = conn
            .query_row("SELECT data FROM settings WHERE id = 'default'", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        match result {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => {
                let default = AppSettings::default();
                drop(conn);
                self.save_settings(&default)?;
                Ok(default)
            }
        }
    }

    // ====== Signal Methods ======

    /// 批量写入信号（单事务），返回新记录 id。写入前重新打分并按列长度截断。
    pub fn insert_signals(&self, records: &[SignalRecord]) -> Result<Vec<i64>> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let r = fit_columns(record);
            tx.execute(
                "INSERT INTO signals (date, code, name, sector, sector_pattern, turnover, trigger_time, chg, amount, debt_ratio, score, reason, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'), datetime('now'))",
                rusqlite::params![
                    r.date,
                    r.code,
                    r.name,
                    serde_json::to_string(&r.sector)?,
                    r.sector_pattern.label(),
                    r.turnover,
                    r.trigger_time,
                    r.chg,
                    r.amount,
                    r.debt_ratio,
                    r.score,
                    serde_json::to_string(&r.reason)?,
                ],
            )?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn get_signal(&self, id: i64) -> Result<Option<StoredSignal>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM signals WHERE id = ?1", SIGNAL_COLUMNS);
        let row = conn
            .query_row(&sql, rusqlite::params![id], read_signal_row)
            .optional()?;
        Ok(row)
    }

    /// 按日期闭区间查询，同日按得分降序
    pub fn list_signals(&self, start: &str, end: &str) -> Result<Vec<StoredSignal>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM signals WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC, score DESC, id ASC",
            SIGNAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params![start, end], read_signal_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// 更新信号，返回是否存在该记录
    pub fn update_signal(&self, id: i64, record: &SignalRecord) -> Result<bool> {
        let conn = self.lock()?;
        let r = fit_columns(record);
        let changed = conn.execute(
            "UPDATE signals SET date = ?1, code = ?2, name = ?3, sector = ?4, sector_pattern = ?5, turnover = ?6, trigger_time = ?7, chg = ?8, amount = ?9, debt_ratio = ?10, score = ?11, reason = ?12, updated_at = datetime('now') WHERE id = ?13",
            rusqlite::params![
                r.date,
                r.code,
                r.name,
                serde_json::to_string(&r.sector)?,
                r.sector_pattern.label(),
                r.turnover,
                r.trigger_time,
                r.chg,
                r.amount,
                r.debt_ratio,
                r.score,
                serde_json::to_string(&r.reason)?,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_signal(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM signals WHERE id = ?1", rusqlite::params![id])?;
        Ok(changed > 0)
    }

    pub fn delete_signals_by_date(&self, date: &str) -> Result<usize> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM signals WHERE date = ?1", rusqlite::params![date])?;
        Ok(changed)
    }

    // ====== AI Suggestion Methods ======

    pub fn save_ai_suggestion(&self, suggestion: &AISuggestion) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO ai_suggestions (id, date, model_name, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![suggestion.id, suggestion.date, suggestion.model_name, suggestion.content, suggestion.created_at],
        )?;
        Ok(())
    }

    /// 某日最新一条建议
    pub fn get_ai_suggestion(&self, date: &str) -> Result<Option<AISuggestion>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT id, date, model_name, content, created_at FROM ai_suggestions WHERE date = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                rusqlite::params![date],
                |row| {
                    Ok(AISuggestion {
                        id: row.get(0)?,
                        date: row.get(1)?,
                        model_name: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    pub fn suggestion_dates(&self, start: &str, end: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT date FROM ai_suggestions WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![start, end], |row| row.get::<_, String>(0))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn record_token_usage(&self, model_name: &str, prompt_tokens: u32, completion_tokens: u32) -> Result<()> {
        let conn = self.lock()?;
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        conn.execute(
            "INSERT INTO token_usage (date, model_name, prompt_tokens, completion_tokens, total_tokens, created_at) VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            rusqlite::params![today, model_name, prompt_tokens, completion_tokens, prompt_tokens + completion_tokens],
        )?;
        Ok(())
    }

    pub fn get_today_token_usage(&self) -> Result<u32> {
        let conn = self.lock()?;
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let total = conn.query_row(
            "SELECT COALESCE(SUM(total_tokens), 0) FROM token_usage WHERE date = ?1",
            rusqlite::params![today],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(total)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// 入库前：重新打分 + 截断超长列
fn fit_columns(record: &SignalRecord) -> SignalRecord {
    let mut r = record.clone();
    r.rescore();
    r.code = truncate_chars(&r.code, MAX_CODE_LEN);
    r.name = truncate_chars(&r.name, MAX_NAME_LEN);
    r.trigger_time = r.trigger_time.map(|t| truncate_chars(&t, MAX_TRIGGER_TIME_LEN));
    r.sector = r.sector.iter().map(|s| truncate_chars(s, MAX_SECTOR_LABEL_LEN)).collect();
    r
}

fn read_signal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSignal> {
    let sector: String = row.get(4)?;
    let pattern: Option<String> = row.get(5)?;
    let reason: String = row.get(12)?;
    Ok(StoredSignal {
        id: row.get(0)?,
        record: SignalRecord {
            date: row.get(1)?,
            code: row.get(2)?,
            name: row.get(3)?,
            sector: serde_json::from_str(&sector).unwrap_or_default(),
            sector_pattern: SectorPattern::from(pattern),
            turnover: row.get(6)?,
            trigger_time: row.get(7)?,
            chg: row.get(8)?,
            amount: row.get(9)?,
            debt_ratio: row.get(10)?,
            score: row.get(11)?,
            reason: serde_json::from_str(&reason).unwrap_or_default(),
        },
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signal_parser::parse_signal_text;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let records = parse_signal_text(
            "日期,代码,名称,板块,板块形态,换手率\n\
             2024-03-01,600519,贵州茅台,白酒,水下拉水上,3.2\n\
             2024-03-01,000858,五粮液,白酒,,9.0\n\
             2024-03-04,002371,北方华创,半导体、芯片,波动三角收窄,6.1",
            None,
        );
        db.insert_signals(&records).unwrap();
        db
    }

    #[test]
    fn test_insert_and_list_range() {
        let db = seeded();
        let day = db.list_signals("2024-03-01", "2024-03-01").unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].record.name, "贵州茅台");
        assert_eq!(day[0].record.score, 40);
        assert_eq!(day[0].record.sector_pattern, SectorPattern::UnderwaterRally);
        assert_eq!(day[1].record.sector_pattern, SectorPattern::None);

        let all = db.list_signals("2024-03-01", "2024-03-31").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].record.sector, vec!["半导体", "芯片"]);
        assert!(!all[2].record.reason.is_empty());
    }

    #[test]
    fn test_insert_rescores_untrusted_score() {
        let db = Database::open_in_memory().unwrap();
        let mut record = parse_signal_text("代码,名称\n600000,浦发银行", Some("2024-03-01")).remove(0);
        record.score = 99;
        record.reason = vec!["伪造".to_string()];
        let ids = db.insert_signals(&[record]).unwrap();
        let stored = db.get_signal(ids[0]).unwrap().unwrap();
        assert_eq!(stored.record.score, 0);
        assert_eq!(stored.record.reason, vec!["板块形态缺失", "换手率缺失"]);
    }

    #[test]
    fn test_column_limits_truncate() {
        let db = Database::open_in_memory().unwrap();
        let mut record = parse_signal_text("代码,名称\n600000,浦发银行", Some("2024-03-01")).remove(0);
        record.name = "长".repeat(40);
        record.code = "1".repeat(12);
        let ids = db.insert_signals(&[record]).unwrap();
        let stored = db.get_signal(ids[0]).unwrap().unwrap();
        assert_eq!(stored.record.name.chars().count(), MAX_NAME_LEN);
        assert_eq!(stored.record.code.len(), MAX_CODE_LEN);
    }

    #[test]
    fn test_update_and_delete() {
        let db = seeded();
        let id = db.list_signals("2024-03-04", "2024-03-04").unwrap()[0].id;
        let mut record = db.get_signal(id).unwrap().unwrap().record;
        record.turnover = Some(8.8);
        assert!(db.update_signal(id, &record).unwrap());
        assert_eq!(db.get_signal(id).unwrap().unwrap().record.score, 50);

        assert!(db.delete_signal(id).unwrap());
        assert!(!db.delete_signal(id).unwrap());
        assert!(db.get_signal(id).unwrap().is_none());
        assert!(!db.update_signal(id, &record).unwrap());
    }

    #[test]
    fn test_delete_by_date() {
        let db = seeded();
        assert_eq!(db.delete_signals_by_date("2024-03-01").unwrap(), 2);
        assert_eq!(db.list_signals("2024-01-01", "2024-12-31").unwrap().len(), 1);
    }

    #[test]
    fn test_settings_default_persisted() {
        let db = Database::open_in_memory().unwrap();
        let settings = db.load_settings().unwrap();
        assert_eq!(settings.calendar_days, 30);
        let mut changed = settings.clone();
        changed.calendar_days = 14;
        db.save_settings(&changed).unwrap();
        assert_eq!(db.load_settings().unwrap().calendar_days, 14);
    }

    #[test]
    fn test_suggestions_latest_and_dates() {
        let db = Database::open_in_memory().unwrap();
        for (id, date, created) in [
            ("a", "2024-03-01", "2024-03-01 16:00:00"),
            ("b", "2024-03-01", "2024-03-01 17:00:00"),
            ("c", "2024-03-04", "2024-03-04 16:00:00"),
        ] {
            db.save_ai_suggestion(&AISuggestion {
                id: id.to_string(),
                date: date.to_string(),
                model_name: "m".to_string(),
                content: format!("建议 {}", id),
                created_at: created.to_string(),
            })
            .unwrap();
        }
        assert_eq!(db.get_ai_suggestion("2024-03-01").unwrap().unwrap().id, "b");
        assert!(db.get_ai_suggestion("2024-03-02").unwrap().is_none());
        assert_eq!(db.suggestion_dates("2024-03-01", "2024-03-31").unwrap(), vec!["2024-03-01", "2024-03-04"]);
    }

    #[test]
    fn test_token_usage() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_today_token_usage().unwrap(), 0);
        db.record_token_usage("m", 100, 50).unwrap();
        db.record_token_usage("m", 10, 5).unwrap();
        assert_eq!(db.get_today_token_usage().unwrap(), 165);
    }
}
