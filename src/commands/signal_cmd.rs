use crate::AppState;
use crate::models::signal::{RawSignal, ScoreResult, SectorPattern, SignalRecord, StoredSignal};
use crate::services::scoring::calculate_score;
use crate::services::signal_parser::{normalize_record, parse_signal_text};

/// 仅解析不入库，供录入界面预览
pub fn preview_signal_text(text: &str, default_date: Option<&str>) -> Vec<SignalRecord> {
    parse_signal_text(text, default_date)
}

/// 解析粘贴文本并批量入库，返回新记录
pub fn import_signals(
    state: &AppState,
    text: &str,
    default_date: Option<&str>,
) -> Result<Vec<StoredSignal>, String> {
    let records = parse_signal_text(text, default_date);
    if records.is_empty() {
        log::info!("导入文本未解析出任何信号");
        return Ok(vec![]);
    }
    let ids = state.db.insert_signals(&records).map_err(|e| e.to_string())?;
    log::info!("导入信号 {} 条", ids.len());
    load_all(state, &ids)
}

/// 手动表单录入单条信号
pub fn add_signal(
    state: &AppState,
    raw: RawSignal,
    default_date: Option<&str>,
) -> Result<StoredSignal, String> {
    let record = normalize_record(&raw, default_date);
    if !record.is_identifiable() {
        return Err("代码和名称至少填写一项".to_string());
    }
    let ids = state.db.insert_signals(&[record]).map_err(|e| e.to_string())?;
    load_all(state, &ids)?
        .pop()
        .ok_or_else(|| "写入后未找到记录".to_string())
}

pub fn update_signal(
    state: &AppState,
    id: i64,
    raw: RawSignal,
) -> Result<StoredSignal, String> {
    let existing = state.db.get_signal(id).map_err(|e| e.to_string())?
        .ok_or_else(|| format!("信号 {} 不存在", id))?;
    let record = normalize_record(&raw, Some(&existing.record.date));
    if !record.is_identifiable() {
        return Err("代码和名称至少填写一项".to_string());
    }
    state.db.update_signal(id, &record).map_err(|e| e.to_string())?;
    state.db.get_signal(id).map_err(|e| e.to_string())?
        .ok_or_else(|| format!("信号 {} 不存在", id))
}

pub fn delete_signal(state: &AppState, id: i64) -> Result<bool, String> {
    state.db.delete_signal(id).map_err(|e| e.to_string())
}

pub fn list_signals(
    state: &AppState,
    start: &str,
    end: &str,
) -> Result<Vec<StoredSignal>, String> {
    state.db.list_signals(start, end).map_err(|e| e.to_string())
}

/// 手动重算得分
pub fn recalculate_score(sector_pattern: Option<&str>, turnover: Option<f64>) -> ScoreResult {
    let pattern = sector_pattern.map(SectorPattern::parse).unwrap_or_default();
    calculate_score(pattern, turnover.filter(|t| t.is_finite()))
}

fn load_all(state: &AppState, ids: &[i64]) -> Result<Vec<StoredSignal>, String> {
    let mut stored = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(s) = state.db.get_signal(*id).map_err(|e| e.to_string())? {
            stored.push(s);
        }
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_and_list() {
        let state = AppState::in_memory().unwrap();
        let stored = import_signals(&state, "代码,名称,换手率\n002371,Y,6.5", Some("2024-03-01")).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].record.score, 20);
        assert_eq!(list_signals(&state, "2024-03-01", "2024-03-01").unwrap().len(), 1);
    }

    #[test]
    fn test_import_garbage_is_empty() {
        let state = AppState::in_memory().unwrap();
        assert!(import_signals(&state, "]not json[", None).unwrap().is_empty());
    }

    #[test]
    fn test_add_signal_requires_identity() {
        let state = AppState::in_memory().unwrap();
        let raw = RawSignal {
            turnover: Some(json!(9.0)),
            ..RawSignal::default()
        };
        assert!(add_signal(&state, raw, Some("2024-03-01")).is_err());
    }

    #[test]
    fn test_add_and_update_keeps_date() {
        let state = AppState::in_memory().unwrap();
        let raw = RawSignal {
            code: Some(json!("600519")),
            name: Some(json!("贵州茅台")),
            sector_pattern: Some(json!("是")),
            ..RawSignal::default()
        };
        let added = add_signal(&state, raw, Some("2024-03-01")).unwrap();
        assert_eq!(added.record.score, 30);

        let update = RawSignal {
            code: Some(json!("600519")),
            name: Some(json!("贵州茅台")),
            turnover: Some(json!("5.5%")),
            ..RawSignal::default()
        };
        let updated = update_signal(&state, added.id, update).unwrap();
        assert_eq!(updated.record.date, "2024-03-01");
        assert_eq!(updated.record.sector_pattern, SectorPattern::None);
        assert_eq!(updated.record.score, 20);

        assert!(update_signal(&state, 999, RawSignal::default()).is_err());
        assert!(delete_signal(&state, added.id).unwrap());
    }

    #[test]
    fn test_recalculate_score() {
        assert_eq!(recalculate_score(Some("波动三角收窄"), Some(8.0)).score, 50);
        assert_eq!(recalculate_score(None, Some(f64::NAN)).reason, vec!["板块形态缺失", "换手率缺失"]);
    }
}
