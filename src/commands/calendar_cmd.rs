use std::collections::HashSet;

use chrono::NaiveDate;

use crate::AppState;
use crate::models::calendar::CalendarView;
use crate::services::calendar::{build_calendar, calendar_range};

/// 日历视图：默认以今天为终点，天数取设置中的 calendar_days
pub fn get_calendar(
    state: &AppState,
    end_date: Option<&str>,
    days: Option<u32>,
) -> Result<CalendarView, String> {
    let end = match end_date {
        Some(d) => NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
            .map_err(|e| format!("日期格式错误 {}: {}", d, e))?,
        None => chrono::Local::now().date_naive(),
    };
    let days = match days {
        Some(d) => d,
        None => state.db.load_settings().map_err(|e| e.to_string())?.calendar_days,
    };

    let (start, end) = calendar_range(end, days);
    let start_str = start.format("%Y-%m-%d").to_string();
    let end_str = end.format("%Y-%m-%d").to_string();

    let records: Vec<_> = state.db.list_signals(&start_str, &end_str)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|s| s.record)
        .collect();
    let suggested: HashSet<String> = state.db.suggestion_dates(&start_str, &end_str)
        .map_err(|e| e.to_string())?
        .into_iter()
        .collect();

    Ok(build_calendar(&records, end, days, &suggested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::signal_cmd::import_signals;

    #[test]
    fn test_get_calendar_uses_settings_days() {
        let state = AppState::in_memory().unwrap();
        import_signals(&state, "日期,代码,名称\n2024-03-01,600519,贵州茅台\n2024-03-05,000001,平安银行", None).unwrap();
        let view = get_calendar(&state, Some("2024-03-05"), None).unwrap();
        assert_eq!(view.days.len(), 30);
        assert_eq!(view.total_signals, 2);

        let week = get_calendar(&state, Some("2024-03-05"), Some(3)).unwrap();
        assert_eq!(week.days.len(), 3);
        assert_eq!(week.total_signals, 1);
    }

    #[test]
    fn test_get_calendar_bad_date() {
        let state = AppState::in_memory().unwrap();
        assert!(get_calendar(&state, Some("03/05"), None).is_err());
    }
}
