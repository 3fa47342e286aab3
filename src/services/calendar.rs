use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::models::calendar::{CalendarDay, CalendarView, SectorStat};
use crate::models::signal::SignalRecord;

pub const DEFAULT_CALENDAR_DAYS: u32 = 30;
/// 日历窗口最多一年
pub const MAX_CALENDAR_DAYS: u32 = 366;
const TOP_NAMES_PER_DAY: usize = 5;

/// 日历窗口 [end - (days-1), end]，days 为 0 取默认值，超过一年按一年截断
pub fn calendar_range(end: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let days = if days == 0 { DEFAULT_CALENDAR_DAYS } else { days.min(MAX_CALENDAR_DAYS) };
    let start = end
        .checked_sub_signed(Duration::days(days as i64 - 1))
        .unwrap_or(NaiveDate::MIN);
    (start, end)
}

/// 把信号按日聚合成日历视图，没有信号的日子也会出现（signal_count = 0）
pub fn build_calendar(
    records: &[SignalRecord],
    end: NaiveDate,
    days: u32,
    suggestion_dates: &HashSet<String>,
) -> CalendarView {
    let (start, end) = calendar_range(end, days);

    let mut by_date: BTreeMap<NaiveDate, Vec<&SignalRecord>> = BTreeMap::new();
    for r in records {
        let Ok(date) = NaiveDate::parse_from_str(&r.date, "%Y-%m-%d") else {
            continue;
        };
        if date >= start && date <= end {
            by_date.entry(date).or_default().push(r);
        }
    }

    let mut calendar_days = Vec::new();
    let mut total_signals = 0;
    let mut day = start;
    while day <= end {
        let date_str = day.format("%Y-%m-%d").to_string();
        let mut day_records = by_date.remove(&day).unwrap_or_default();
        day_records.sort_by(|a, b| b.score.cmp(&a.score));
        total_signals += day_records.len();

        let avg_score = (!day_records.is_empty()).then(|| {
            let sum: u32 = day_records.iter().map(|r| r.score).sum();
            (sum as f64 / day_records.len() as f64 * 10.0).round() / 10.0
        });

        calendar_days.push(CalendarDay {
            signal_count: day_records.len(),
            max_score: day_records.first().map(|r| r.score),
            avg_score,
            top_names: day_records
                .iter()
                .take(TOP_NAMES_PER_DAY)
                .map(|r| if r.name.is_empty() { r.code.clone() } else { r.name.clone() })
                .collect(),
            has_suggestion: suggestion_dates.contains(&date_str),
            date: date_str,
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    CalendarView {
        start: start.format("%Y-%m-%d").to_string(),
        end: end.format("%Y-%m-%d").to_string(),
        days: calendar_days,
        total_signals,
    }
}

/// 板块统计：按出现次数降序，同次数按板块名
pub fn sector_stats(records: &[SignalRecord]) -> Vec<SectorStat> {
    let mut acc: HashMap<&str, (usize, u32)> = HashMap::new();
    for r in records {
        let mut seen = HashSet::new();
        for s in &r.sector {
            if !seen.insert(s.as_str()) {
                continue;
            }
            let entry = acc.entry(s.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += r.score;
        }
    }

    let mut stats: Vec<SectorStat> = acc
        .into_iter()
        .map(|(sector, (count, total))| SectorStat {
            sector: sector.to_string(),
            count,
            avg_score: (total as f64 / count as f64 * 10.0).round() / 10.0,
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sector.cmp(&b.sector)));
    stats
}
