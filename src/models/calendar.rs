use serde::{Deserialize, Serialize};

/// 日历中的一天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: String,
    pub signal_count: usize,
    pub max_score: Option<u32>,
    pub avg_score: Option<f64>,
    /// 按得分排序的前几只股票名称
    pub top_names: Vec<String>,
    pub has_suggestion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarView {
    pub start: String,
    pub end: String,
    pub days: Vec<CalendarDay>,
    pub total_signals: usize,
}

/// 板块维度统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorStat {
    pub sector: String,
    pub count: usize,
    pub avg_score: f64,
}
