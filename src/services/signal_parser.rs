use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::signal::{RawSignal, SectorPattern, SignalRecord, DEFAULT_SECTOR};
use crate::services::scoring::calculate_score;
use crate::utils::normalize::{normalize_code, parse_percent_or_number};

/// 表头 -> 字段名
const HEADER_FIELDS: &[(&str, &str)] = &[
    ("日期", "date"),
    ("交易日", "date"),
    ("交易日期", "date"),
    ("date", "date"),
    ("代码", "code"),
    ("股票代码", "code"),
    ("证券代码", "code"),
    ("code", "code"),
    ("stock_code", "code"),
    ("symbol", "code"),
    ("名称", "name"),
    ("股票名称", "name"),
    ("证券名称", "name"),
    ("股票简称", "name"),
    ("简称", "name"),
    ("name", "name"),
    ("stock_name", "name"),
    ("板块", "sector"),
    ("所属板块", "sector"),
    ("行业", "sector"),
    ("概念", "sector"),
    ("sector", "sector"),
    ("industry", "sector"),
    ("板块形态", "sector_pattern"),
    ("形态", "sector_pattern"),
    ("板块走势", "sector_pattern"),
    ("sector_pattern", "sector_pattern"),
    ("pattern", "sector_pattern"),
    ("换手率", "turnover"),
    ("换手", "turnover"),
    ("turnover", "turnover"),
    ("turnover_rate", "turnover"),
    ("触发时间", "trigger_time"),
    ("时间", "trigger_time"),
    ("trigger_time", "trigger_time"),
    ("time", "trigger_time"),
    ("涨跌幅", "chg"),
    ("涨幅", "chg"),
    ("chg", "chg"),
    ("change", "chg"),
    ("change_pct", "chg"),
    ("成交额", "amount"),
    ("金额", "amount"),
    ("amount", "amount"),
    ("资产负债率", "debt_ratio"),
    ("负债率", "debt_ratio"),
    ("debt_ratio", "debt_ratio"),
];

/// 首行包含这些词时视为表头
const HEADER_KEYWORDS: &[&str] = &[
    "代码", "名称", "股票", "证券", "简称", "code", "name", "stock", "symbol",
];

const SECTOR_SEPARATORS: &[char] = &[',', '，', '、'];

fn header_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| HEADER_FIELDS.iter().copied().collect())
}

/// 表头/标签映射到字段名。忽略大小写、空格和 "(%)" 之类的单位后缀。
pub fn field_for_header(label: &str) -> Option<&'static str> {
    let key: String = label
        .trim()
        .trim_end_matches("(%)")
        .trim_end_matches("（%）")
        .trim_end_matches(['%', '％'])
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    header_map().get(key.as_str()).copied()
}

/// 解析粘贴的信号文本。依次尝试 JSON 数组、分隔表格、"标签：值" 块，先成功者为准。
/// 任何输入都不会报错，最坏情况返回空列表。
pub fn parse_signal_text(text: &str, default_date: Option<&str>) -> Vec<SignalRecord> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![];
    }

    if trimmed.starts_with('[') {
        if let Some(records) = parse_json_array(trimmed, default_date) {
            return records;
        }
    }

    let records = parse_table(trimmed, default_date);
    if !records.is_empty() {
        return records;
    }

    parse_label_blocks(trimmed, default_date)
}

fn parse_json_array(text: &str, default_date: Option<&str>) -> Option<Vec<SignalRecord>> {
    let items: Vec<Value> = serde_json::from_str(text).ok()?;
    Some(
        items
            .iter()
            .map(|item| {
                let mut raw = RawSignal::default();
                if let Value::Object(obj) = item {
                    for (key, value) in obj {
                        if let Some(field) = field_for_header(key) {
                            raw.set(field, value.clone());
                        }
                    }
                }
                normalize_record(&raw, default_date)
            })
            .filter(SignalRecord::is_identifiable)
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Pipe,
    Comma,
}

impl Delimiter {
    fn detect(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains('|') {
            Delimiter::Pipe
        } else {
            Delimiter::Comma
        }
    }

    fn split(self, line: &str) -> Vec<String> {
        let line = match self {
            // markdown 表格两侧的竖线
            Delimiter::Pipe => line.trim().trim_start_matches('|').trim_end_matches('|'),
            _ => line,
        };
        let sep = match self {
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
            Delimiter::Comma => ',',
        };
        line.split(sep).map(|cell| cell.trim().to_string()).collect()
    }
}

fn has_colon(line: &str) -> bool {
    line.contains(':') || line.contains('：')
}

fn is_separator_row(cells: &[String]) -> bool {
    cells.iter().any(|c| !c.is_empty())
        && cells.iter().all(|c| c.chars().all(|ch| matches!(ch, '-' | '=' | ' ')))
}

fn parse_table(text: &str, default_date: Option<&str>) -> Vec<SignalRecord> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let Some(first) = lines.first() else {
        return vec![];
    };

    let first_lower = first.to_lowercase();
    let has_header = HEADER_KEYWORDS.iter().any(|k| first_lower.contains(k));
    let delimiter = Delimiter::detect(first);

    let headers: Option<Vec<Option<&'static str>>> = has_header.then(|| {
        delimiter
            .split(first)
            .iter()
            .map(|h| field_for_header(h))
            .collect()
    });
    let data_lines = if has_header { &lines[1..] } else { &lines[..] };

    let mut records = Vec::new();
    for line in data_lines {
        if has_colon(line) && !line.contains(',') && !line.contains('\t') {
            continue;
        }
        let cells = delimiter.split(line);
        if is_separator_row(&cells) {
            continue;
        }

        let raw = match &headers {
            Some(keys) => raw_from_header_row(keys, &cells),
            None => raw_from_positional_row(&cells),
        };
        let record = normalize_record(&raw, default_date);
        if record.is_identifiable() {
            records.push(record);
        }
    }
    records
}

fn raw_from_header_row(keys: &[Option<&'static str>], cells: &[String]) -> RawSignal {
    let mut raw = RawSignal::default();
    for (key, cell) in keys.iter().zip(cells.iter()) {
        if let Some(field) = key {
            if !cell.is_empty() {
                raw.set(field, Value::String(cell.clone()));
            }
        }
    }
    raw
}

struct PositionalPatterns {
    code: Regex,
    name_start: Regex,
    han_text: Regex,
    percent_number: Regex,
    signed_number: Regex,
}

fn positional_patterns() -> &'static PositionalPatterns {
    static PATTERNS: OnceLock<PositionalPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PositionalPatterns {
        code: Regex::new(r"^\d{6}$").expect("code regex"),
        name_start: Regex::new(r"^[\p{Han}A-Za-z]").expect("name regex"),
        han_text: Regex::new(r"^\p{Han}{2,}$").expect("sector regex"),
        percent_number: Regex::new(r"^[+-]?\d+(\.\d+)?[%％]$").expect("turnover regex"),
        signed_number: Regex::new(r"^[+-]?\d+(\.\d+)?[%％]?$").expect("chg regex"),
    })
}

/// 无表头时按位置猜测字段：代码 > 名称 > 板块 > 换手率 > 涨跌幅，每个单元格只归属一个字段
fn raw_from_positional_row(cells: &[String]) -> RawSignal {
    let p = positional_patterns();
    let tokens: Vec<&str> = cells.iter().map(String::as_str).filter(|c| !c.is_empty()).collect();
    let mut claimed = vec![false; tokens.len()];
    let mut raw = RawSignal::default();

    let mut claim = |field: &str, matches: fn(&PositionalPatterns, &str) -> bool| {
        if let Some(i) = (0..tokens.len()).find(|&i| !claimed[i] && matches(p, tokens[i])) {
            claimed[i] = true;
            raw.set(field, Value::String(tokens[i].to_string()));
        }
    };

    claim("code", |p, t| p.code.is_match(t));
    claim("name", |p, t| {
        p.name_start.is_match(t) && !t.contains(['%', '％']) && t.chars().count() <= 8
    });
    claim("sector", |p, t| {
        !t.contains(['%', '％']) && (t.contains(SECTOR_SEPARATORS) || p.han_text.is_match(t))
    });
    claim("turnover", |p, t| p.percent_number.is_match(t));
    claim("chg", |p, t| p.signed_number.is_match(t));

    raw
}

fn parse_label_blocks(text: &str, default_date: Option<&str>) -> Vec<SignalRecord> {
    let mut blocks: Vec<Vec<&str>> = vec![];
    let mut current: Vec<&str> = vec![];
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
        .iter()
        .filter_map(|block| {
            let mut raw = RawSignal::default();
            for line in block {
                let Some((idx, colon)) = line.char_indices().find(|&(_, c)| c == ':' || c == '：') else {
                    continue;
                };
                let label = &line[..idx];
                let value = line[idx + colon.len_utf8()..].trim();
                if let Some(field) = field_for_header(label) {
                    if !value.is_empty() {
                        raw.set(field, Value::String(value.to_string()));
                    }
                }
            }
            let record = normalize_record(&raw, default_date);
            record.is_identifiable().then_some(record)
        })
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        // 600519.0 这类整数值浮点按整数输出，避免小数点被当成代码的一部分
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_percent_or_number(s),
        _ => None,
    }
}

/// 日期统一为 YYYY-MM-DD；无法识别的格式原样保留
fn normalize_date(raw: &str) -> String {
    let head = raw.split_whitespace().next().unwrap_or("");
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y.%m.%d"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(head, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    raw.trim().to_string()
}

fn split_sectors(value: Option<&Value>) -> Vec<String> {
    let sectors: Vec<String> = match value {
        Some(Value::String(s)) => s
            .split(SECTOR_SEPARATORS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![],
    };
    if sectors.is_empty() {
        vec![DEFAULT_SECTOR.to_string()]
    } else {
        sectors
    }
}

/// 原始字段 -> 标准信号。score/reason 始终按板块形态和换手率重新计算，不采信输入值。
pub fn normalize_record(raw: &RawSignal, default_date: Option<&str>) -> SignalRecord {
    let date = raw
        .date
        .as_ref()
        .and_then(value_text)
        .or_else(|| default_date.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string))
        .map(|d| normalize_date(&d))
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let sector_pattern = raw
        .sector_pattern
        .as_ref()
        .map(SectorPattern::from_value)
        .unwrap_or_default();
    let turnover = raw.turnover.as_ref().and_then(value_number);
    let scored = calculate_score(sector_pattern, turnover);

    SignalRecord {
        date,
        code: raw.code.as_ref().and_then(value_text).map(|c| normalize_code(&c)).unwrap_or_default(),
        name: raw.name.as_ref().and_then(value_text).unwrap_or_default(),
        sector: split_sectors(raw.sector.as_ref()),
        sector_pattern,
        turnover,
        trigger_time: raw.trigger_time.as_ref().and_then(value_text),
        chg: raw.chg.as_ref().and_then(value_number),
        amount: raw.amount.as_ref().and_then(value_number),
        debt_ratio: raw.debt_ratio.as_ref().and_then(value_number),
        score: scored.score,
        reason: scored.reason,
    }
}
