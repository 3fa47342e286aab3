use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 未填写板块时的占位板块
pub const DEFAULT_SECTOR: &str = "未分类";

/// 板块形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum SectorPattern {
    /// 水下拉水上：盘中下探后翻红
    UnderwaterRally,
    /// 波动三角收窄
    NarrowingTriangle,
    #[default]
    None,
}

impl SectorPattern {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            SectorPattern::UnderwaterRally => Some("水下拉水上"),
            SectorPattern::NarrowingTriangle => Some("波动三角收窄"),
            SectorPattern::None => None,
        }
    }

    /// 解析板块形态文本。旧数据中的布尔值（"true"/"是"/"1"/"yes"）视为水下拉水上，
    /// 其它无法识别的文本一律归为 None。
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        match text {
            "水下拉水上" => SectorPattern::UnderwaterRally,
            "波动三角收窄" => SectorPattern::NarrowingTriangle,
            "是" | "1" => SectorPattern::UnderwaterRally,
            _ if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("yes") => {
                SectorPattern::UnderwaterRally
            }
            _ => SectorPattern::None,
        }
    }

    /// JSON 导入时字段可能是字符串、布尔或数字
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Bool(true) => SectorPattern::UnderwaterRally,
            Value::Number(n) if n.as_f64() == Some(1.0) => SectorPattern::UnderwaterRally,
            _ => SectorPattern::None,
        }
    }
}

impl From<Option<String>> for SectorPattern {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map(Self::parse).unwrap_or_default()
    }
}

impl From<SectorPattern> for Option<String> {
    fn from(pattern: SectorPattern) -> Self {
        pattern.label().map(str::to_string)
    }
}

/// 单只股票在某一交易日的复盘信号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub date: String,
    pub code: String,
    pub name: String,
    pub sector: Vec<String>,
    #[serde(default)]
    pub sector_pattern: SectorPattern,
    pub turnover: Option<f64>,
    #[serde(default)]
    pub trigger_time: Option<String>,
    pub chg: Option<f64>,
    pub amount: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub score: u32,
    pub reason: Vec<String>,
}

impl SignalRecord {
    /// 按板块形态和换手率重新计算得分与理由
    pub fn rescore(&mut self) {
        let result = crate::services::scoring::calculate_score(self.sector_pattern, self.turnover);
        self.score = result.score;
        self.reason = result.reason;
    }

    pub fn is_identifiable(&self) -> bool {
        !self.code.is_empty() || !self.name.is_empty()
    }

    /// 板块集合比较（忽略顺序）
    pub fn same_sectors(&self, other: &SignalRecord) -> bool {
        let mut a: Vec<&str> = self.sector.iter().map(String::as_str).collect();
        let mut b: Vec<&str> = other.sector.iter().map(String::as_str).collect();
        a.sort_unstable();
        a.dedup();
        b.sort_unstable();
        b.dedup();
        a == b
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u32,
    pub reason: Vec<String>,
}

/// 解析前的原始字段，值保持松散类型（粘贴文本中是字符串，JSON 中可能是数字/数组）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub sector: Option<Value>,
    #[serde(default)]
    pub sector_pattern: Option<Value>,
    #[serde(default)]
    pub turnover: Option<Value>,
    #[serde(default)]
    pub trigger_time: Option<Value>,
    #[serde(default)]
    pub chg: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub debt_ratio: Option<Value>,
}

impl RawSignal {
    /// 按字段名写入，未知字段忽略
    pub fn set(&mut self, field: &str, value: Value) {
        let slot = match field {
            "date" => &mut self.date,
            "code" => &mut self.code,
            "name" => &mut self.name,
            "sector" => &mut self.sector,
            "sector_pattern" => &mut self.sector_pattern,
            "turnover" => &mut self.turnover,
            "trigger_time" => &mut self.trigger_time,
            "chg" => &mut self.chg,
            "amount" => &mut self.amount,
            "debt_ratio" => &mut self.debt_ratio,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// 已入库的信号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSignal {
    pub id: i64,
    #[serde(flatten)]
    pub record: SignalRecord,
    pub created_at: String,
    pub updated_at: String,
}
