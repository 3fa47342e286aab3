use serde::{Deserialize, Serialize};

/// 行情快照（来自东方财富 ulist API）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub code: String,          // "600519"，不带市场前缀
    pub name: String,
    pub price: f64,            // 最新价
    pub change_pct: f64,       // 涨跌幅 %
    pub amount: f64,           // 成交额（元）
    pub amplitude: f64,        // 振幅 %
    pub turnover_rate: f64,    // 换手率 %
    pub volume_ratio: f64,     // 量比
    pub total_market_cap: f64, // 总市值（元）
    pub main_net_inflow: f64,  // 主力净流入（元）
    pub pct_5d: f64,           // 5日涨幅 %
    pub pct_20d: f64,          // 20日涨幅 %
}
