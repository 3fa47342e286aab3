use anyhow::{Result, anyhow};
use futures::future::join_all;

use crate::models::market::QuoteSnapshot;
use crate::utils::http::build_quote_client;
use crate::utils::normalize::normalize_code;

const ULIST_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
/// f2=最新价, f3=涨跌幅, f6=成交额, f7=振幅, f8=换手率, f10=量比, f12=代码, f13=市场(0深1沪),
/// f14=名称, f20=总市值, f24=近5日涨幅, f25=近20日涨幅, f62=主力净流入
const QUOTE_FIELDS: &str = "f2,f3,f6,f7,f8,f10,f12,f13,f14,f20,f24,f25,f62";
const BATCH_SIZE: usize = 50;

/// 行情补充数据：通过东方财富 ulist 接口按代码批量拉取快照
pub struct MarketDataService {
    client: reqwest::Client,
}

impl MarketDataService {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = build_quote_client(timeout_secs)?;
        Ok(Self { client })
    }

    /// 批量拉取行情。代码先标准化并去重，每批 50 个并发请求；
    /// 单批失败只记录日志，全部失败才返回错误。
    pub async fn fetch_quotes(&self, codes: &[String]) -> Result<Vec<QuoteSnapshot>> {
        let secids = unique_secids(codes);
        if secids.is_empty() {
            return Ok(vec![]);
        }

        let batches: Vec<String> = secids.chunks(BATCH_SIZE).map(|c| c.join(",")).collect();
        let results = join_all(batches.iter().map(|b| self.fetch_batch(b))).await;

        let mut quotes = Vec::new();
        let mut last_err = None;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(batch) => quotes.extend(batch),
                Err(e) => {
                    log::warn!("行情批次拉取失败: {}", e);
                    failed += 1;
                    last_err = Some(e);
                }
            }
        }

        if failed == batches.len() {
            return Err(last_err.unwrap_or_else(|| anyhow!("行情拉取失败")));
        }
        log::info!("行情拉取完成: {} 只（{} 批失败）", quotes.len(), failed);
        Ok(quotes)
    }

    async fn fetch_batch(&self, secids: &str) -> Result<Vec<QuoteSnapshot>> {
        let url = format!(
            "{}?fltt=2&invt=2&fields={}&secids={}",
            ULIST_URL, QUOTE_FIELDS, secids
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("行情接口返回 {}", status));
        }
        let text = resp.text().await?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| anyhow!("东方财富数据解析失败: {}", e))?;
        Ok(parse_ulist_response(&json))
    }
}

/// 解析 ulist 响应中的 data.diff 数组
pub fn parse_ulist_response(json: &serde_json::Value) -> Vec<QuoteSnapshot> {
    json.get("data")
        .and_then(|d| d.get("diff"))
        .and_then(|d| d.as_array())
        .map(|items| items.iter().filter_map(parse_quote_item).collect())
        .unwrap_or_default()
}

fn parse_quote_item(item: &serde_json::Value) -> Option<QuoteSnapshot> {
    let code = item.get("f12")?.as_str()?.to_string();
    let name = item.get("f14")?.as_str()?.to_string();

    // 停牌或无效数据
    let price = get_f64(item, "f2");
    if price <= 0.0 {
        return None;
    }

    Some(QuoteSnapshot {
        code,
        name,
        price,
        change_pct: get_f64(item, "f3"),
        amount: get_f64(item, "f6"),
        amplitude: get_f64(item, "f7"),
        turnover_rate: get_f64(item, "f8"),
        volume_ratio: get_f64(item, "f10"),
        total_market_cap: get_f64(item, "f20"),
        pct_5d: get_f64(item, "f24"),
        pct_20d: get_f64(item, "f25"),
        main_net_inflow: get_f64(item, "f62"),
    })
}

/// 东财在停牌等情况下会返回 "-"，统一按 0 处理
fn get_f64(item: &serde_json::Value, key: &str) -> f64 {
    item.get(key)
        .and_then(|v| {
            if v.is_f64() {
                v.as_f64()
            } else if v.is_i64() {
                v.as_i64().map(|i| i as f64)
            } else if v.is_string() {
                v.as_str().and_then(|s| s.parse::<f64>().ok())
            } else {
                None
            }
        })
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// 6 位代码 -> 东财 secid：6/9 开头为沪市 "1."，其余为 "0."
pub fn code_to_secid(code: &str) -> Option<String> {
    let code = normalize_code(code);
    if code.len() != 6 {
        return None;
    }
    let market = if code.starts_with('6') || code.starts_with('9') { 1 } else { 0 };
    Some(format!("{}.{}", market, code))
}

fn unique_secids(codes: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    codes
        .iter()
        .filter_map(|c| code_to_secid(c))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
