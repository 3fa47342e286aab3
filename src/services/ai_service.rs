use anyhow::{Result, anyhow};
use std::sync::OnceLock;

use regex::Regex;

use crate::models::ai::*;
use crate::models::market::QuoteSnapshot;
use crate::models::signal::SignalRecord;
use crate::services::calendar::sector_stats;
use crate::utils::http::build_ai_client;
use crate::utils::retry::retry_with_backoff;

const SYSTEM_PROMPT: &str = "你是一位专业的A股短线复盘助手。用户会提供当日记录的信号（股票、板块、板块形态、换手率、打分）和行情快照。\n\
    请结合板块强弱与个股信号，给出次日的操作建议：\n\
    1. **板块研判**：哪些板块形态最强、是否有持续性\n\
    2. **重点关注**：按优先级列出值得关注的个股及理由\n\
    3. **操作计划**：买入/观察/放弃，附触发条件\n\
    4. **风险提示**\n\
    请用简洁专业的语言，引用具体数据支撑观点。";

pub struct AIService;

impl AIService {
    /// 根据某日的信号和行情生成复盘建议
    pub async fn suggest(
        config: &AIConfig,
        date: &str,
        records: &[SignalRecord],
        quotes: &[QuoteSnapshot],
    ) -> Result<(String, Option<TokenUsage>)> {
        if !config.enabled {
            return Err(anyhow!("AI 配置 {} 已停用", config.name));
        }
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("AI 配置 {} 未填写 API Key", config.name));
        }
        if records.is_empty() {
            return Err(anyhow!("no signals for date {}", date));
        }

        let client = build_ai_client(config.timeout_secs)?;
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let req = ChatCompletionRequest {
            model: config.model_name.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(&build_prompt(date, records, quotes)),
            ],
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
            stream: Some(false),
        };

        log::info!("请求 AI 复盘建议: {} 条信号, 模型 {}", records.len(), config.model_name);
        let response = retry_with_backoff(config.max_retries, || {
            send_completion(&client, &url, &config.api_key, &req)
        })
        .await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .ok_or_else(|| anyhow!("AI 返回空内容"))?;

        Ok((clean_model_artifacts(&content), response.usage))
    }
}

async fn send_completion(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    req: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse> {
    let resp = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(req)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(anyhow!("AI API error ({}): {}", status, truncate(&body, 200)));
    }

    serde_json::from_str(&body)
        .map_err(|e| anyhow!("AI response parse error: {} body: {}", e, truncate(&body, 200)))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn fmt_opt(v: Option<f64>, suffix: &str) -> String {
    v.map(|x| format!("{:.2}{}", x, suffix)).unwrap_or_else(|| "-".to_string())
}

/// 组装用户提示：信号明细 + 板块统计 + 行情快照
pub fn build_prompt(date: &str, records: &[SignalRecord], quotes: &[QuoteSnapshot]) -> String {
    let mut sorted: Vec<&SignalRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let signal_lines = sorted
        .iter()
        .map(|r| {
            format!(
                "{}({}) 板块:{} 形态:{} 换手{} 涨跌{} 触发{} 得分{} 理由:{}",
                r.name,
                r.code,
                r.sector.join("/"),
                r.sector_pattern.label().unwrap_or("无"),
                fmt_opt(r.turnover, "%"),
                fmt_opt(r.chg, "%"),
                r.trigger_time.as_deref().unwrap_or("-"),
                r.score,
                r.reason.join("；"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let sector_lines = sector_stats(records)
        .iter()
        .map(|s| format!("{}: {} 只, 平均分 {:.1}", s.sector, s.count, s.avg_score))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "复盘日期：{}\n\n【当日信号】共 {} 条\n{}\n\n【板块统计】\n{}\n",
        date,
        records.len(),
        signal_lines,
        sector_lines
    );

    if !quotes.is_empty() {
        let quote_lines = quotes
            .iter()
            .map(|q| {
                format!(
                    "{}({}) 现价{:.2} 涨跌{:.2}% 换手{:.2}% 量比{:.2} 5日{:.2}% 20日{:.2}% 主力净流入{:.0}万",
                    q.name, q.code, q.price, q.change_pct, q.turnover_rate, q.volume_ratio,
                    q.pct_5d, q.pct_20d, q.main_net_inflow / 10000.0
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str(&format!("\n【行情快照】\n{}\n", quote_lines));
    }

    prompt.push_str("\n请给出次日操作建议。");
    prompt
}

/// 清理模型输出中的内部标记（DeepSeek DSML、<think> 思考块）
pub fn clean_model_artifacts(content: &str) -> String {
    static THINK: OnceLock<Regex> = OnceLock::new();
    static DSML: OnceLock<Regex> = OnceLock::new();
    let think = THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex"));
    let dsml = DSML.get_or_init(|| Regex::new(r"<[｜\u{ff5c}][^>]*>[\s\S]*").expect("dsml regex"));
    let cleaned = think.replace_all(content, "");
    dsml.replace(&cleaned, "").trim().to_string()
}
