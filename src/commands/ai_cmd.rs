use crate::AppState;
use crate::models::ai::AISuggestion;
use crate::services::ai_service::AIService;
use crate::services::market_data::MarketDataService;

/// 为某日生成 AI 复盘建议并保存
pub async fn generate_suggestion(
    state: &AppState,
    date: &str,
) -> Result<AISuggestion, String> {
    let settings = state.db.load_settings().map_err(|e| e.to_string())?;
    let config = settings.active_ai_config()
        .cloned()
        .ok_or_else(|| "未配置可用的 AI 模型".to_string())?;

    let records: Vec<_> = state.db.list_signals(date, date)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|s| s.record)
        .collect();

    // 行情只是补充信息，拉取失败不影响生成建议
    let quotes = if settings.include_quotes_in_prompt && !records.is_empty() {
        let codes: Vec<String> = records.iter().map(|r| r.code.clone()).collect();
        match MarketDataService::new(settings.quote_timeout_secs) {
            Ok(service) => service.fetch_quotes(&codes).await.unwrap_or_else(|e| {
                log::warn!("行情拉取失败，继续生成建议: {}", e);
                vec![]
            }),
            Err(e) => {
                log::warn!("行情客户端创建失败: {}", e);
                vec![]
            }
        }
    } else {
        vec![]
    };

    let (content, usage) = AIService::suggest(&config, date, &records, &quotes)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(u) = &usage {
        let _ = state.db.record_token_usage(&config.model_name, u.prompt_tokens, u.completion_tokens);
    }

    let suggestion = AISuggestion {
        id: uuid::Uuid::new_v4().to_string(),
        date: date.to_string(),
        model_name: config.model_name.clone(),
        content,
        created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    state.db.save_ai_suggestion(&suggestion).map_err(|e| e.to_string())?;
    Ok(suggestion)
}

pub fn get_suggestion(
    state: &AppState,
    date: &str,
) -> Result<Option<AISuggestion>, String> {
    state.db.get_ai_suggestion(date).map_err(|e| e.to_string())
}

pub fn get_today_token_usage(state: &AppState) -> Result<u32, String> {
    state.db.get_today_token_usage().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_requires_active_config() {
        let state = AppState::in_memory().unwrap();
        let err = generate_suggestion(&state, "2024-03-01").await.unwrap_err();
        assert!(err.contains("未配置"));
    }
}
