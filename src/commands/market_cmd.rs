use crate::AppState;
use crate::models::market::QuoteSnapshot;
use crate::services::market_data::MarketDataService;

pub async fn fetch_quotes(
    state: &AppState,
    codes: Vec<String>,
) -> Result<Vec<QuoteSnapshot>, String> {
    let settings = state.db.load_settings().map_err(|e| e.to_string())?;
    let service = MarketDataService::new(settings.quote_timeout_secs).map_err(|e| e.to_string())?;
    service.fetch_quotes(&codes).await.map_err(|e| e.to_string())
}

/// 拉取某日已记录信号对应股票的行情
pub async fn fetch_day_quotes(
    state: &AppState,
    date: &str,
) -> Result<Vec<QuoteSnapshot>, String> {
    let codes: Vec<String> = state.db.list_signals(date, date)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|s| s.record.code)
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return Ok(vec![]);
    }
    fetch_quotes(state, codes).await
}
