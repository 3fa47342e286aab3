use serde::{Deserialize, Serialize};
use super::ai::AIConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub ai_configs: Vec<AIConfig>,
    #[serde(default)]
    pub active_ai_config_id: Option<String>,
    /// 日历视图默认展示天数
    #[serde(default = "default_calendar_days")]
    pub calendar_days: u32,
    #[serde(default = "default_quote_timeout")]
    pub quote_timeout_secs: u64,
    /// 生成建议时是否附带行情快照
    #[serde(default = "default_true")]
    pub include_quotes_in_prompt: bool,
}

fn default_calendar_days() -> u32 { 30 }
fn default_quote_timeout() -> u64 { 10 }
fn default_true() -> bool { true }

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ai_configs: vec![],
            active_ai_config_id: None,
            calendar_days: 30,
            quote_timeout_secs: 10,
            include_quotes_in_prompt: true,
        }
    }
}

impl AppSettings {
    pub fn active_ai_config(&self) -> Option<&AIConfig> {
        let id = self.active_ai_config_id.as_deref()?;
        self.ai_configs.iter().find(|c| c.id == id)
    }
}
