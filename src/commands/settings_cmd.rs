use crate::AppState;
use crate::models::settings::AppSettings;
use crate::models::ai::AIConfig;

pub fn get_settings(
    state: &AppState,
) -> Result<AppSettings, String> {
    state.db.load_settings().map_err(|e| e.to_string())
}

pub fn save_settings(
    state: &AppState,
    settings: AppSettings,
) -> Result<(), String> {
    state.db.save_settings(&settings).map_err(|e| e.to_string())
}

pub fn add_ai_config(
    state: &AppState,
    config: AIConfig,
) -> Result<AppSettings, String> {
    let mut settings = state.db.load_settings().map_err(|e| e.to_string())?;
    settings.ai_configs.push(config);
    if settings.active_ai_config_id.is_none() {
        settings.active_ai_config_id = settings.ai_configs.first().map(|c| c.id.clone());
    }
    state.db.save_settings(&settings).map_err(|e| e.to_string())?;
    Ok(settings)
}

pub fn remove_ai_config(
    state: &AppState,
    config_id: &str,
) -> Result<AppSettings, String> {
    let mut settings = state.db.load_settings().map_err(|e| e.to_string())?;
    settings.ai_configs.retain(|c| c.id != config_id);
    if settings.active_ai_config_id.as_deref() == Some(config_id) {
        settings.active_ai_config_id = settings.ai_configs.first().map(|c| c.id.clone());
    }
    state.db.save_settings(&settings).map_err(|e| e.to_string())?;
    Ok(settings)
}

pub fn set_active_ai_config(
    state: &AppState,
    config_id: &str,
) -> Result<AppSettings, String> {
    let mut settings = state.db.load_settings().map_err(|e| e.to_string())?;
    if !settings.ai_configs.iter().any(|c| c.id == config_id) {
        return Err(format!("AI 配置 {} 不存在", config_id));
    }
    settings.active_ai_config_id = Some(config_id.to_string());
    state.db.save_settings(&settings).map_err(|e| e.to_string())?;
    Ok(settings)
}
