pub mod ai_cmd;
pub mod calendar_cmd;
pub mod market_cmd;
pub mod settings_cmd;
pub mod signal_cmd;
