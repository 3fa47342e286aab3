use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use journal_lib::AppState;
use journal_lib::commands::{ai_cmd, calendar_cmd, market_cmd, settings_cmd, signal_cmd};
use journal_lib::models::ai::AIConfig;
use journal_lib::utils::encoding::decode_import_bytes;

/// A股复盘信号日志
#[derive(Debug, Parser)]
#[command(name = "signal-journal", version, about)]
struct Cli {
    /// 数据目录（SQLite 数据库所在位置）
    #[arg(long, env = "SIGNAL_JOURNAL_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 解析文本并打印结果，不入库
    Parse {
        /// 输入文件，"-" 表示标准输入
        input: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// 解析文本并入库
    Import {
        input: String,
        /// 缺少日期列时使用的默认日期
        #[arg(long)]
        date: Option<String>,
    },
    /// 按日期区间列出信号
    List {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// 删除信号
    Delete { id: i64 },
    /// 计算得分
    Score {
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        turnover: Option<f64>,
    },
    /// 日历视图
    Calendar {
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// 拉取行情快照
    Quotes {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// 生成 AI 复盘建议
    Suggest {
        #[arg(long)]
        date: Option<String>,
    },
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    AddAi {
        #[arg(long)]
        name: String,
        #[arg(long)]
        base_url: String,
        #[arg(long, env = "SIGNAL_JOURNAL_AI_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long)]
        model: String,
    },
    UseAi { id: String },
    RemoveAi { id: String },
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn read_input(input: &str) -> Result<String> {
    let bytes = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(input).with_context(|| format!("读取文件失败: {}", input))?
    };
    Ok(decode_import_bytes(&bytes))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;
    let open_state = || AppState::open(data_dir.clone());

    match cli.command {
        Command::Parse { input, date } => {
            let text = read_input(&input)?;
            print_json(&signal_cmd::preview_signal_text(&text, date.as_deref()))
        }
        Command::Score { pattern, turnover } => {
            print_json(&signal_cmd::recalculate_score(pattern.as_deref(), turnover))
        }
        Command::Import { input, date } => {
            let state = open_state()?;
            let text = read_input(&input)?;
            let stored = signal_cmd::import_signals(&state, &text, date.as_deref())
                .map_err(anyhow::Error::msg)?;
            print_json(&stored)
        }
        Command::List { start, end } => {
            let state = open_state()?;
            let end = end.unwrap_or_else(today);
            let start = start.unwrap_or_else(|| end.clone());
            print_json(&signal_cmd::list_signals(&state, &start, &end).map_err(anyhow::Error::msg)?)
        }
        Command::Delete { id } => {
            let state = open_state()?;
            let deleted = signal_cmd::delete_signal(&state, id).map_err(anyhow::Error::msg)?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
        }
        Command::Calendar { end, days } => {
            let state = open_state()?;
            let view = calendar_cmd::get_calendar(&state, end.as_deref(), days)
                .map_err(anyhow::Error::msg)?;
            print_json(&view)
        }
        Command::Quotes { codes } => {
            let state = open_state()?;
            let quotes = market_cmd::fetch_quotes(&state, codes).await.map_err(anyhow::Error::msg)?;
            print_json(&quotes)
        }
        Command::Suggest { date } => {
            let state = open_state()?;
            let date = date.unwrap_or_else(today);
            let suggestion = ai_cmd::generate_suggestion(&state, &date)
                .await
                .map_err(anyhow::Error::msg)?;
            let used = ai_cmd::get_today_token_usage(&state).map_err(anyhow::Error::msg)?;
            log::info!("今日累计 token: {}", used);
            print_json(&suggestion)
        }
        Command::Config { action } => {
            let state = open_state()?;
            let settings = match action {
                ConfigAction::Show => settings_cmd::get_settings(&state),
                ConfigAction::AddAi { name, base_url, api_key, model } => {
                    let config = AIConfig {
                        name,
                        base_url,
                        api_key,
                        model_name: model,
                        ..AIConfig::default()
                    };
                    settings_cmd::add_ai_config(&state, config)
                }
                ConfigAction::UseAi { id } => settings_cmd::set_active_ai_config(&state, &id),
                ConfigAction::RemoveAi { id } => settings_cmd::remove_ai_config(&state, &id),
            }
            .map_err(anyhow::Error::msg)?;
            let mut shown = serde_json::to_value(&settings)?;
            if let Some(configs) = shown.get_mut("ai_configs").and_then(|v| v.as_array_mut()) {
                for c in configs {
                    c["api_key"] = serde_json::Value::String("***".to_string());
                }
            }
            print_json(&shown)
        }
    }
}
