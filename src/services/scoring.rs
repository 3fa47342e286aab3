use crate::models::signal::{ScoreResult, SectorPattern};

const REASON_FALLBACK: &str = "信息不足，无法评分";

/// 信号打分：板块形态 + 换手率分档，结果限制在 0-100。
/// 换手率三档互斥，只取命中的最高一档。
pub fn calculate_score(sector_pattern: SectorPattern, turnover: Option<f64>) -> ScoreResult {
    let mut score: i64 = 0;
    let mut reason = Vec::new();

    match sector_pattern {
        SectorPattern::UnderwaterRally => {
            score += 30;
            reason.push("板块形态：水下拉水上 +30".to_string());
        }
        SectorPattern::NarrowingTriangle => {
            score += 20;
            reason.push("板块形态：波动三角收窄 +20".to_string());
        }
        SectorPattern::None => {
            reason.push("板块形态缺失".to_string());
        }
    }

    match turnover {
        Some(t) if t >= 8.0 => {
            score += 30;
            reason.push(format!("换手率 {:.2}% ≥ 8% +30", t));
        }
        Some(t) if t >= 5.0 => {
            score += 20;
            reason.push(format!("换手率 {:.2}% 位于 5%-8% +20", t));
        }
        Some(t) if t >= 3.0 => {
            score += 10;
            reason.push(format!("换手率 {:.2}% 位于 3%-5% +10", t));
        }
        Some(_) => {}
        None => {
            reason.push("换手率缺失".to_string());
        }
    }

    if reason.is_empty() {
        reason.push(REASON_FALLBACK.to_string());
    }

    ScoreResult {
        score: score.clamp(0, 100) as u32,
        reason,
    }
}
