//! 信号解析与打分集成测试
//!
//! 运行方式：
//!   cargo test --test test_signal_parser -- --nocapture

use journal_lib::models::signal::{SectorPattern, DEFAULT_SECTOR};
use journal_lib::services::scoring::calculate_score;
use journal_lib::services::signal_parser::parse_signal_text;
use journal_lib::utils::normalize::normalize_code;

// ==================== 三种输入格式 ====================

#[test]
fn test_json_array_path() {
    let text = r#"[{"code":"600519","name":"X","sector":"白酒","sector_pattern":"水下拉水上","turnover":3.2}]"#;
    let records = parse_signal_text(text, Some("2024-03-01"));
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.code, "600519");
    assert_eq!(r.sector, vec!["白酒"]);
    assert_eq!(r.sector_pattern, SectorPattern::UnderwaterRally);
    assert_eq!(r.score, 40);
    assert_eq!(r.date, "2024-03-01");
}

#[test]
fn test_header_table_path() {
    let records = parse_signal_text("代码,名称,换手率\n002371,Y,6.5", Some("2024-03-01"));
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.code, "002371");
    assert_eq!(r.name, "Y");
    assert_eq!(r.turnover, Some(6.5));
    assert_eq!(r.score, 20);
    assert_eq!(r.sector_pattern, SectorPattern::None);
    assert_eq!(r.sector, vec![DEFAULT_SECTOR]);
}

#[test]
fn test_english_header_table() {
    let text = "code\tname\tsector\tsector_pattern\tturnover\tchg\tamount\tdebt_ratio\n\
                300750\t宁德时代\t电池,新能源\ttrue\t5.1%\t-1.2%\t35.6亿\t65.3%";
    let records = parse_signal_text(text, Some("2024-03-01"));
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.sector, vec!["电池", "新能源"]);
    assert_eq!(r.sector_pattern, SectorPattern::UnderwaterRally);
    assert_eq!(r.chg, Some(-1.2));
    assert_eq!(r.amount, Some(35.6));
    assert_eq!(r.debt_ratio, Some(65.3));
    assert_eq!(r.score, 50);
}

// ==================== 异常输入 ====================

#[test]
fn test_empty_and_garbage_input() {
    assert!(parse_signal_text("", None).is_empty());
    assert!(parse_signal_text("   \n\n  ", None).is_empty());
    assert!(parse_signal_text("]not json[", None).is_empty());
}

#[test]
fn test_malformed_json_falls_through() {
    assert!(parse_signal_text("[{invalid", None).is_empty());
}

#[test]
fn test_malformed_json_then_label_block() {
    let text = "[草稿\n代码：600519\n名称：贵州茅台";
    let records = parse_signal_text(text, Some("2024-03-01"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "贵州茅台");
}

#[test]
fn test_legacy_boolean_pattern() {
    let records = parse_signal_text(
        r#"[{"code":"600519","name":"X","sector_pattern":"true"}]"#,
        Some("2024-03-01"),
    );
    assert_eq!(records[0].sector_pattern, SectorPattern::UnderwaterRally);
    assert_eq!(records[0].score, 30);
}

#[test]
fn test_unknown_pattern_normalizes_to_none() {
    let records = parse_signal_text(
        r#"[{"code":"600519","name":"X","sector_pattern":"放量突破"}]"#,
        Some("2024-03-01"),
    );
    assert_eq!(records[0].sector_pattern, SectorPattern::None);
}

// ==================== 打分与代码 ====================

#[test]
fn test_tier_exclusivity() {
    let result = calculate_score(SectorPattern::None, Some(8.0));
    assert_eq!(result.score, 30);
}

#[test]
fn test_score_always_recomputed() {
    let text = r#"[{"code":"600519","name":"X","score":100,"reason":["满分"]}]"#;
    let records = parse_signal_text(text, Some("2024-03-01"));
    let expected = calculate_score(records[0].sector_pattern, records[0].turnover);
    assert_eq!(records[0].score, expected.score);
    assert_eq!(records[0].reason, expected.reason);
}

#[test]
fn test_code_canonicalization() {
    assert_eq!(normalize_code("600519"), "600519");
    assert_eq!(normalize_code("1"), "000001");
    for digits in ["7", "42", "123", "8888", "30075", "300750"] {
        let code = normalize_code(digits);
        assert_eq!(code.len(), 6);
        assert!(code.ends_with(digits));
    }
}

#[test]
fn test_every_record_has_reasons() {
    let inputs = [
        "代码,名称,换手率\n600000,浦发银行,1\n000001,平安银行,",
        "600519\t贵州茅台\t白酒\t3.5%",
        "代码：1\n名称：A\n\n名称：B\n板块形态：波动三角收窄",
    ];
    for input in inputs {
        for r in parse_signal_text(input, Some("2024-03-01")) {
            assert!(r.score <= 100);
            assert!(!r.reason.is_empty());
            assert!(!r.sector.is_empty());
        }
    }
}
