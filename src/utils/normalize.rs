/// 股票代码标准化：去掉所有非数字字符后左侧补零到 6 位。
/// 没有数字时返回空串；超过 6 位的数字串原样保留，不截断。
pub fn normalize_code(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    format!("{:0>6}", digits)
}

/// 解析百分比/金额文本："3.2%"、"12.5％"、"1,234.5"、"3.6亿"、"8000万" 等。
/// 空串、无法解析、NaN/inf 都返回 None。亿/万只做剥离，不换算量级。
pub fn parse_percent_or_number(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let text = text
        .strip_suffix('%')
        .or_else(|| text.strip_suffix('％'))
        .unwrap_or(text);
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '亿' | '万' | '元' | ',' | '¥' | '￥') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code_pads() {
        assert_eq!(normalize_code("600519"), "600519");
        assert_eq!(normalize_code("1"), "000001");
        assert_eq!(normalize_code("2371"), "002371");
        assert_eq!(normalize_code("sz000001"), "000001");
        assert_eq!(normalize_code("SH.600000"), "600000");
    }

    #[test]
    fn test_normalize_code_empty() {
        assert_eq!(normalize_code(""), "");
        assert_eq!(normalize_code("茅台"), "");
        assert_eq!(normalize_code("   "), "");
    }

    #[test]
    fn test_normalize_code_overlong_not_truncated() {
        assert_eq!(normalize_code("6005190"), "6005190");
    }

    #[test]
    fn test_normalize_code_length_for_short_digits() {
        for n in 0..=999_999u32 {
            if n % 9973 != 0 {
                continue;
            }
            let code = normalize_code(&n.to_string());
            assert_eq!(code.len(), 6);
            assert_eq!(code.trim_start_matches('0'), n.to_string().trim_start_matches('0'));
        }
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent_or_number("3.2%"), Some(3.2));
        assert_eq!(parse_percent_or_number("6.5％"), Some(6.5));
        assert_eq!(parse_percent_or_number(" -2.15% "), Some(-2.15));
        assert_eq!(parse_percent_or_number("+4.8"), Some(4.8));
    }

    #[test]
    fn test_parse_amount_separators() {
        assert_eq!(parse_percent_or_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_percent_or_number("3.6亿"), Some(3.6));
        assert_eq!(parse_percent_or_number("8000万"), Some(8000.0));
    }

    #[test]
    fn test_parse_invalid_is_none() {
        assert_eq!(parse_percent_or_number(""), None);
        assert_eq!(parse_percent_or_number("%"), None);
        assert_eq!(parse_percent_or_number("abc"), None);
        assert_eq!(parse_percent_or_number("NaN"), None);
        assert_eq!(parse_percent_or_number("inf"), None);
        assert_eq!(parse_percent_or_number("--"), None);
    }
}
