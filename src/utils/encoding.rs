use encoding_rs::GB18030;

pub fn gb18030_to_utf8(bytes: &[u8]) -> String {
    let (cow, _, _) = GB18030.decode(bytes);
    cow.into_owned()
}

/// 导入文件解码：优先 UTF-8（去掉 BOM），失败时按 GB18030 解码（国内表格软件导出的 CSV 常见）
pub fn decode_import_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => gb18030_to_utf8(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice("代码,名称".as_bytes());
        assert_eq!(decode_import_bytes(&bytes), "代码,名称");
    }

    #[test]
    fn test_decode_gb18030_fallback() {
        let (encoded, _, _) = GB18030.encode("代码,名称\n600519,贵州茅台");
        assert!(std::str::from_utf8(&encoded).is_err());
        assert_eq!(decode_import_bytes(&encoded), "代码,名称\n600519,贵州茅台");
    }
}
