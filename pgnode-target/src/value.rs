//! デバッガが返す値文字列のパース
//!
//! デバッガごとに表示形式が少しずつ異なるため（`0x0`、`0x0000000000000000`、
//! `(List *) 0x55d4...` など）、ここで吸収する。

/// 型表示の前置 `(Type *) ` を取り除く
fn strip_type_prefix(value: &str) -> &str {
    let value = value.trim();
    if value.starts_with('(') {
        if let Some(end) = value.find(')') {
            return value[end + 1..].trim_start();
        }
    }
    value
}

/// 最初の空白区切りトークンを取得する
pub fn first_token(value: &str) -> &str {
    strip_type_prefix(value)
        .split_whitespace()
        .next()
        .unwrap_or("")
}

/// ポインタ値をパースする
///
/// 16進数（0xプレフィックス付き）のみをポインタとして扱う。
///
/// # Examples
/// ```
/// use pgnode_target::value::parse_pointer;
///
/// assert_eq!(parse_pointer("0x1234"), Some(0x1234));
/// assert_eq!(parse_pointer("0x55d4 \"abc\""), Some(0x55d4));
/// assert_eq!(parse_pointer("10"), None);
/// ```
pub fn parse_pointer(value: &str) -> Option<u64> {
    let token = first_token(value);
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))?;
    u64::from_str_radix(hex, 16).ok()
}

/// NULLポインタかどうか
pub fn is_null_pointer(value: &str) -> bool {
    match first_token(value) {
        "NULL" | "nullptr" => true,
        _ => parse_pointer(value) == Some(0),
    }
}

/// 有効な（NULLでない）ポインタ値かどうか
pub fn is_valid_pointer(value: &str) -> bool {
    matches!(parse_pointer(value), Some(ptr) if ptr != 0)
}

/// 構造体の値そのもの（ポインタでない埋め込み構造体）かどうか
pub fn is_raw_struct(value: &str) -> bool {
    let value = value.trim();
    value.starts_with('{') || value == "..."
}

/// 整数値をパースする
///
/// `65 'A'` のような文字表示や16進数表示も受け付ける。
pub fn parse_int(value: &str) -> Option<i64> {
    let token = first_token(value);
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as i64);
    }
    token.parse::<i64>().ok()
}

/// 真偽値をパースする
pub fn parse_bool(value: &str) -> Option<bool> {
    match first_token(value) {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// `char *` の表示値から文字列部分を取り出す
///
/// 例: `0x55d4c6f0 "pg_class"` → `pg_class`
pub fn extract_string(value: &str) -> Option<String> {
    let value = value.trim();
    let start = value.find('"')?;
    let end = value.rfind('"')?;
    if end <= start {
        return None;
    }

    let mut result = String::with_capacity(end - start);
    let mut chars = value[start + 1..end].chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => break,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}
