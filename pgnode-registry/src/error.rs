//! 設定ルールの検証エラー

use thiserror::Error;

/// 設定レコードの検証で拒否されたルール
///
/// 拒否されたルールだけが捨てられ、他のルールの読み込みは続行される。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{rule}: field '{field}' must not be empty")]
    EmptyField { rule: &'static str, field: &'static str },

    #[error("{rule}: '{value}' is not a valid type name")]
    InvalidTypeName { rule: &'static str, value: String },

    #[error("node tag '{0}' must consist of latin letters and underscores")]
    InvalidTag(String),

    #[error("list type '{element_type}': exactly one of struct/member or function/variable must be given")]
    AmbiguousListLocation { element_type: String },

    #[error("bitmapset reference {type_name}.{member}: {reason}")]
    InvalidBitmapsetReference {
        type_name: String,
        member: String,
        reason: String,
    },

    #[error("bitmask {type_name}.{member}: flag '{flag}' has invalid value '{value}'")]
    InvalidFlagValue {
        type_name: String,
        member: String,
        flag: String,
        value: String,
    },

    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(u32),
}
