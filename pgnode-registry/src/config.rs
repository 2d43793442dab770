//! 設定レコード
//!
//! ホスト側の設定ファイル（JSON）から得られるレコードと、その検証・適用。
//! ファイルの場所の解決や監視はホストの責務で、ここでは扱わない。

use crate::error::ConfigError;
use crate::special::{
    ArrayMemberRule, BitmapsetAnchor, BitmapsetReference, BitmaskFlag, BitmaskRule,
    ListElementRule, ListLocation, SpecialMemberRegistry,
};
use crate::tags::{normalize_tag, TypeRegistry};
use crate::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::warn;

/// サポートする設定ファイルの最大バージョン
pub const MAX_CONFIG_VERSION: u32 = 5;

/// 型名として受け付ける形（修飾子とポインタを許す）
static TYPE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Za-z_][A-Za-z0-9_ ]*[\s*]*$").expect("static regex"));

/// 親自身を起点とするアンカー名
pub const ANCHOR_SELF: &str = "$self$";
/// 直接の親を起点とするアンカー名
pub const ANCHOR_PARENT: &str = "$parent$";

fn default_version() -> u32 {
    1
}

/// 設定ファイル全体
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: u32,
    /// タグ定義ソースのスキャン前に登録するタグ
    #[serde(default)]
    pub node_tags: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<AliasRecord>,
    #[serde(default)]
    pub arrays: Vec<ArrayRecord>,
    #[serde(default)]
    pub list_types: Vec<ListTypeRecord>,
    #[serde(default)]
    pub bitmapset_references: Vec<BitmapsetReferenceRecord>,
    #[serde(default)]
    pub bitmask_flags: Vec<BitmaskRecord>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            node_tags: Vec::new(),
            aliases: Vec::new(),
            arrays: Vec::new(),
            list_types: Vec::new(),
            bitmapset_references: Vec::new(),
            bitmask_flags: Vec::new(),
        }
    }
}

/// 型エイリアス
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AliasRecord {
    pub alias: String,
    #[serde(rename = "type")]
    pub real_type: String,
}

/// 可変長配列メンバ
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArrayRecord {
    pub type_name: String,
    pub member_name: String,
    pub length_expression: String,
}

/// List要素型（現行形式）
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ListTypeFields {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(rename = "struct", default)]
    pub struct_name: Option<String>,
    #[serde(default)]
    pub member: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
}

/// List要素型
///
/// 旧形式は `[["関数名", "変数名"], "要素型"]` のタプルで、関数名には
/// 共有ライブラリ名やシグネチャが付いていることがある。
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ListTypeRecord {
    Modern(ListTypeFields),
    Legacy((String, String), String),
}

/// Bitmapset参照
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BitmapsetReferenceRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub member: String,
    /// `$self$`、`$parent$`、または祖先の型名
    pub anchor: String,
    pub paths: Vec<Vec<String>>,
    #[serde(default)]
    pub delta: i64,
    #[serde(default)]
    pub scan_roots: bool,
}

/// ビットマスクのフラグ
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FlagRecord {
    pub name: String,
    pub value: String,
}

/// ビットマスクメンバ
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BitmaskRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub member: String,
    pub flags: Vec<FlagRecord>,
}

/// 型名として妥当か（修飾子とポインタを許す）
fn is_valid_type_name(value: &str) -> bool {
    TYPE_NAME.is_match(value)
}

fn require(rule: &'static str, field: &'static str, value: &str) -> std::result::Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::EmptyField { rule, field })
    } else {
        Ok(())
    }
}

fn require_type(rule: &'static str, value: &str) -> std::result::Result<(), ConfigError> {
    if is_valid_type_name(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTypeName {
            rule,
            value: value.to_string(),
        })
    }
}

/// フラグ値をパースする（16進数または10進数）
fn parse_flag_value(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl AliasRecord {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        require("alias", "alias", &self.alias)?;
        require("alias", "type", &self.real_type)?;
        require_type("alias", &self.alias)?;
        require_type("alias", &self.real_type)
    }
}

impl ArrayRecord {
    fn to_rule(&self) -> std::result::Result<ArrayMemberRule, ConfigError> {
        require("array", "typeName", &self.type_name)?;
        require("array", "memberName", &self.member_name)?;
        require("array", "lengthExpression", &self.length_expression)?;
        require_type("array", &self.type_name)?;
        Ok(ArrayMemberRule::new(
            self.type_name.trim(),
            self.member_name.trim(),
            self.length_expression.trim(),
        ))
    }
}

impl ListTypeRecord {
    fn to_rule(&self) -> std::result::Result<ListElementRule, ConfigError> {
        match self {
            ListTypeRecord::Modern(fields) => {
                require("list type", "type", &fields.element_type)?;
                require_type("list type", &fields.element_type)?;
                let location = match (
                    &fields.struct_name,
                    &fields.member,
                    &fields.function,
                    &fields.variable,
                ) {
                    (Some(s), Some(m), None, None) => {
                        require("list type", "struct", s)?;
                        require("list type", "member", m)?;
                        ListLocation::Member {
                            struct_name: s.trim().to_string(),
                            member: m.trim().to_string(),
                        }
                    }
                    (None, None, Some(f), Some(v)) => {
                        require("list type", "function", f)?;
                        require("list type", "variable", v)?;
                        ListLocation::Variable {
                            function: f.trim().to_string(),
                            variable: v.trim().to_string(),
                        }
                    }
                    _ => {
                        return Err(ConfigError::AmbiguousListLocation {
                            element_type: fields.element_type.clone(),
                        })
                    }
                };
                Ok(ListElementRule {
                    location,
                    element_type: fields.element_type.trim().to_string(),
                })
            }
            ListTypeRecord::Legacy((function, variable), element_type) => {
                require("list type", "function", function)?;
                require("list type", "variable", variable)?;
                require("list type", "type", element_type)?;
                require_type("list type", element_type)?;
                // 関数名の正規化は登録時に行われる
                Ok(ListElementRule {
                    location: ListLocation::Variable {
                        function: function.trim().to_string(),
                        variable: variable.trim().to_string(),
                    },
                    element_type: element_type.trim().to_string(),
                })
            }
        }
    }
}

impl BitmapsetReferenceRecord {
    fn to_reference(&self) -> std::result::Result<BitmapsetReference, ConfigError> {
        require("bitmapset reference", "type", &self.type_name)?;
        require("bitmapset reference", "member", &self.member)?;
        require("bitmapset reference", "anchor", &self.anchor)?;
        let invalid = |reason: &str| ConfigError::InvalidBitmapsetReference {
            type_name: self.type_name.clone(),
            member: self.member.clone(),
            reason: reason.to_string(),
        };

        if self.paths.is_empty() {
            return Err(invalid("at least one path is required"));
        }
        if self
            .paths
            .iter()
            .any(|p| p.is_empty() || p.iter().any(|f| f.trim().is_empty()))
        {
            return Err(invalid("paths must not contain empty fields"));
        }

        let anchor = match self.anchor.trim() {
            ANCHOR_SELF => BitmapsetAnchor::SelfVar,
            ANCHOR_PARENT => BitmapsetAnchor::Parent,
            other if is_valid_type_name(other) => BitmapsetAnchor::Ancestor(other.to_string()),
            _ => return Err(invalid("anchor must be $self$, $parent$ or a type name")),
        };

        Ok(BitmapsetReference {
            type_name: self.type_name.trim().to_string(),
            member: self.member.trim().to_string(),
            anchor,
            paths: self
                .paths
                .iter()
                .map(|p| p.iter().map(|f| f.trim().to_string()).collect())
                .collect(),
            delta: self.delta,
            scan_roots: self.scan_roots,
        })
    }
}

impl BitmaskRecord {
    fn to_rule(&self) -> std::result::Result<BitmaskRule, ConfigError> {
        require("bitmask", "type", &self.type_name)?;
        require("bitmask", "member", &self.member)?;
        let mut flags = Vec::with_capacity(self.flags.len());
        for flag in &self.flags {
            let value = parse_flag_value(&flag.value).ok_or_else(|| ConfigError::InvalidFlagValue {
                type_name: self.type_name.clone(),
                member: self.member.clone(),
                flag: flag.name.clone(),
                value: flag.value.clone(),
            })?;
            flags.push(BitmaskFlag {
                name: flag.name.clone(),
                value,
            });
        }
        Ok(BitmaskRule {
            type_name: self.type_name.trim().to_string(),
            member: self.member.trim().to_string(),
            flags,
        })
    }
}

impl ConfigFile {
    /// JSON文字列から設定を読み込む
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse configuration: {}", e))
    }

    /// 設定をレジストリに適用する
    ///
    /// 不正なルールはそれぞれ拒否してログに残し、残りのルールは適用する。
    /// 拒否されたルールのエラーを返す。
    pub fn apply(
        &self,
        types: &mut TypeRegistry,
        special: &mut SpecialMemberRegistry,
    ) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.version == 0 || self.version > MAX_CONFIG_VERSION {
            let error = ConfigError::UnsupportedVersion(self.version);
            warn!("{}", error);
            errors.push(error);
            return errors;
        }

        let mut reject = |error: ConfigError| {
            warn!("rejected configuration rule: {}", error);
            errors.push(error);
        };

        for tag in &self.node_tags {
            let normalized = normalize_tag(tag);
            if types.is_valid_tag_name(&normalized) {
                types.add_tags([normalized.as_str()]);
            } else {
                reject(ConfigError::InvalidTag(tag.clone()));
            }
        }

        for alias in &self.aliases {
            match alias.validate() {
                Ok(()) => types.add_alias(&alias.alias, &alias.real_type),
                Err(e) => reject(e),
            }
        }

        for array in &self.arrays {
            match array.to_rule() {
                Ok(rule) => special.add_array_rule(rule),
                Err(e) => reject(e),
            }
        }

        for list in &self.list_types {
            match list.to_rule() {
                Ok(rule) => special.add_list_rule(rule),
                Err(e) => reject(e),
            }
        }

        for reference in &self.bitmapset_references {
            match reference.to_reference() {
                Ok(reference) => special.add_bitmapset_reference(reference),
                Err(e) => reject(e),
            }
        }

        for bitmask in &self.bitmask_flags {
            match bitmask.to_rule() {
                Ok(rule) => special.add_bitmask_rule(rule),
                Err(e) => reject(e),
            }
        }

        errors
    }
}

/// 設定レコードの供給元
pub trait ConfigProvider {
    fn load(&self) -> Result<ConfigFile>;
}

/// 既に構築済みの設定
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub ConfigFile);

impl ConfigProvider for StaticConfig {
    fn load(&self) -> Result<ConfigFile> {
        Ok(self.0.clone())
    }
}

/// ホストから渡されたJSONテキストの設定
#[derive(Debug, Clone)]
pub struct JsonConfig {
    text: String,
}

impl JsonConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ConfigProvider for JsonConfig {
    fn load(&self) -> Result<ConfigFile> {
        ConfigFile::from_json(&self.text)
    }
}

/// 既定値に設定を適用したレジストリを構築する
pub fn load_registries(
    provider: &dyn ConfigProvider,
) -> Result<(TypeRegistry, SpecialMemberRegistry, Vec<ConfigError>)> {
    let config = provider.load()?;
    let mut types = TypeRegistry::new();
    let mut special = SpecialMemberRegistry::new();
    let errors = config.apply(&mut types, &mut special);
    Ok((types, special, errors))
}
