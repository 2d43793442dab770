//! pgnode 型レジストリ
//!
//! このクレートは、ノードタグ・型エイリアス・特殊メンバ（可変長配列、
//! List要素型、Bitmapset参照）の宣言的なルールを保持します。
//! 型文字列の操作ユーティリティと設定レコードの検証もここで行います。

pub mod builtin;
pub mod config;
pub mod error;
pub mod special;
pub mod tags;
pub mod type_name;

pub use config::{load_registries, ConfigFile, ConfigProvider, JsonConfig, StaticConfig};
pub use error::ConfigError;
pub use special::{
    ArrayMemberRule, BitmapsetAnchor, BitmapsetReference, BitmaskFlag, BitmaskRule,
    ListElementRule, ListLocation, ListPosition, SpecialMemberRegistry, DEFAULT_LIST_ELEMENT_TYPE,
};
pub use tags::{normalize_tag, TypeRegistry, TAG_PREFIX};

/// レジストリ操作の結果型
pub type Result<T> = anyhow::Result<T>;
