//! デバッグセッションに設定されているブレークポイント

/// UI側で設定されたブレークポイント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Breakpoint {
    /// ソースファイルの行に設定されたブレークポイント
    Source {
        path: String,
        line: u32,
        enabled: bool,
    },
    /// 関数名に設定されたブレークポイント
    Function { name: String, enabled: bool },
}

impl Breakpoint {
    /// ブレークポイントが有効かどうか
    pub fn is_enabled(&self) -> bool {
        match self {
            Breakpoint::Source { enabled, .. } | Breakpoint::Function { enabled, .. } => *enabled,
        }
    }

    /// ソースファイル名（パスの最後の要素）が一致するか
    pub fn is_in_file(&self, file_name: &str) -> bool {
        match self {
            Breakpoint::Source { path, .. } => {
                let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
                base == file_name
            }
            Breakpoint::Function { .. } => false,
        }
    }

    /// 関数名が一致するか
    pub fn is_on_function(&self, function: &str) -> bool {
        match self {
            Breakpoint::Function { name, .. } => name == function,
            Breakpoint::Source { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_breakpoint_file_match() {
        let bp = Breakpoint::Source {
            path: "/src/backend/nodes/bitmapset.c".to_string(),
            line: 10,
            enabled: true,
        };
        assert!(bp.is_in_file("bitmapset.c"));
        assert!(!bp.is_in_file("list.c"));
        assert!(!bp.is_on_function("bms_next_member"));
    }

    #[test]
    fn test_function_breakpoint_match() {
        let bp = Breakpoint::Function {
            name: "bms_next_member".to_string(),
            enabled: false,
        };
        assert!(bp.is_on_function("bms_next_member"));
        assert!(!bp.is_enabled());
    }
}
