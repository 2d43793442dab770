//! 列参照（`Var`）の解決
//!
//! `varno` でレンジテーブルのエントリを選び、`varattno` から列名を引く。

use super::ExprRenderer;
use crate::error::EvalError;
use crate::value_node::string_value;
use crate::Result;
use tracing::debug;

/// 特殊な `varno` の表示名
///
/// 新旧どちらの番号付けも受け付ける。
pub fn sentinel_label(varno: i64) -> Option<&'static str> {
    match varno {
        65000 | -1 => Some("INNER"),
        65001 | -2 => Some("OUTER"),
        65002 | -3 => Some("INDEX"),
        _ => None,
    }
}

/// システム列の名前
fn system_column_name(attno: i64) -> Option<&'static str> {
    match attno {
        0 => Some("*"),
        -1 => Some("ctid"),
        -2 => Some("xmin"),
        -3 => Some("cmin"),
        -4 => Some("xmax"),
        -5 => Some("cmax"),
        -6 => Some("tableoid"),
        _ => None,
    }
}

impl<'c, 'a> ExprRenderer<'c, 'a> {
    /// `relname.colname` の形で列参照を描画する
    pub(crate) async fn format_var(&self, e: &str) -> Result<String> {
        let varno = self.int(&self.field("Var", e, "varno")).await?;
        if let Some(label) = sentinel_label(varno) {
            return Ok(format!("{}.?", label));
        }
        let attno = self.int(&self.field("Var", e, "varattno")).await?;

        let rtable = self
            .rtable
            .as_deref()
            .ok_or_else(|| EvalError::Unavailable("range table".to_string()))?;
        let entries = self.list_items(rtable).await?;
        let entry = usize::try_from(varno - 1)
            .ok()
            .and_then(|index| entries.get(index))
            .ok_or_else(|| EvalError::Unavailable(format!("range table entry {}", varno)))?;

        let rte = format!("((RangeTblEntry *)({}))", entry);
        let relation = self
            .ctx
            .evaluate_string(&format!("({})->eref->aliasname", rte), self.frame)
            .await?;
        let column = self.attribute_name(&rte, attno).await?;
        Ok(format!("{}.{}", relation, column))
    }

    /// 列名を引く
    ///
    /// `eref->colnames`、`get_rte_attribute_name`、システム列の順に試す。
    pub(crate) async fn attribute_name(&self, rte: &str, attno: i64) -> Result<String> {
        if attno > 0 {
            match self.column_from_colnames(rte, attno).await {
                Ok(Some(name)) => return Ok(name),
                Ok(None) => {}
                Err(e) => debug!("colnames lookup for attno {} failed: {}", attno, e),
            }
        }

        let call = format!("get_rte_attribute_name({}, {})", rte, attno);
        match self.ctx.evaluate_string(&call, self.frame).await {
            Ok(name) => return Ok(name),
            Err(e) => debug!("get_rte_attribute_name for attno {} failed: {}", attno, e),
        }

        Ok(system_column_name(attno).unwrap_or("???").to_string())
    }

    async fn column_from_colnames(&self, rte: &str, attno: i64) -> Result<Option<String>> {
        let names = self.list_items(&format!("({})->eref->colnames", rte)).await?;
        match names.get((attno - 1) as usize) {
            Some(item) => string_value(self.ctx, item, self.frame).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(sentinel_label(65000), Some("INNER"));
        assert_eq!(sentinel_label(-2), Some("OUTER"));
        assert_eq!(sentinel_label(65002), Some("INDEX"));
        assert_eq!(sentinel_label(1), None);
    }

    #[test]
    fn test_system_columns() {
        assert_eq!(system_column_name(-1), Some("ctid"));
        assert_eq!(system_column_name(-6), Some("tableoid"));
        assert_eq!(system_column_name(-7), None);
    }
}
