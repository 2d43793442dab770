//! タグごとの式の書式

use super::ExprRenderer;
use crate::Result;

impl<'c, 'a> ExprRenderer<'c, 'a> {
    /// 組み込みの書式で描画する（書式がないタグは `None`）
    pub(crate) async fn format_builtin(&self, tag: &str, e: &str) -> Option<Result<String>> {
        let result = match tag {
            "Var" => self.format_var(e).await,
            "Const" => self.format_const(e).await,
            "Param" => self.format_param(e).await,
            "Aggref" => self.format_aggref(e).await,
            "GroupingFunc" => self.format_call("GROUPING", &self.field(tag, e, "args")).await,
            "WindowFunc" => self.format_window_func(e).await,
            "SubscriptingRef" | "ArrayRef" => self.format_subscript(tag, e).await,
            "FuncExpr" => self.format_func_expr(e).await,
            "NamedArgExpr" => self.format_named_arg(e).await,
            "OpExpr" => self.format_op_expr(tag, e).await,
            "DistinctExpr" => self.format_distinct(e).await,
            "NullIfExpr" => self.format_call("NULLIF", &self.field(tag, e, "args")).await,
            "ScalarArrayOpExpr" => self.format_scalar_array_op(e).await,
            "BoolExpr" => self.format_bool_expr(e).await,
            "SubLink" => self.format_sublink(e).await,
            "SubPlan" => self
                .int(&self.field(tag, e, "plan_id"))
                .await
                .map(|id| format!("(SubPlan {})", id)),
            "AlternativeSubPlan" => self
                .render_list(&self.field(tag, e, "subplans"), " or ")
                .await
                .map(|plans| format!("(alternatives: {})", plans)),
            "FieldSelect" => self.format_field_select(e).await,
            "FieldStore" => self.format_field_store(e).await,
            "RelabelType" => self.format_coercion(tag, e, "relabelformat").await,
            "CoerceViaIO" => self.format_coercion(tag, e, "coerceformat").await,
            "ArrayCoerceExpr" => self.format_coercion(tag, e, "coerceformat").await,
            "ConvertRowtypeExpr" => self.format_coercion(tag, e, "convertformat").await,
            "CoerceToDomain" => self.format_coercion(tag, e, "coercionformat").await,
            "CollateExpr" => self.format_collate(e).await,
            "CaseExpr" => self.format_case(e).await,
            "CaseWhen" => self.format_case_when(e).await,
            "CaseTestExpr" => Ok("CASE_TEST".to_string()),
            "ArrayExpr" => self
                .render_list(&self.field(tag, e, "elements"), ", ")
                .await
                .map(|elements| format!("ARRAY[{}]", elements)),
            "RowExpr" => self.format_call("ROW", &self.field(tag, e, "args")).await,
            "RowCompareExpr" => self.format_row_compare(e).await,
            "CoalesceExpr" => self.format_call("COALESCE", &self.field(tag, e, "args")).await,
            "MinMaxExpr" => self.format_min_max(e).await,
            "SQLValueFunction" => self.format_sql_value_function(e).await,
            "XmlExpr" => self.format_xml(e).await,
            "NullTest" => self.format_test(tag, e, "nulltesttype").await,
            "BooleanTest" => self.format_test(tag, e, "booltesttype").await,
            "CoerceToDomainValue" => Ok("VALUE".to_string()),
            "SetToDefault" => Ok("DEFAULT".to_string()),
            "CurrentOfExpr" => self.format_current_of(e).await,
            "NextValueExpr" => self.format_next_value(e).await,
            "InferenceElem" => self.child(&self.field(tag, e, "expr")).await,
            "TargetEntry" => self.child(&self.field(tag, e, "expr")).await,
            "PlaceHolderVar" => self.child(&self.field(tag, e, "phexpr")).await,
            "RestrictInfo" => self.child(&self.field(tag, e, "clause")).await,
            "EquivalenceMember" => self.child(&self.field(tag, e, "em_expr")).await,
            _ => return None,
        };
        Some(result)
    }

    /// `NAME(args)`
    async fn format_call(&self, name: &str, args: &str) -> Result<String> {
        Ok(format!("{}({})", name, self.render_list(args, ", ").await?))
    }

    async fn format_const(&self, e: &str) -> Result<String> {
        if self.boolean(&self.field("Const", e, "constisnull")).await? {
            return Ok("NULL".to_string());
        }
        self.const_output(e).await
    }

    async fn format_param(&self, e: &str) -> Result<String> {
        Ok(format!("${}", self.int(&self.field("Param", e, "paramid")).await?))
    }

    /// `FILTER (WHERE ...)` 句（なければ空）
    async fn filter_clause(&self, tag: &str, e: &str) -> Result<String> {
        Ok(match self.optional_child(&self.field(tag, e, "aggfilter")).await? {
            Some(filter) => format!(" FILTER (WHERE {})", filter),
            None => String::new(),
        })
    }

    async fn format_aggref(&self, e: &str) -> Result<String> {
        let name = self.function_name(&self.field("Aggref", e, "aggfnoid")).await?;
        let args = if self.boolean(&self.field("Aggref", e, "aggstar")).await? {
            "*".to_string()
        } else {
            self.render_list(&self.field("Aggref", e, "args"), ", ").await?
        };
        let distinct = if self.is_null(&self.field("Aggref", e, "aggdistinct")).await? {
            ""
        } else {
            "DISTINCT "
        };
        let filter = self.filter_clause("Aggref", e).await?;
        Ok(format!("{}({}{}){}", name, distinct, args, filter))
    }

    async fn format_window_func(&self, e: &str) -> Result<String> {
        let name = self.function_name(&self.field("WindowFunc", e, "winfnoid")).await?;
        let args = if self.boolean(&self.field("WindowFunc", e, "winstar")).await? {
            "*".to_string()
        } else {
            self.render_list(&self.field("WindowFunc", e, "args"), ", ").await?
        };
        let filter = self.filter_clause("WindowFunc", e).await?;
        Ok(format!("{}({}){} OVER (...)", name, args, filter))
    }

    async fn format_subscript(&self, tag: &str, e: &str) -> Result<String> {
        let mut text = self.child(&self.field(tag, e, "refexpr")).await?;
        let upper = self.list_items(&self.field(tag, e, "refupperindexpr")).await?;
        let lower = self.list_items(&self.field(tag, e, "reflowerindexpr")).await?;

        for (i, upper) in upper.iter().enumerate() {
            let upper = self.optional_child(upper).await?.unwrap_or_default();
            match lower.get(i) {
                Some(lower) => {
                    let lower = self.optional_child(lower).await?.unwrap_or_default();
                    text.push_str(&format!("[{}:{}]", lower, upper));
                }
                None => text.push_str(&format!("[{}]", upper)),
            }
        }

        if let Some(assign) = self.optional_child(&self.field(tag, e, "refassgnexpr")).await? {
            text = format!("{} := {}", text, assign);
        }
        Ok(text)
    }

    async fn format_func_expr(&self, e: &str) -> Result<String> {
        let args = self.field("FuncExpr", e, "args");
        // 書式が読めない場合は通常の関数呼び出しとして描画する
        let format = self.enumerator(&self.field("FuncExpr", e, "funcformat")).await.ok();
        match format.as_deref() {
            Some("COERCE_IMPLICIT_CAST") => {
                let items = self.list_items(&args).await?;
                match items.first() {
                    Some(first) => self.child(first).await,
                    None => Ok(String::new()),
                }
            }
            Some("COERCE_EXPLICIT_CAST") => {
                let items = self.list_items(&args).await?;
                let arg = match items.first() {
                    Some(first) => self.child(first).await?,
                    None => String::new(),
                };
                let type_name = self.type_name(&self.field("FuncExpr", e, "funcresulttype")).await?;
                Ok(format!("{}::{}", arg, type_name))
            }
            _ => {
                let name = self.function_name(&self.field("FuncExpr", e, "funcid")).await?;
                self.format_call(&name, &args).await
            }
        }
    }

    async fn format_named_arg(&self, e: &str) -> Result<String> {
        let name = self
            .optional_string(&self.field("NamedArgExpr", e, "name"))
            .await?
            .unwrap_or_else(|| "?".to_string());
        let arg = self.child(&self.field("NamedArgExpr", e, "arg")).await?;
        Ok(format!("{} => {}", name, arg))
    }

    /// 演算子の引数を描画する
    async fn operator_args(&self, tag: &str, e: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for arg in self.list_items(&self.field(tag, e, "args")).await? {
            args.push(self.child(&arg).await?);
        }
        Ok(args)
    }

    async fn format_op_expr(&self, tag: &str, e: &str) -> Result<String> {
        let op = self.operator_name(&self.field(tag, e, "opno")).await?;
        let args = self.operator_args(tag, e).await?;
        Ok(match args.as_slice() {
            [left, right, ..] => format!("{} {} {}", left, op, right),
            [operand] => format!("{} {}", op, operand),
            [] => op,
        })
    }

    async fn format_distinct(&self, e: &str) -> Result<String> {
        let args = self.operator_args("DistinctExpr", e).await?;
        Ok(match args.as_slice() {
            [left, right, ..] => format!("{} IS DISTINCT FROM {}", left, right),
            _ => args.join(", "),
        })
    }

    async fn format_scalar_array_op(&self, e: &str) -> Result<String> {
        let op = self.operator_name(&self.field("ScalarArrayOpExpr", e, "opno")).await?;
        let quantifier = if self.boolean(&self.field("ScalarArrayOpExpr", e, "useOr")).await? {
            "ANY"
        } else {
            "ALL"
        };
        let args = self.operator_args("ScalarArrayOpExpr", e).await?;
        Ok(match args.as_slice() {
            [left, right, ..] => format!("{} {} {} ({})", left, op, quantifier, right),
            _ => format!("{} {} ({})", op, quantifier, args.join(", ")),
        })
    }

    async fn format_bool_expr(&self, e: &str) -> Result<String> {
        let op = self.enumerator(&self.field("BoolExpr", e, "boolop")).await?;
        let mut args = Vec::new();
        for arg in self.list_items(&self.field("BoolExpr", e, "args")).await? {
            let (tag, text) = self.child_with_tag(&arg).await?;
            args.push(if tag == "BoolExpr" { format!("({})", text) } else { text });
        }

        Ok(match op.as_str() {
            "NOT_EXPR" => format!("NOT {}", args.join(" ")),
            "OR_EXPR" => args.join(" OR "),
            _ => args.join(" AND "),
        })
    }

    async fn format_sublink(&self, e: &str) -> Result<String> {
        let kind = self.enumerator(&self.field("SubLink", e, "subLinkType")).await?;
        let suffix = match kind.as_str() {
            "EXISTS_SUBLINK" => return Ok("EXISTS(...)".to_string()),
            "ARRAY_SUBLINK" => return Ok("ARRAY(...)".to_string()),
            "ALL_SUBLINK" => "ALL(...)",
            "ANY_SUBLINK" => "ANY(...)",
            "ROWCOMPARE_SUBLINK" => "(...)",
            _ => return Ok("(...)".to_string()),
        };
        Ok(match self.optional_child(&self.field("SubLink", e, "testexpr")).await? {
            Some(test) => format!("{} {}", test, suffix),
            None => suffix.to_string(),
        })
    }

    async fn format_field_select(&self, e: &str) -> Result<String> {
        let arg = self.child(&self.field("FieldSelect", e, "arg")).await?;
        let field = self.int(&self.field("FieldSelect", e, "fieldnum")).await?;
        Ok(format!("({}).#{}", arg, field))
    }

    async fn format_field_store(&self, e: &str) -> Result<String> {
        let arg = self.child(&self.field("FieldStore", e, "arg")).await?;
        let values = self.render_list(&self.field("FieldStore", e, "newvals"), ", ").await?;
        Ok(format!("{} WITH ({})", arg, values))
    }

    /// 型変換は明示的なキャストのときだけ `::type` を付ける
    async fn format_coercion(&self, tag: &str, e: &str, format_field: &str) -> Result<String> {
        let arg = self.child(&self.field(tag, e, "arg")).await?;
        let format = self.enumerator(&self.field(tag, e, format_field)).await.ok();
        if format.as_deref() == Some("COERCE_EXPLICIT_CAST") {
            let type_name = self.type_name(&self.field(tag, e, "resulttype")).await?;
            Ok(format!("{}::{}", arg, type_name))
        } else {
            Ok(arg)
        }
    }

    async fn format_collate(&self, e: &str) -> Result<String> {
        let arg = self.child(&self.field("CollateExpr", e, "arg")).await?;
        let collation = self.collation_name(&self.field("CollateExpr", e, "collOid")).await?;
        Ok(format!("{} COLLATE {}", arg, collation))
    }

    async fn format_case(&self, e: &str) -> Result<String> {
        let mut text = String::from("CASE");
        if let Some(arg) = self.optional_child(&self.field("CaseExpr", e, "arg")).await? {
            text.push(' ');
            text.push_str(&arg);
        }
        for when in self.list_items(&self.field("CaseExpr", e, "args")).await? {
            text.push(' ');
            text.push_str(&self.child(&when).await?);
        }
        if let Some(default) = self.optional_child(&self.field("CaseExpr", e, "defresult")).await? {
            text.push_str(" ELSE ");
            text.push_str(&default);
        }
        text.push_str(" END");
        Ok(text)
    }

    async fn format_case_when(&self, e: &str) -> Result<String> {
        let condition = self.child(&self.field("CaseWhen", e, "expr")).await?;
        let result = self.child(&self.field("CaseWhen", e, "result")).await?;
        Ok(format!("WHEN {} THEN {}", condition, result))
    }

    async fn format_row_compare(&self, e: &str) -> Result<String> {
        let rctype = self.enumerator(&self.field("RowCompareExpr", e, "rctype")).await?;
        let op = match rctype.as_str() {
            "ROWCOMPARE_LT" => "<",
            "ROWCOMPARE_LE" => "<=",
            "ROWCOMPARE_EQ" => "=",
            "ROWCOMPARE_GE" => ">=",
            "ROWCOMPARE_GT" => ">",
            _ => "<>",
        };
        let left = self.render_list(&self.field("RowCompareExpr", e, "largs"), ", ").await?;
        let right = self.render_list(&self.field("RowCompareExpr", e, "rargs"), ", ").await?;
        Ok(format!("({}) {} ({})", left, op, right))
    }

    async fn format_min_max(&self, e: &str) -> Result<String> {
        let op = self.enumerator(&self.field("MinMaxExpr", e, "op")).await?;
        let name = match op.as_str() {
            "IS_GREATEST" => "GREATEST",
            _ => "LEAST",
        };
        self.format_call(name, &self.field("MinMaxExpr", e, "args")).await
    }

    async fn format_sql_value_function(&self, e: &str) -> Result<String> {
        let op = self.enumerator(&self.field("SQLValueFunction", e, "op")).await?;
        let name = op.strip_prefix("SVFOP_").unwrap_or(&op);
        Ok(name.strip_suffix("_N").unwrap_or(name).to_string())
    }

    async fn format_xml(&self, e: &str) -> Result<String> {
        let op = self.enumerator(&self.field("XmlExpr", e, "op")).await?;
        let args = self.render_list(&self.field("XmlExpr", e, "args"), ", ").await?;
        if op == "IS_DOCUMENT" {
            return Ok(format!("{} IS DOCUMENT", args));
        }

        let function = op.strip_prefix("IS_").unwrap_or(&op);
        let mut parts = Vec::new();
        if let Some(name) = self.optional_string(&self.field("XmlExpr", e, "name")).await? {
            parts.push(format!("NAME {}", name));
        }
        let named = self.render_list(&self.field("XmlExpr", e, "named_args"), ", ").await?;
        if !named.is_empty() {
            parts.push(named);
        }
        if !args.is_empty() {
            parts.push(args);
        }
        Ok(format!("{}({})", function, parts.join(", ")))
    }

    /// `arg IS [NOT] NULL` などの述語
    async fn format_test(&self, tag: &str, e: &str, kind_field: &str) -> Result<String> {
        let arg = self.child(&self.field(tag, e, "arg")).await?;
        let kind = self.enumerator(&self.field(tag, e, kind_field)).await?;
        Ok(format!("{} {}", arg, kind.replace('_', " ")))
    }

    async fn format_current_of(&self, e: &str) -> Result<String> {
        match self.optional_string(&self.field("CurrentOfExpr", e, "cursor_name")).await? {
            Some(name) => Ok(format!("CURRENT OF {}", name)),
            None => {
                let param = self.int(&self.field("CurrentOfExpr", e, "cursor_param")).await?;
                Ok(format!("CURRENT OF ${}", param))
            }
        }
    }

    async fn format_next_value(&self, e: &str) -> Result<String> {
        let sequence = self.relation_name(&self.field("NextValueExpr", e, "seqid")).await?;
        Ok(format!("nextval('{}')", sequence))
    }
}
