//! Compiling a wire-shaped [`Expression`] into a predicate over a [`RowCursor`].
//!
//! Every rule resolves its column, target numeric representation, and comparison
//! literal once here; evaluating a compiled expression against a row touches no
//! `serde_json` value and does no further column lookups, only pre-resolved indices.

use crate::bstr::BstrBuf;
use crate::cursor::RowCursor;
use crate::error::{EngineError, Result};
use crate::filter::expr::{Clause, Expression, Mode, Operation, Rule, Value};
use crate::table::Table;
use crate::types::{Number, TypeId};

enum Comparison {
    NumberCmp(Operation, Number),
    NumberIn { values: Vec<Number>, negate: bool },
    BstrCmp(Operation, BstrBuf),
    BstrIn { values: Vec<BstrBuf>, negate: bool },
}

struct CompiledRule {
    column_index: usize,
    comparison: Comparison,
}

impl CompiledRule {
    fn eval(&self, cursor: &RowCursor) -> bool {
        match &self.comparison {
            Comparison::NumberCmp(op, rhs) => {
                let lhs = cursor.number(self.column_index);
                eval_number_cmp(*op, &lhs, rhs)
            }
            Comparison::NumberIn { values, negate } => {
                let lhs = cursor.number(self.column_index);
                let found = values.iter().any(|v| lhs.total_cmp(v) == Some(std::cmp::Ordering::Equal));
                found != *negate
            }
            Comparison::BstrCmp(op, rhs) => {
                let lhs = cursor.bstr(self.column_index);
                eval_bstr_cmp(*op, &lhs, &rhs.as_bstr())
            }
            Comparison::BstrIn { values, negate } => {
                let lhs = cursor.bstr(self.column_index);
                let found = values.iter().any(|v| lhs.equals(&v.as_bstr()));
                found != *negate
            }
        }
    }
}

fn eval_number_cmp(op: Operation, lhs: &Number, rhs: &Number) -> bool {
    let ord = lhs.total_cmp(rhs);
    match op {
        Operation::Equal => ord == Some(std::cmp::Ordering::Equal),
        Operation::NotEqual => ord != Some(std::cmp::Ordering::Equal),
        Operation::GreaterThan => ord == Some(std::cmp::Ordering::Greater),
        Operation::GreaterThanOrEqual => matches!(ord, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)),
        Operation::LessThan => ord == Some(std::cmp::Ordering::Less),
        Operation::LessThanOrEqual => matches!(ord, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)),
        _ => false,
    }
}

fn eval_bstr_cmp(op: Operation, lhs: &crate::bstr::Bstr<'_>, rhs: &crate::bstr::Bstr<'_>) -> bool {
    match op {
        Operation::Equal => lhs.equals(rhs),
        Operation::NotEqual => !lhs.equals(rhs),
        Operation::Contains => lhs.contains(rhs),
        Operation::NotContains => !lhs.contains(rhs),
        Operation::StartsWith => lhs.starts_with(rhs),
        Operation::EndsWith => lhs.ends_with(rhs),
        _ => false,
    }
}

/// A compiled, ready-to-evaluate expression plus the column set a [`RowCursor`] must be
/// bound against (in order) to evaluate it.
pub struct CompiledExpression {
    mode: Mode,
    clauses: Vec<Vec<CompiledRule>>,
    columns: Vec<String>,
}

impl CompiledExpression {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Evaluates the compiled expression against `cursor`'s current row. `cursor` must
    /// have been bound with exactly [`CompiledExpression::columns`], in that order.
    pub fn eval(&self, cursor: &RowCursor) -> bool {
        if self.clauses.is_empty() {
            return true;
        }
        match self.mode {
            Mode::Dnf => self.clauses.iter().any(|clause| clause.iter().all(|r| r.eval(cursor))),
            Mode::Cnf => self.clauses.iter().all(|clause| clause.iter().any(|r| r.eval(cursor))),
        }
    }
}

fn unsupported(op: Operation, ty: TypeId) -> EngineError {
    EngineError::unsupported_operation(&format!("{op:?}"), ty)
}

fn compile_numeric_rule(ty: TypeId, rule: &Rule, column_index: usize) -> Result<CompiledRule> {
    let comparison = match rule.operation {
        Operation::In | Operation::NotIn => {
            let negate = rule.operation == Operation::NotIn;
            let values = rule
                .value
                .as_list()
                .into_iter()
                .map(|v| {
                    v.as_f64()
                        .and_then(|f| Number::from_f64(ty, f))
                        .ok_or_else(|| EngineError::schema_mismatch(format!("non-numeric value for column of type {ty}")))
                })
                .collect::<Result<Vec<_>>>()?;
            Comparison::NumberIn { values, negate }
        }
        Operation::Contains | Operation::NotContains | Operation::StartsWith | Operation::EndsWith => {
            return Err(unsupported(rule.operation, ty));
        }
        op => {
            let value = rule
                .value
                .as_f64()
                .and_then(|f| Number::from_f64(ty, f))
                .ok_or_else(|| EngineError::schema_mismatch(format!("non-numeric value for column of type {ty}")))?;
            Comparison::NumberCmp(op, value)
        }
    };
    Ok(CompiledRule { column_index, comparison })
}

fn compile_bstr_rule(rule: &Rule, column_index: usize) -> Result<CompiledRule> {
    let comparison = match rule.operation {
        Operation::In | Operation::NotIn => {
            let negate = rule.operation == Operation::NotIn;
            let values = rule
                .value
                .as_list()
                .into_iter()
                .map(|v| {
                    v.as_text()
                        .map(BstrBuf::from_str)
                        .ok_or_else(|| EngineError::schema_mismatch("non-string value for a BSTR column".to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            Comparison::BstrIn { values, negate }
        }
        Operation::GreaterThan | Operation::GreaterThanOrEqual | Operation::LessThan | Operation::LessThanOrEqual => {
            return Err(unsupported(rule.operation, TypeId::Bstr));
        }
        op => {
            let text = rule
                .value
                .as_text()
                .ok_or_else(|| EngineError::schema_mismatch("non-string value for a BSTR column".to_string()))?;
            Comparison::BstrCmp(op, BstrBuf::from_str(text))
        }
    };
    Ok(CompiledRule { column_index, comparison })
}

/// Compiles `expression` against `table`'s schema. Resolves every column reference,
/// validates every operation against its column's type, and pre-converts every
/// comparison value — so a malformed expression never reaches a worker thread.
pub fn compile_expression(table: &Table, expression: &Expression, mode: Mode) -> Result<CompiledExpression> {
    let mut columns: Vec<String> = Vec::new();
    let mut clauses = Vec::with_capacity(expression.len());
    for clause in expression {
        clauses.push(compile_clause(table, clause, &mut columns)?);
    }
    Ok(CompiledExpression { mode, clauses, columns })
}

fn column_index_of(name: &str, columns: &mut Vec<String>) -> usize {
    if let Some(idx) = columns.iter().position(|c| c == name) {
        idx
    } else {
        columns.push(name.to_string());
        columns.len() - 1
    }
}

fn compile_clause(table: &Table, clause: &Clause, columns: &mut Vec<String>) -> Result<Vec<CompiledRule>> {
    let mut compiled = Vec::with_capacity(clause.len());
    for rule in clause {
        let layout = table
            .column(&rule.field)
            .ok_or_else(|| EngineError::unknown_column(&rule.field))?;
        let column_index = column_index_of(&rule.field, columns);
        let compiled_rule = if layout.ty == TypeId::Bstr {
            compile_bstr_rule(rule, column_index)?
        } else {
            compile_numeric_rule(layout.ty, rule, column_index)?
        };
        compiled.push(compiled_rule);
    }
    Ok(compiled)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cursor::RowCursor;
    use crate::table::{ColumnSpec, Layout};

    fn make_table() -> Table {
        let heap = crate::heap::Heap::new(256 * 1024).unwrap();
        let table = Table::create(
            &heap,
            vec![
                ColumnSpec::bstr("origin", 4),
                ColumnSpec::numeric("passengers", TypeId::U32).unwrap(),
            ],
            8192,
            Layout::RowMajor,
        )
        .unwrap();
        table.add_rows(2).unwrap();
        unsafe {
            let origin = table.column("origin").unwrap().clone();
            let passengers = table.column("passengers").unwrap().clone();
            crate::bstr::write_field_checked(table.field_mut(&origin, 0), b"SEA").unwrap();
            table.field_mut(&passengers, 0).copy_from_slice(&100u32.to_le_bytes());
            crate::bstr::write_field_checked(table.field_mut(&origin, 1), b"PDX").unwrap();
            table.field_mut(&passengers, 1).copy_from_slice(&5u32.to_le_bytes());
        }
        table
    }

    #[test]
    fn dnf_matches_rows_satisfying_any_clause() {
        let table = make_table();
        let expr: Expression = serde_json::from_str(
            r#"[[{"field":"origin","operation":"EQUAL","value":"SEA"}]]"#,
        )
        .unwrap();
        let compiled = compile_expression(&table, &expr, Mode::Dnf).unwrap();
        let mut cursor = RowCursor::new(&table, &compiled.columns().iter().map(|s| s.as_str()).collect::<Vec<_>>()).unwrap();
        let mut matches = Vec::new();
        loop {
            matches.push(compiled.eval(&cursor));
            if !cursor.advance() {
                break;
            }
        }
        assert_eq!(matches, vec![true, false]);
    }

    #[test]
    fn cnf_requires_every_clause_to_have_a_satisfied_rule() {
        let table = make_table();
        let expr: Expression = serde_json::from_str(
            r#"[[{"field":"passengers","operation":"GREATER_THAN","value":10}]]"#,
        )
        .unwrap();
        let compiled = compile_expression(&table, &expr, Mode::Cnf).unwrap();
        let mut cursor = RowCursor::new(&table, &compiled.columns().iter().map(|s| s.as_str()).collect::<Vec<_>>()).unwrap();
        assert!(compiled.eval(&cursor));
        cursor.advance();
        assert!(!compiled.eval(&cursor));
    }

    #[test]
    fn unknown_column_is_rejected_at_compile_time() {
        let table = make_table();
        let expr: Expression =
            serde_json::from_str(r#"[[{"field":"nope","operation":"EQUAL","value":"x"}]]"#).unwrap();
        assert!(compile_expression(&table, &expr, Mode::Dnf).is_err());
    }

    #[test]
    fn numeric_comparison_rejected_on_bstr_column() {
        let table = make_table();
        let expr: Expression =
            serde_json::from_str(r#"[[{"field":"origin","operation":"GREATER_THAN","value":1}]]"#).unwrap();
        assert!(compile_expression(&table, &expr, Mode::Dnf).is_err());
    }
}
