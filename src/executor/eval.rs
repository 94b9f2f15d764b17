//! Expression evaluation
//!
//! Evaluates AST expressions against a row. Predicates use three-valued
//! logic: a comparison involving NULL yields NULL (unknown), and AND/OR/NOT
//! follow Kleene's rules. Only a `true` predicate keeps a row.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::sql::ast::{BinaryOperator, ColumnRef, Expr, Literal, UnaryOperator};
use crate::storage::{Table, Value};

/// Scalar functions understood by the evaluator, with their argument counts
/// (`None` means one or more)
const SCALAR_FUNCTIONS: [(&str, Option<usize>); 7] = [
    ("UPPER", Some(1)),
    ("LOWER", Some(1)),
    ("LENGTH", Some(1)),
    ("LEN", Some(1)),
    ("TRIM", Some(1)),
    ("ABS", Some(1)),
    ("COALESCE", None),
];

/// Check that a scalar function exists and takes `args` arguments
pub fn check_scalar_function(name: &str, args: usize) -> Result<()> {
    let arity = SCALAR_FUNCTIONS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, arity)| *arity)
        .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;

    match arity {
        Some(expected) if expected != args => Err(Error::ArityMismatch {
            expected,
            found: args,
        }),
        None if args == 0 => Err(Error::ArityMismatch {
            expected: 1,
            found: 0,
        }),
        _ => Ok(()),
    }
}

/// The columns visible to an expression: one table's, or none at all
#[derive(Debug, Clone, Default)]
pub struct Scope {
    table: Option<String>,
    alias: Option<String>,
    columns: Vec<String>,
}

impl Scope {
    /// A scope with no columns (SELECT without FROM, VALUES rows)
    pub fn empty() -> Self {
        Self::default()
    }

    /// The columns of a table, optionally reachable through an alias
    pub fn for_table(table: &Table, alias: Option<&str>) -> Self {
        Self {
            table: Some(table.name().to_string()),
            alias: alias.map(str::to_string),
            columns: table.schema().column_names(),
        }
    }

    /// Column names in row order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Resolve a column reference to its row index
    pub fn resolve(&self, col: &ColumnRef) -> Result<usize> {
        let table = self.table.as_deref().unwrap_or("");
        let unknown = || {
            let name = match &col.table {
                Some(qualifier) => format!("{}.{}", qualifier, col.column),
                None => col.column.clone(),
            };
            Error::UnknownColumn(name, table.to_string())
        };

        if let Some(qualifier) = &col.table {
            let matches_table = qualifier.eq_ignore_ascii_case(table);
            let matches_alias = self
                .alias
                .as_deref()
                .is_some_and(|alias| qualifier.eq_ignore_ascii_case(alias));
            if !matches_table && !matches_alias {
                return Err(unknown());
            }
        }

        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&col.column))
            .ok_or_else(unknown)
    }

    /// Whether two expressions denote the same value, treating column
    /// references that resolve to the same column as equal
    pub fn same_expr(&self, a: &Expr, b: &Expr) -> bool {
        match (a, b) {
            (Expr::Column(x), Expr::Column(y)) => {
                matches!((self.resolve(x), self.resolve(y)), (Ok(i), Ok(j)) if i == j)
            }
            (Expr::Nested(x), y) | (y, Expr::Nested(x)) => self.same_expr(x, y),
            _ => a == b,
        }
    }
}

/// Evaluates expressions within a scope.
///
/// In grouped queries the evaluator also carries the partition's aggregate
/// results; an aggregate call is looked up there instead of evaluated.
pub struct Evaluator<'a> {
    scope: &'a Scope,
    aggregates: &'a [(Expr, Value)],
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator for rows of the given scope
    pub fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            aggregates: &[],
        }
    }

    /// Attach computed aggregate values
    pub fn with_aggregates(mut self, aggregates: &'a [(Expr, Value)]) -> Self {
        self.aggregates = aggregates;
        self
    }

    /// Evaluate a predicate; only `true` matches, NULL (unknown) does not
    pub fn matches(&self, predicate: &Expr, row: &[Value]) -> Result<bool> {
        match self.eval(predicate, row)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::type_mismatch("BOOLEAN", other.type_name())),
        }
    }

    /// Evaluate an expression against a row
    pub fn eval(&self, expr: &Expr, row: &[Value]) -> Result<Value> {
        if expr.is_aggregate() {
            return self
                .aggregates
                .iter()
                .find(|(agg, _)| self.scope.same_expr(agg, expr))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    Error::InvalidProjection(format!("aggregate {} is not allowed here", expr))
                });
        }

        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),

            Expr::Column(col) => {
                let idx = self.scope.resolve(col)?;
                row.get(idx).cloned().ok_or_else(|| {
                    Error::ExecutionError(format!("column index {} out of bounds", idx))
                })
            }

            Expr::Wildcard => Err(Error::ExecutionError(
                "'*' is only valid in COUNT(*)".to_string(),
            )),

            Expr::BinaryOp { left, op, right } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                binary_op(&left, *op, &right)
            }

            Expr::UnaryOp { op, expr } => {
                let value = self.eval(expr, row)?;
                unary_op(*op, value)
            }

            Expr::IsNull(inner) => Ok(Value::Boolean(self.eval(inner, row)?.is_null())),

            Expr::IsNotNull(inner) => Ok(Value::Boolean(!self.eval(inner, row)?.is_null())),

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = self.eval(expr, row)?;
                let low = self.eval(low, row)?;
                let high = self.eval(high, row)?;
                let above = binary_op(&value, BinaryOperator::Gte, &low)?;
                let below = binary_op(&value, BinaryOperator::Lte, &high)?;
                let result = binary_op(&above, BinaryOperator::And, &below)?;
                negate_if(result, *negated)
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let value = self.eval(expr, row)?;
                let mut result = Value::Boolean(false);
                for item in list {
                    let item = self.eval(item, row)?;
                    let equal = binary_op(&value, BinaryOperator::Eq, &item)?;
                    result = binary_op(&result, BinaryOperator::Or, &equal)?;
                    if result == Value::Boolean(true) {
                        break;
                    }
                }
                negate_if(result, *negated)
            }

            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let value = self.eval(expr, row)?;
                let pattern = self.eval(pattern, row)?;
                let result = match (&value, &pattern) {
                    (Value::Null, _) | (_, Value::Null) => Value::Null,
                    (_, Value::Text(p)) => Value::Boolean(like(&value.to_string(), p)),
                    (_, other) => return Err(Error::type_mismatch("TEXT", other.type_name())),
                };
                negate_if(result, *negated)
            }

            Expr::Function { name, args, .. } => {
                check_scalar_function(name, args.len())?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, row))
                    .collect::<Result<Vec<_>>>()?;
                scalar_function(name, args)
            }

            Expr::Nested(inner) => self.eval(inner, row),
        }
    }
}

/// Evaluate an expression that may not reference any column
pub fn eval_const(expr: &Expr) -> Result<Value> {
    Evaluator::new(&Scope::empty()).eval(expr, &[])
}

/// Convert a literal to a value
pub fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::Text(s.clone()),
        Literal::Date(d) => Value::Date(*d),
    }
}

/// Apply a binary operator
pub fn binary_op(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    match op {
        BinaryOperator::Eq => compare(left, right, |o| o == Ordering::Equal),
        BinaryOperator::Neq => compare(left, right, |o| o != Ordering::Equal),
        BinaryOperator::Lt => compare(left, right, |o| o == Ordering::Less),
        BinaryOperator::Gt => compare(left, right, |o| o == Ordering::Greater),
        BinaryOperator::Lte => compare(left, right, |o| o != Ordering::Greater),
        BinaryOperator::Gte => compare(left, right, |o| o != Ordering::Less),

        BinaryOperator::And => match (truth(left)?, truth(right)?) {
            (Some(false), _) | (_, Some(false)) => Ok(Value::Boolean(false)),
            (Some(true), Some(true)) => Ok(Value::Boolean(true)),
            _ => Ok(Value::Null),
        },
        BinaryOperator::Or => match (truth(left)?, truth(right)?) {
            (Some(true), _) | (_, Some(true)) => Ok(Value::Boolean(true)),
            (Some(false), Some(false)) => Ok(Value::Boolean(false)),
            _ => Ok(Value::Null),
        },

        BinaryOperator::Add => left.checked_add(right),
        BinaryOperator::Sub => left.checked_sub(right),
        BinaryOperator::Mul => left.checked_mul(right),
        BinaryOperator::Div => left.checked_div(right),
        BinaryOperator::Mod => left.checked_rem(right),

        BinaryOperator::Concat => match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            _ => Ok(Value::Text(format!("{}{}", left, right))),
        },
    }
}

fn compare(left: &Value, right: &Value, test: impl Fn(Ordering) -> bool) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    left.compare(right)
        .map(|ordering| Value::Boolean(test(ordering)))
        .ok_or_else(|| Error::type_mismatch(left.type_name(), right.type_name()))
}

/// Boolean truth of a predicate operand: `None` is unknown
fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(Error::type_mismatch("BOOLEAN", other.type_name())),
    }
}

fn negate_if(value: Value, negated: bool) -> Result<Value> {
    if negated {
        unary_op(UnaryOperator::Not, value)
    } else {
        Ok(value)
    }
}

/// Apply a unary operator
pub fn unary_op(op: UnaryOperator, value: Value) -> Result<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Minus, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::ExecutionError(format!("integer overflow in -{}", i))),
        (UnaryOperator::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOperator::Plus, value @ (Value::Integer(_) | Value::Float(_))) => Ok(value),
        (UnaryOperator::Not, other) => Err(Error::type_mismatch("BOOLEAN", other.type_name())),
        (_, other) => Err(Error::type_mismatch("numeric", other.type_name())),
    }
}

fn scalar_function(name: &str, args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    if name == "COALESCE" {
        return Ok(args.find(|v| !v.is_null()).unwrap_or(Value::Null));
    }

    let arg = args.next().unwrap_or(Value::Null);
    match (name, arg) {
        (_, Value::Null) => Ok(Value::Null),
        ("UPPER", Value::Text(s)) => Ok(Value::Text(s.to_uppercase())),
        ("LOWER", Value::Text(s)) => Ok(Value::Text(s.to_lowercase())),
        ("TRIM", Value::Text(s)) => Ok(Value::Text(s.trim().to_string())),
        ("LENGTH" | "LEN", Value::Text(s)) => Ok(Value::Integer(s.chars().count() as i64)),
        ("ABS", Value::Integer(i)) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| Error::ExecutionError(format!("integer overflow in ABS({})", i))),
        ("ABS", Value::Float(f)) => Ok(Value::Float(f.abs())),
        ("ABS", other) => Err(Error::type_mismatch("numeric", other.type_name())),
        (_, other) => Err(Error::type_mismatch("TEXT", other.type_name())),
    }
}

/// SQL LIKE matching: `%` matches any run of characters, `_` exactly one
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matched[j]: text[..i] matches pattern[..j]
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '%';
    }

    for c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matched[j],
                '_' => matched[j - 1],
                p => matched[j - 1] && p == *c,
            };
        }
        matched = next;
    }

    matched[pattern.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;
    use crate::sql::ast::{SelectItem, Statement};

    /// Parse the single projected expression of `SELECT <expr>`
    fn expr(sql: &str) -> Expr {
        match Parser::new(&format!("SELECT {}", sql)).unwrap().parse().unwrap() {
            Statement::Select(mut s) => match s.columns.remove(0) {
                SelectItem::Expr { expr, .. } => expr,
                SelectItem::Wildcard => panic!("unexpected wildcard"),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    fn eval(sql: &str) -> Result<Value> {
        eval_const(&expr(sql))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Integer(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Integer(9));
        assert_eq!(eval("7 / 2").unwrap(), Value::Integer(3));
        assert_eq!(eval("7 % 4").unwrap(), Value::Integer(3));
        assert_eq!(eval("-5 + 2").unwrap(), Value::Integer(-3));
        assert_eq!(eval("NULL + 1").unwrap(), Value::Null);
        assert!(matches!(eval("1 / 0"), Err(Error::DivisionByZero)));
        assert!(matches!(eval("'a' + 1"), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("NULL = NULL").unwrap(), Value::Null);
        assert_eq!(eval("NULL <> 1").unwrap(), Value::Null);
        assert_eq!(eval("NULL AND FALSE").unwrap(), Value::Boolean(false));
        assert_eq!(eval("NULL AND TRUE").unwrap(), Value::Null);
        assert_eq!(eval("NULL OR TRUE").unwrap(), Value::Boolean(true));
        assert_eq!(eval("NULL OR FALSE").unwrap(), Value::Null);
        assert_eq!(eval("NOT NULL").unwrap(), Value::Null);
        assert_eq!(eval("NOT (1 = 2)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("NULL IS NULL").unwrap(), Value::Boolean(true));
        assert_eq!(eval("1 IS NOT NULL").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_in_and_between() {
        assert_eq!(eval("2 IN (1, 2, 3)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("5 IN (1, 2)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("5 IN (1, NULL)").unwrap(), Value::Null);
        assert_eq!(eval("5 NOT IN (1, NULL)").unwrap(), Value::Null);
        assert_eq!(eval("1 NOT IN (2, 3)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("NULL IN (1)").unwrap(), Value::Null);

        assert_eq!(eval("5 BETWEEN 1 AND 10").unwrap(), Value::Boolean(true));
        assert_eq!(eval("5 BETWEEN 6 AND 10").unwrap(), Value::Boolean(false));
        assert_eq!(eval("5 NOT BETWEEN 6 AND 10").unwrap(), Value::Boolean(true));
        assert_eq!(eval("5 BETWEEN NULL AND 10").unwrap(), Value::Null);
        assert_eq!(eval("50 BETWEEN NULL AND 10").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("'abc' < 'abd'").unwrap(), Value::Boolean(true));
        assert_eq!(eval("2 >= 2.0").unwrap(), Value::Boolean(true));
        assert_eq!(
            eval("DATE '2021-04-05' > '2021-01-11'").unwrap(),
            Value::Boolean(true)
        );
        assert!(matches!(eval("1 = 'one'"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(
            eval("DATE '2021-04-05' = 'soon'"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_like() {
        assert!(like("Maria", "M%"));
        assert!(like("Maria", "%r%"));
        assert!(like("Maria", "_a%"));
        assert!(like("Maria", "Maria"));
        assert!(like("", "%"));
        assert!(!like("Maria", "M_"));
        assert!(!like("Peter", "%r_"));
        assert!(like("Martin", "%r__n"));

        assert_eq!(eval("'John' LIKE 'J%'").unwrap(), Value::Boolean(true));
        assert_eq!(eval("'John' NOT LIKE 'J%'").unwrap(), Value::Boolean(false));
        assert_eq!(eval("NULL LIKE 'J%'").unwrap(), Value::Null);
    }

    #[test]
    fn test_scalar_functions() {
        assert_eq!(eval("UPPER('maria')").unwrap(), Value::from("MARIA"));
        assert_eq!(eval("lower('USA')").unwrap(), Value::from("usa"));
        assert_eq!(eval("LENGTH('Georg')").unwrap(), Value::Integer(5));
        assert_eq!(eval("TRIM('  x ')").unwrap(), Value::from("x"));
        assert_eq!(eval("ABS(-4)").unwrap(), Value::Integer(4));
        assert_eq!(eval("COALESCE(NULL, 'n/a')").unwrap(), Value::from("n/a"));
        assert_eq!(eval("UPPER(NULL)").unwrap(), Value::Null);
        assert_eq!(eval("'a' || 'b' || 1").unwrap(), Value::from("ab1"));
        assert_eq!(eval("'a' || NULL").unwrap(), Value::Null);

        assert!(matches!(eval("SOUNDEX('x')"), Err(Error::UnknownFunction(_))));
        assert!(matches!(
            eval("UPPER('a', 'b')"),
            Err(Error::ArityMismatch { .. })
        ));
        assert!(matches!(eval("UPPER(1)"), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_aggregates_need_a_group() {
        assert!(matches!(
            eval("COUNT(*)"),
            Err(Error::InvalidProjection(_))
        ));
    }

    #[test]
    fn test_scope_resolution() {
        use crate::catalog::Catalog;

        let catalog = Catalog::with_examples().unwrap();
        let customers = catalog.get_table("customers").unwrap();
        let scope = Scope::for_table(customers, Some("c"));

        let col = |table: Option<&str>, column: &str| ColumnRef {
            table: table.map(str::to_string),
            column: column.to_string(),
        };
        assert_eq!(scope.resolve(&col(None, "score")).unwrap(), 3);
        assert_eq!(scope.resolve(&col(None, "SCORE")).unwrap(), 3);
        assert_eq!(scope.resolve(&col(Some("c"), "country")).unwrap(), 2);
        assert_eq!(scope.resolve(&col(Some("customers"), "id")).unwrap(), 0);
        assert!(matches!(
            scope.resolve(&col(Some("o"), "id")),
            Err(Error::UnknownColumn(_, _))
        ));
        assert!(matches!(
            scope.resolve(&col(None, "sales")),
            Err(Error::UnknownColumn(_, _))
        ));

        let row = customers.rows()[1].values();
        let evaluator = Evaluator::new(&scope);
        assert_eq!(
            evaluator.eval(&expr("first_name || ' ' || country"), row).unwrap(),
            Value::from("John USA")
        );
        assert!(evaluator.matches(&expr("score > 500 AND c.country = 'USA'"), row).unwrap());
    }
}
