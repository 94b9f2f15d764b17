//! Query Planner for PrimerDB
//!
//! This module converts parsed SQL AST into executable plans. Planning is
//! where names are resolved against the catalog and where grouped queries are
//! validated: a column outside an aggregate must be a GROUP BY key.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::sql::ast::*;

use super::eval::{check_scalar_function, Scope};

/// Logical plan node
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Run a query
    Select(SelectPlan),
    /// Insert into table
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        source: InsertRows,
    },
    /// Update table
    Update {
        table_name: String,
        assignments: Vec<Assignment>,
        predicate: Option<Expr>,
    },
    /// Delete from table
    Delete {
        table_name: String,
        predicate: Option<Expr>,
    },
    /// Remove every row of a table
    Truncate { table_name: String },
    /// Create table
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDef>,
        primary_key: Vec<String>,
        if_not_exists: bool,
    },
    /// Add or drop a column
    AlterTable {
        table_name: String,
        operation: AlterTableOperation,
    },
    /// Drop table
    DropTable { table_name: String, if_exists: bool },
}

/// Where an INSERT takes its rows from
#[derive(Debug, Clone)]
pub enum InsertRows {
    /// Literal rows of expressions
    Values(Vec<Vec<Expr>>),
    /// The result of a query
    Query(Box<SelectPlan>),
}

/// A validated SELECT, executed as scan, filter, group, having, project,
/// distinct, sort, offset and limit
#[derive(Debug, Clone)]
pub struct SelectPlan {
    /// Source table, or none for a single empty row
    pub table: Option<String>,
    /// Columns visible to expressions
    pub scope: Scope,
    /// WHERE predicate
    pub filter: Option<Expr>,
    /// Whether rows are aggregated into partitions
    pub grouped: bool,
    /// GROUP BY keys
    pub group_by: Vec<Expr>,
    /// Distinct aggregate calls used by the projection, HAVING or ORDER BY
    pub aggregates: Vec<Expr>,
    /// HAVING predicate
    pub having: Option<Expr>,
    /// Output expressions, `*` already expanded
    pub projection: Vec<Expr>,
    /// Output column labels
    pub labels: Vec<String>,
    /// SELECT DISTINCT
    pub distinct: bool,
    /// ORDER BY keys
    pub order_by: Vec<SortItem>,
    /// LIMIT or TOP
    pub limit: Option<Expr>,
    /// OFFSET
    pub offset: Option<Expr>,
}

/// An ORDER BY key
#[derive(Debug, Clone)]
pub struct SortItem {
    pub key: SortKey,
    pub asc: bool,
}

/// What an ORDER BY key sorts on
#[derive(Debug, Clone)]
pub enum SortKey {
    /// An output column, matched by label or alias
    Output(usize),
    /// An expression over the source row (or partition)
    Expr(Expr),
}

/// Query planner
pub struct Planner<'a> {
    catalog: &'a Catalog,
}

impl<'a> Planner<'a> {
    /// Create a new planner
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Plan a statement
    pub fn plan(&self, stmt: Statement) -> Result<LogicalPlan> {
        match stmt {
            Statement::Select(select) => self.plan_select(select).map(LogicalPlan::Select),
            Statement::Insert(insert) => self.plan_insert(insert),
            Statement::Update(update) => self.plan_update(update),
            Statement::Delete(delete) => {
                self.check_row_exprs(&delete.table_name, delete.where_clause.iter())?;
                Ok(LogicalPlan::Delete {
                    table_name: delete.table_name,
                    predicate: delete.where_clause,
                })
            }
            Statement::Truncate(table_name) => Ok(LogicalPlan::Truncate { table_name }),
            Statement::CreateTable(create) => self.plan_create_table(create),
            Statement::AlterTable(alter) => Ok(LogicalPlan::AlterTable {
                table_name: alter.table_name,
                operation: alter.operation,
            }),
            Statement::DropTable(drop) => Ok(LogicalPlan::DropTable {
                table_name: drop.table_name,
                if_exists: drop.if_exists,
            }),
        }
    }

    fn plan_insert(&self, insert: InsertStatement) -> Result<LogicalPlan> {
        let source = match insert.source {
            InsertSource::Values(rows) => InsertRows::Values(rows),
            InsertSource::Select(query) => InsertRows::Query(Box::new(self.plan_select(*query)?)),
        };
        Ok(LogicalPlan::Insert {
            table_name: insert.table_name,
            columns: insert.columns,
            source,
        })
    }

    fn plan_update(&self, update: UpdateStatement) -> Result<LogicalPlan> {
        let table = self.catalog.get_table(&update.table_name)?;
        for assignment in &update.assignments {
            if !table.schema().has_column(&assignment.column) {
                return Err(Error::UnknownColumn(
                    assignment.column.clone(),
                    table.name().to_string(),
                ));
            }
        }

        let exprs = update
            .assignments
            .iter()
            .map(|a| &a.value)
            .chain(&update.where_clause);
        self.check_row_exprs(&update.table_name, exprs)?;

        Ok(LogicalPlan::Update {
            table_name: update.table_name,
            assignments: update.assignments,
            predicate: update.where_clause,
        })
    }

    /// Validate expressions evaluated once per row of a table
    fn check_row_exprs<'e>(
        &self,
        table_name: &str,
        exprs: impl Iterator<Item = &'e Expr>,
    ) -> Result<()> {
        let scope = Scope::for_table(self.catalog.get_table(table_name)?, None);
        for expr in exprs {
            self.check_expr(&scope, expr)?;
            if expr.contains_aggregate() {
                return Err(Error::InvalidProjection(format!(
                    "aggregate functions are not allowed here: {}",
                    expr
                )));
            }
        }
        Ok(())
    }

    fn plan_create_table(&self, create: CreateTableStatement) -> Result<LogicalPlan> {
        let mut primary_key: Vec<String> = create
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();

        for TableConstraint::PrimaryKey { columns, .. } in create.constraints {
            if !primary_key.is_empty() {
                return Err(Error::ConstraintViolation(format!(
                    "table '{}' declares more than one primary key",
                    create.table_name
                )));
            }
            primary_key = columns;
        }

        for key in &primary_key {
            if !create.columns.iter().any(|c| c.name.eq_ignore_ascii_case(key)) {
                return Err(Error::UnknownColumn(key.clone(), create.table_name.clone()));
            }
        }

        Ok(LogicalPlan::CreateTable {
            table_name: create.table_name,
            columns: create.columns,
            primary_key,
            if_not_exists: create.if_not_exists,
        })
    }

    // ========== SELECT ==========

    fn plan_select(&self, select: SelectStatement) -> Result<SelectPlan> {
        let (table, scope) = match &select.from {
            Some(from) => {
                let table = self.catalog.get_table(&from.name)?;
                (
                    Some(table.name().to_string()),
                    Scope::for_table(table, from.alias.as_deref()),
                )
            }
            None => (None, Scope::empty()),
        };

        // Output expressions and their labels
        let mut projection = Vec::new();
        let mut labels = Vec::new();
        for item in select.columns {
            match item {
                SelectItem::Wildcard => {
                    if table.is_none() {
                        return Err(Error::InvalidProjection(
                            "SELECT * needs a FROM clause".to_string(),
                        ));
                    }
                    for column in scope.columns() {
                        projection.push(Expr::column(column.clone()));
                        labels.push(column.clone());
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    labels.push(alias.unwrap_or_else(|| expr.to_string()));
                    projection.push(expr);
                }
            }
        }

        // ORDER BY keys naming an output column, by label, position or
        // expression, sort on it directly
        let mut order_by = Vec::with_capacity(select.order_by.len());
        for item in select.order_by {
            let output = match &item.expr {
                Expr::Literal(Literal::Integer(n)) => {
                    let position = usize::try_from(*n)
                        .ok()
                        .filter(|n| (1..=projection.len()).contains(n))
                        .ok_or_else(|| {
                            Error::InvalidProjection(format!(
                                "ORDER BY position {} is not in the select list",
                                n
                            ))
                        })?;
                    Some(position - 1)
                }
                Expr::Column(ColumnRef {
                    table: None,
                    column,
                }) => labels
                    .iter()
                    .position(|l| l.eq_ignore_ascii_case(column))
                    .or_else(|| projection.iter().position(|p| scope.same_expr(p, &item.expr))),
                expr => projection.iter().position(|p| scope.same_expr(p, expr)),
            };
            let key = match output {
                Some(i) => SortKey::Output(i),
                None if select.distinct => {
                    return Err(Error::InvalidProjection(format!(
                        "ORDER BY expression {} must appear in the select list of SELECT DISTINCT",
                        item.expr
                    )));
                }
                None => SortKey::Expr(item.expr),
            };
            order_by.push(SortItem { key, asc: item.asc });
        }
        let sort_exprs: Vec<&Expr> = order_by
            .iter()
            .filter_map(|item| match &item.key {
                SortKey::Expr(expr) => Some(expr),
                SortKey::Output(_) => None,
            })
            .collect();

        // Names and functions
        let all_exprs = projection
            .iter()
            .chain(&select.where_clause)
            .chain(&select.group_by)
            .chain(&select.having)
            .chain(sort_exprs.iter().copied());
        for expr in all_exprs {
            self.check_expr(&scope, expr)?;
        }
        for expr in select.limit.iter().chain(&select.offset) {
            self.check_expr(&Scope::empty(), expr)?;
        }

        if let Some(expr) = select.where_clause.as_ref().filter(|e| e.contains_aggregate()) {
            return Err(Error::InvalidProjection(format!(
                "aggregate functions are not allowed in WHERE: {}",
                expr
            )));
        }
        if let Some(expr) = select.group_by.iter().find(|e| e.contains_aggregate()) {
            return Err(Error::InvalidProjection(format!(
                "aggregate functions are not allowed in GROUP BY: {}",
                expr
            )));
        }

        // Grouping
        let grouped = !select.group_by.is_empty()
            || select.having.is_some()
            || projection.iter().any(Expr::contains_aggregate)
            || sort_exprs.iter().any(|e| e.contains_aggregate());

        let mut aggregates: Vec<Expr> = Vec::new();
        if grouped {
            let grouped_exprs = projection
                .iter()
                .chain(&select.having)
                .chain(sort_exprs.iter().copied());
            for expr in grouped_exprs {
                Self::check_grouped(&scope, &select.group_by, expr)?;
                Self::extract_aggregates(&scope, expr, &mut aggregates);
            }
        }

        Ok(SelectPlan {
            table,
            scope,
            filter: select.where_clause,
            grouped,
            group_by: select.group_by,
            aggregates,
            having: select.having,
            projection,
            labels,
            distinct: select.distinct,
            order_by,
            limit: select.limit,
            offset: select.offset,
        })
    }

    /// Resolve column references and validate function calls
    fn check_expr(&self, scope: &Scope, expr: &Expr) -> Result<()> {
        let mut result = Ok(());
        expr.walk(&mut |e| {
            if result.is_err() {
                return;
            }
            result = match e {
                Expr::Column(col) => scope.resolve(col).map(|_| ()),
                Expr::Function { name, args, .. } if e.is_aggregate() => {
                    Self::check_aggregate_call(name, args)
                }
                Expr::Function { name, args, .. } => check_scalar_function(name, args.len()),
                _ => Ok(()),
            };
        });
        result
    }

    fn check_aggregate_call(name: &str, args: &[Expr]) -> Result<()> {
        match args {
            [Expr::Wildcard] if name == "COUNT" => Ok(()),
            [Expr::Wildcard] => Err(Error::InvalidProjection(format!(
                "{}(*) is not valid, only COUNT(*)",
                name
            ))),
            [arg] if arg.contains_aggregate() => Err(Error::InvalidProjection(format!(
                "aggregate calls cannot be nested in {}",
                name
            ))),
            [_] => Ok(()),
            _ => Err(Error::ArityMismatch {
                expected: 1,
                found: args.len(),
            }),
        }
    }

    /// Every column outside an aggregate must be covered by a GROUP BY key
    fn check_grouped(scope: &Scope, group_by: &[Expr], expr: &Expr) -> Result<()> {
        if expr.is_aggregate() || group_by.iter().any(|key| scope.same_expr(key, expr)) {
            return Ok(());
        }

        match expr {
            Expr::Column(col) => Err(Error::InvalidProjection(format!(
                "column '{}' must appear in GROUP BY or be used in an aggregate function",
                col.column
            ))),
            Expr::Literal(_) | Expr::Wildcard => Ok(()),
            Expr::BinaryOp { left, right, .. } => {
                Self::check_grouped(scope, group_by, left)?;
                Self::check_grouped(scope, group_by, right)
            }
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::Nested(expr) => Self::check_grouped(scope, group_by, expr),
            Expr::Function { args, .. } => args
                .iter()
                .try_for_each(|arg| Self::check_grouped(scope, group_by, arg)),
            Expr::Between {
                expr, low, high, ..
            } => [expr, low, high]
                .into_iter()
                .try_for_each(|e| Self::check_grouped(scope, group_by, e)),
            Expr::InList { expr, list, .. } => {
                Self::check_grouped(scope, group_by, expr)?;
                list.iter()
                    .try_for_each(|e| Self::check_grouped(scope, group_by, e))
            }
            Expr::Like { expr, pattern, .. } => {
                Self::check_grouped(scope, group_by, expr)?;
                Self::check_grouped(scope, group_by, pattern)
            }
        }
    }

    /// Collect aggregate calls in first-appearance order, without duplicates
    fn extract_aggregates(scope: &Scope, expr: &Expr, aggregates: &mut Vec<Expr>) {
        expr.walk(&mut |e| {
            if e.is_aggregate() && !aggregates.iter().any(|a| scope.same_expr(a, e)) {
                aggregates.push(e.clone());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;

    fn plan(sql: &str) -> Result<LogicalPlan> {
        let catalog = Catalog::with_examples().unwrap();
        let stmt = Parser::new(sql).unwrap().parse().unwrap();
        Planner::new(&catalog).plan(stmt)
    }

    fn plan_select(sql: &str) -> SelectPlan {
        match plan(sql).unwrap() {
            LogicalPlan::Select(select) => select,
            other => panic!("Expected SELECT plan, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_simple_select() {
        let select = plan_select("SELECT * FROM customers WHERE id = 1");
        assert_eq!(select.table.as_deref(), Some("customers"));
        assert_eq!(select.labels, vec!["id", "first_name", "country", "score"]);
        assert!(select.filter.is_some());
        assert!(!select.grouped);
    }

    #[test]
    fn test_plan_labels_and_sort_keys() {
        let select = plan_select(
            "SELECT first_name AS name, score * 2, UPPER(country) FROM customers \
             ORDER BY name, score DESC",
        );
        assert_eq!(select.labels, vec!["name", "score * 2", "UPPER(country)"]);
        assert!(matches!(select.order_by[0].key, SortKey::Output(0)));
        assert!(matches!(select.order_by[1].key, SortKey::Expr(_)));
        assert!(!select.order_by[1].asc);
    }

    #[test]
    fn test_plan_order_by_position() {
        let select = plan_select("SELECT first_name, score FROM customers ORDER BY 2 DESC, 1");
        assert!(matches!(select.order_by[0].key, SortKey::Output(1)));
        assert!(!select.order_by[0].asc);
        assert!(matches!(select.order_by[1].key, SortKey::Output(0)));

        for sql in [
            "SELECT first_name FROM customers ORDER BY 0",
            "SELECT first_name FROM customers ORDER BY 2",
        ] {
            assert!(matches!(plan(sql).unwrap_err(), Error::InvalidProjection(_)));
        }
    }

    #[test]
    fn test_plan_distinct_sort_keys() {
        let select = plan_select("SELECT DISTINCT c.country FROM customers c ORDER BY c.country DESC");
        assert!(matches!(select.order_by[0].key, SortKey::Output(0)));

        let err = plan("SELECT DISTINCT country FROM customers ORDER BY score").unwrap_err();
        assert!(matches!(err, Error::InvalidProjection(_)));

        // Without DISTINCT any source expression may be a sort key
        let select = plan_select("SELECT country FROM customers ORDER BY score");
        assert!(matches!(select.order_by[0].key, SortKey::Expr(_)));
    }

    #[test]
    fn test_plan_aggregates() {
        let select = plan_select(
            "SELECT country, COUNT(*), SUM(score) FROM customers \
             GROUP BY country HAVING SUM(score) > 800 ORDER BY AVG(score)",
        );
        assert!(select.grouped);
        let aggregates: Vec<String> = select.aggregates.iter().map(|a| a.to_string()).collect();
        assert_eq!(aggregates, vec!["COUNT(*)", "SUM(score)", "AVG(score)"]);

        let global = plan_select("SELECT COUNT(*) FROM orders");
        assert!(global.grouped);
        assert!(global.group_by.is_empty());
    }

    #[test]
    fn test_ungrouped_column_is_rejected() {
        let err = plan("SELECT country, first_name, SUM(score) FROM customers GROUP BY country")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProjection(_)));

        let err = plan("SELECT first_name, COUNT(*) FROM customers").unwrap_err();
        assert!(matches!(err, Error::InvalidProjection(_)));

        let err = plan("SELECT * FROM customers GROUP BY country").unwrap_err();
        assert!(matches!(err, Error::InvalidProjection(_)));

        // Expressions over keys are fine
        assert!(plan("SELECT UPPER(country), COUNT(*) FROM customers GROUP BY country").is_ok());
    }

    #[test]
    fn test_misplaced_aggregates() {
        assert!(matches!(
            plan("SELECT * FROM customers WHERE SUM(score) > 0").unwrap_err(),
            Error::InvalidProjection(_)
        ));
        assert!(matches!(
            plan("SELECT SUM(COUNT(*)) FROM customers").unwrap_err(),
            Error::InvalidProjection(_)
        ));
        assert!(matches!(
            plan("SELECT SUM(*) FROM customers").unwrap_err(),
            Error::InvalidProjection(_)
        ));
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            plan("SELECT * FROM ghosts").unwrap_err(),
            Error::UnknownTable(_)
        ));
        assert!(matches!(
            plan("SELECT salary FROM customers").unwrap_err(),
            Error::UnknownColumn(_, _)
        ));
        assert!(matches!(
            plan("SELECT REVERSE(first_name) FROM customers").unwrap_err(),
            Error::UnknownFunction(_)
        ));
    }

    #[test]
    fn test_plan_update_and_delete_are_validated() {
        assert!(plan("UPDATE customers SET score = score + 1 WHERE country = 'UK'").is_ok());
        assert!(matches!(
            plan("UPDATE customers SET salary = 1").unwrap_err(),
            Error::UnknownColumn(_, _)
        ));
        assert!(matches!(
            plan("UPDATE customers SET score = bonus").unwrap_err(),
            Error::UnknownColumn(_, _)
        ));
        assert!(matches!(
            plan("DELETE FROM customers WHERE COUNT(*) > 1").unwrap_err(),
            Error::InvalidProjection(_)
        ));
        assert!(matches!(
            plan("DELETE FROM ghosts").unwrap_err(),
            Error::UnknownTable(_)
        ));
    }

    #[test]
    fn test_plan_create_table_primary_key() {
        match plan("CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b))").unwrap() {
            LogicalPlan::CreateTable { primary_key, .. } => assert_eq!(primary_key, vec!["a", "b"]),
            other => panic!("unexpected plan {:?}", other),
        }

        assert!(matches!(
            plan("CREATE TABLE t (a INT, PRIMARY KEY (z))").unwrap_err(),
            Error::UnknownColumn(_, _)
        ));
        assert!(matches!(
            plan("CREATE TABLE t (a INT PRIMARY KEY, b INT, PRIMARY KEY (b))").unwrap_err(),
            Error::ConstraintViolation(_)
        ));
    }
}
