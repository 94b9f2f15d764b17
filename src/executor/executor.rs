//! Query Executor for PrimerDB
//!
//! This module executes logical plans against the catalog and returns results.
//! Every statement validates all affected rows before touching a table, so a
//! failing statement leaves the catalog as it was.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};

use super::aggregate::AggregateState;
use super::eval::{eval_const, Evaluator, Scope};
use super::planner::{InsertRows, LogicalPlan, Planner, SelectPlan, SortKey};
use crate::catalog::{AlterAction, Catalog, Column, Schema};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Parser;
use crate::storage::{Tuple, Value};

/// Query result
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Tuple>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Whether this is a query result (has columns)
    pub fn is_query(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Execution Engine
///
/// Owns the catalog outright; callers reach it only through statements or
/// the read-only [`ExecutionEngine::catalog`] accessor.
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    /// System catalog
    catalog: Catalog,
}

impl ExecutionEngine {
    /// Create a new execution engine over a catalog
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// The catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parse, plan and execute a single SQL statement
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult> {
        let stmt = Parser::new(sql)?.parse()?;
        self.execute_statement(stmt)
    }

    /// Plan and execute a parsed statement
    pub fn execute_statement(&mut self, stmt: Statement) -> Result<QueryResult> {
        let plan = Planner::new(&self.catalog).plan(stmt)?;
        self.execute(plan)
    }

    /// Execute a logical plan
    pub fn execute(&mut self, plan: LogicalPlan) -> Result<QueryResult> {
        debug!(?plan, "executing plan");

        match plan {
            LogicalPlan::Select(select) => self.select(&select),
            LogicalPlan::Insert {
                table_name,
                columns,
                source,
            } => self.insert(&table_name, columns, source),
            LogicalPlan::Update {
                table_name,
                assignments,
                predicate,
            } => self.update(&table_name, &assignments, predicate.as_ref()),
            LogicalPlan::Delete {
                table_name,
                predicate,
            } => self.delete(&table_name, predicate.as_ref()),
            LogicalPlan::Truncate { table_name } => self.truncate(&table_name),
            LogicalPlan::CreateTable {
                table_name,
                columns,
                primary_key,
                if_not_exists,
            } => self.create_table(&table_name, columns, &primary_key, if_not_exists),
            LogicalPlan::AlterTable {
                table_name,
                operation,
            } => self.alter_table(&table_name, operation),
            LogicalPlan::DropTable {
                table_name,
                if_exists,
            } => self.drop_table(&table_name, if_exists),
        }
    }

    // ========== Queries ==========

    /// Run a query: scan, filter, group, having, project, distinct, sort,
    /// offset and limit
    pub fn select(&self, plan: &SelectPlan) -> Result<QueryResult> {
        let no_table = [Tuple::empty()];
        let source: &[Tuple] = match &plan.table {
            Some(name) => self.catalog.get_table(name)?.rows(),
            None => &no_table,
        };

        let evaluator = Evaluator::new(&plan.scope);
        let mut rows = Vec::new();
        for row in source {
            if let Some(filter) = &plan.filter {
                if !evaluator.matches(filter, row.values())? {
                    continue;
                }
            }
            rows.push(row);
        }

        let mut output = if plan.grouped {
            Self::project_groups(plan, rows)?
        } else {
            rows.into_iter()
                .map(|row| Self::project_row(plan, &evaluator, row.values()))
                .collect::<Result<Vec<_>>>()?
        };

        if plan.distinct {
            let mut seen = HashSet::new();
            output.retain(|(row, _)| seen.insert(row.clone()));
        }

        if !plan.order_by.is_empty() {
            output.sort_by(|(_, a), (_, b)| {
                a.iter()
                    .zip(b)
                    .zip(&plan.order_by)
                    .map(|((x, y), item)| {
                        let ordering = x.sort_cmp(y);
                        if item.asc {
                            ordering
                        } else {
                            ordering.reverse()
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = Self::row_count(plan.offset.as_ref(), "OFFSET")?.unwrap_or(0);
        let limit = Self::row_count(plan.limit.as_ref(), "LIMIT")?.unwrap_or(usize::MAX);

        Ok(QueryResult {
            columns: plan.labels.clone(),
            rows: output
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|(row, _)| row)
                .collect(),
            affected_rows: 0,
            message: None,
        })
    }

    /// Project one source row, along with its sort keys
    fn project_row(
        plan: &SelectPlan,
        evaluator: &Evaluator,
        row: &[Value],
    ) -> Result<(Tuple, Vec<Value>)> {
        let projected = plan
            .projection
            .iter()
            .map(|expr| evaluator.eval(expr, row))
            .collect::<Result<Vec<_>>>()?;

        let keys = plan
            .order_by
            .iter()
            .map(|item| match &item.key {
                SortKey::Output(i) => Ok(projected[*i].clone()),
                SortKey::Expr(expr) => evaluator.eval(expr, row),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((Tuple::new(projected), keys))
    }

    /// Partition rows by the GROUP BY keys, aggregate each partition, apply
    /// HAVING and project one row per partition
    fn project_groups(plan: &SelectPlan, rows: Vec<&Tuple>) -> Result<Vec<(Tuple, Vec<Value>)>> {
        let evaluator = Evaluator::new(&plan.scope);
        let new_states = || {
            plan.aggregates
                .iter()
                .map(AggregateState::new)
                .collect::<Result<Vec<_>>>()
        };

        let null_row = Tuple::new(vec![Value::Null; plan.scope.columns().len()]);

        // Partitions in order of first appearance; NULL keys are equal here
        let mut groups: IndexMap<Vec<Value>, (&Tuple, Vec<AggregateState>)> = IndexMap::new();
        for row in rows {
            let key = plan
                .group_by
                .iter()
                .map(|expr| evaluator.eval(expr, row.values()))
                .collect::<Result<Vec<_>>>()?;

            let (_, states) = match groups.entry(key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert((row, new_states()?)),
            };
            for (call, state) in plan.aggregates.iter().zip(states.iter_mut()) {
                state.add(Self::aggregate_input(&evaluator, call, row.values())?)?;
            }
        }

        // Without GROUP BY, an empty input still yields one partition
        if groups.is_empty() && plan.group_by.is_empty() {
            groups.insert(Vec::new(), (&null_row, new_states()?));
        }

        let mut output = Vec::with_capacity(groups.len());
        for (_, (row, states)) in groups {
            let values: Vec<(Expr, Value)> = plan
                .aggregates
                .iter()
                .cloned()
                .zip(states)
                .map(|(call, state)| state.finish().map(|value| (call, value)))
                .collect::<Result<_>>()?;
            let evaluator = Evaluator::new(&plan.scope).with_aggregates(&values);

            if let Some(having) = &plan.having {
                if !evaluator.matches(having, row.values())? {
                    continue;
                }
            }
            output.push(Self::project_row(plan, &evaluator, row.values())?);
        }
        Ok(output)
    }

    /// The value an aggregate call consumes for one row
    fn aggregate_input(evaluator: &Evaluator, call: &Expr, row: &[Value]) -> Result<Value> {
        match call {
            Expr::Function { args, .. } => match args.as_slice() {
                // COUNT(*) counts rows, any non-NULL marker will do
                [Expr::Wildcard] => Ok(Value::Boolean(true)),
                [arg] => evaluator.eval(arg, row),
                _ => Err(Error::ArityMismatch {
                    expected: 1,
                    found: args.len(),
                }),
            },
            other => Err(Error::ExecutionError(format!(
                "{} is not an aggregate call",
                other
            ))),
        }
    }

    /// Evaluate a LIMIT/OFFSET/TOP clause
    fn row_count(expr: Option<&Expr>, clause: &str) -> Result<Option<usize>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match eval_const(expr)? {
            Value::Integer(n) if n >= 0 => Ok(Some(n as usize)),
            other => Err(Error::ExecutionError(format!(
                "{} expects a non-negative integer, got {}",
                clause, other
            ))),
        }
    }

    // ========== DML ==========

    /// Insert rows from VALUES or a query; returns the inserted count
    pub fn insert(
        &mut self,
        table_name: &str,
        columns: Option<Vec<String>>,
        source: InsertRows,
    ) -> Result<QueryResult> {
        let input: Vec<Vec<Value>> = match source {
            InsertRows::Values(rows) => rows
                .iter()
                .map(|row| row.iter().map(eval_const).collect::<Result<Vec<_>>>())
                .collect::<Result<_>>()?,
            InsertRows::Query(query) => self
                .select(&query)?
                .rows
                .into_iter()
                .map(Tuple::into_values)
                .collect(),
        };

        let table = self.catalog.get_table(table_name)?;
        let schema = table.schema();

        // Target positions for an explicit column list
        let targets = match &columns {
            Some(names) => {
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    let index = schema.get_column_index(name).ok_or_else(|| {
                        Error::UnknownColumn(name.clone(), table.name().to_string())
                    })?;
                    if targets.contains(&index) {
                        return Err(Error::DuplicateColumn(
                            name.clone(),
                            table.name().to_string(),
                        ));
                    }
                    targets.push(index);
                }
                Some(targets)
            }
            None => None,
        };

        let mut prepared = Vec::with_capacity(input.len());
        for values in input {
            let values = match &targets {
                Some(targets) => {
                    if values.len() != targets.len() {
                        return Err(Error::ArityMismatch {
                            expected: targets.len(),
                            found: values.len(),
                        });
                    }
                    let mut full: Vec<Value> =
                        schema.columns().iter().map(Column::fill_value).collect();
                    for (&index, value) in targets.iter().zip(values) {
                        full[index] = value;
                    }
                    full
                }
                None => values,
            };
            prepared.push(table.prepare_row(values)?);
        }

        let count = self
            .catalog
            .get_table_mut(table_name)?
            .append_rows(prepared)?;
        Ok(QueryResult::with_affected_rows(
            count,
            format!("{} row(s) inserted", count),
        ))
    }

    /// Update matching rows; assignments see the old row
    pub fn update(
        &mut self,
        table_name: &str,
        assignments: &[Assignment],
        predicate: Option<&Expr>,
    ) -> Result<QueryResult> {
        let table = self.catalog.get_table(table_name)?;
        let schema = table.schema();
        let scope = Scope::for_table(table, None);
        let evaluator = Evaluator::new(&scope);

        let targets = assignments
            .iter()
            .map(|a| {
                schema
                    .get_column_index(&a.column)
                    .ok_or_else(|| Error::UnknownColumn(a.column.clone(), table.name().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut updated = 0;
        let mut rows = Vec::with_capacity(table.row_count());
        for row in table.rows() {
            if let Some(predicate) = predicate {
                if !evaluator.matches(predicate, row.values())? {
                    rows.push(row.clone());
                    continue;
                }
            }

            // Every assignment sees the row as it was before the update
            let mut new_row = row.clone();
            for (assignment, &index) in assignments.iter().zip(&targets) {
                let value = evaluator.eval(&assignment.value, row.values())?;
                new_row.set(index, table.check_value(&schema.columns()[index], value)?);
            }
            rows.push(new_row);
            updated += 1;
        }

        self.catalog.get_table_mut(table_name)?.replace_rows(rows)?;
        Ok(QueryResult::with_affected_rows(
            updated,
            format!("{} row(s) updated", updated),
        ))
    }

    /// Delete matching rows, or all rows without a predicate
    pub fn delete(&mut self, table_name: &str, predicate: Option<&Expr>) -> Result<QueryResult> {
        let table = self.catalog.get_table(table_name)?;
        let keep = match predicate {
            Some(predicate) => {
                let scope = Scope::for_table(table, None);
                let evaluator = Evaluator::new(&scope);
                table
                    .rows()
                    .iter()
                    .map(|row| Ok(!evaluator.matches(predicate, row.values())?))
                    .collect::<Result<Vec<_>>>()?
            }
            None => vec![false; table.row_count()],
        };

        let deleted = self.catalog.get_table_mut(table_name)?.retain_rows(&keep);
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("{} row(s) deleted", deleted),
        ))
    }

    pub fn truncate(&mut self, table_name: &str) -> Result<QueryResult> {
        let removed = self.catalog.get_table_mut(table_name)?.truncate();
        info!(table = table_name, removed, "table truncated");
        Ok(QueryResult::with_affected_rows(
            removed,
            format!("{} row(s) deleted", removed),
        ))
    }

    // ========== DDL ==========

    pub fn create_table(
        &mut self,
        table_name: &str,
        columns: Vec<ColumnDef>,
        primary_key: &[String],
        if_not_exists: bool,
    ) -> Result<QueryResult> {
        if if_not_exists && self.catalog.table_exists(table_name) {
            return Ok(QueryResult::with_message(format!(
                "Table '{}' already exists, skipped",
                table_name
            )));
        }

        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(position, def)| {
                let is_key = primary_key.iter().any(|k| k.eq_ignore_ascii_case(&def.name));
                Self::build_column(def, position, is_key)
            })
            .collect::<Result<Vec<_>>>()?;

        self.catalog
            .create_table(table_name, Schema::from_columns(columns))?;
        info!(table = table_name, "table created");
        Ok(QueryResult::with_message(format!(
            "Table '{}' created",
            table_name
        )))
    }

    /// Turn a column definition into a catalog column, checking its default
    fn build_column(def: ColumnDef, position: usize, primary_key: bool) -> Result<Column> {
        let mut column = Column::new(def.name, def.data_type, position)
            .nullable(!def.not_null)
            .primary_key(primary_key || def.primary_key);

        if let Some(expr) = def.default {
            let value = column.data_type.check(&column.name, eval_const(&expr)?)?;
            column = column.default(value);
        }
        Ok(column)
    }

    pub fn alter_table(
        &mut self,
        table_name: &str,
        operation: AlterTableOperation,
    ) -> Result<QueryResult> {
        let action = match operation {
            AlterTableOperation::AddColumn(def) => {
                if def.primary_key {
                    return Err(Error::ConstraintViolation(format!(
                        "cannot add primary key column '{}' to existing table '{}'",
                        def.name, table_name
                    )));
                }
                let position = self.catalog.get_table(table_name)?.schema().column_count();
                AlterAction::AddColumn(Self::build_column(def, position, false)?)
            }
            AlterTableOperation::DropColumn(name) => AlterAction::DropColumn(name),
        };

        self.catalog.alter_table(table_name, action)?;
        info!(table = table_name, "table altered");
        Ok(QueryResult::with_message(format!(
            "Table '{}' altered",
            table_name
        )))
    }

    pub fn drop_table(&mut self, table_name: &str, if_exists: bool) -> Result<QueryResult> {
        if if_exists && !self.catalog.table_exists(table_name) {
            return Ok(QueryResult::with_message(format!(
                "Table '{}' does not exist, skipped",
                table_name
            )));
        }

        self.catalog.drop_table(table_name)?;
        info!(table = table_name, "table dropped");
        Ok(QueryResult::with_message(format!(
            "Table '{}' dropped",
            table_name
        )))
    }
}
