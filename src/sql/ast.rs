//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for SQL statements.

use std::fmt;

use chrono::NaiveDate;

use crate::catalog::DataType;

/// Aggregate function names
pub const AGGREGATE_FUNCTIONS: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select(SelectStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// TRUNCATE TABLE statement
    Truncate(String),
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// ALTER TABLE statement
    AlterTable(AlterTableStatement),
    /// DROP TABLE statement
    DropTable(DropTableStatement),
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// DISTINCT flag
    pub distinct: bool,
    /// Select list (columns or expressions)
    pub columns: Vec<SelectItem>,
    /// FROM clause
    pub from: Option<TableRef>,
    /// WHERE clause
    pub where_clause: Option<Expr>,
    /// GROUP BY clause
    pub group_by: Vec<Expr>,
    /// HAVING clause
    pub having: Option<Expr>,
    /// ORDER BY clause
    pub order_by: Vec<OrderByItem>,
    /// LIMIT clause, or the n of SELECT TOP n
    pub limit: Option<Expr>,
    /// OFFSET clause
    pub offset: Option<Expr>,
}

/// A single item in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// All columns (*)
    Wildcard,
    /// An expression with optional alias
    Expr { expr: Expr, alias: Option<String> },
}

/// Table reference in FROM
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name
    pub name: String,
    /// Alias
    pub alias: Option<String>,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    /// Expression to sort by
    pub expr: Expr,
    /// Ascending (true) or descending (false)
    pub asc: bool,
}

/// Where INSERT takes its rows from
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// VALUES (...), (...)
    Values(Vec<Vec<Expr>>),
    /// INSERT ... SELECT
    Select(Box<SelectStatement>),
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Table name
    pub table_name: String,
    /// Column names (optional)
    pub columns: Option<Vec<String>>,
    /// Rows to insert
    pub source: InsertSource,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Table name
    pub table_name: String,
    /// SET assignments
    pub assignments: Vec<Assignment>,
    /// WHERE clause
    pub where_clause: Option<Expr>,
}

/// Assignment in UPDATE SET clause
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name
    pub column: String,
    /// Value expression
    pub value: Expr,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Table name
    pub table_name: String,
    /// WHERE clause
    pub where_clause: Option<Expr>,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Table constraints
    pub constraints: Vec<TableConstraint>,
    /// IF NOT EXISTS flag
    pub if_not_exists: bool,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// DEFAULT value
    pub default: Option<Expr>,
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// [CONSTRAINT name] PRIMARY KEY (columns)
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
}

/// ALTER TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStatement {
    /// Table name
    pub table_name: String,
    /// The change to apply
    pub operation: AlterTableOperation,
}

/// ALTER TABLE operation
#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableOperation {
    /// ADD [COLUMN] definition
    AddColumn(ColumnDef),
    /// DROP COLUMN name
    DropColumn(String),
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// Table name
    pub table_name: String,
    /// IF EXISTS flag
    pub if_exists: bool,
}

/// SQL Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(ColumnRef),
    /// Literal value
    Literal(Literal),
    /// `*` as a function argument, as in COUNT(*)
    Wildcard,
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
    /// Function call, name uppercased
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
    /// BETWEEN
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// IN
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// LIKE
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// Nested expression (in parentheses)
    Nested(Box<Expr>),
}

impl Expr {
    /// Build a bare column reference
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::from(name.into()))
    }

    /// Whether this node is itself an aggregate call
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Function { name, .. } if AGGREGATE_FUNCTIONS.contains(&name.as_str()))
    }

    /// Whether an aggregate call appears anywhere in this expression
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| found |= e.is_aggregate());
        found
    }

    /// Visit this expression and every sub-expression, parents first
    pub fn walk(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Wildcard => {}
            Expr::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::Nested(expr) => expr.walk(visit),
            Expr::Function { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.walk(visit);
                low.walk(visit);
                high.walk(visit);
            }
            Expr::InList { expr, list, .. } => {
                expr.walk(visit);
                list.iter().for_each(|e| e.walk(visit));
            }
            Expr::Like { expr, pattern, .. } => {
                expr.walk(visit);
                pattern.walk(visit);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(col) => write!(f, "{}", col.column),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Wildcard => write!(f, "*"),
            Expr::BinaryOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => write!(f, "NOT {}", expr),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => write!(f, "-{}", expr),
            Expr::UnaryOp {
                op: UnaryOperator::Plus,
                expr,
            } => write!(f, "+{}", expr),
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                let distinct = if *distinct { "DISTINCT " } else { "" };
                write!(f, "{}({}{})", name, distinct, args.join(", "))
            }
            Expr::IsNull(expr) => write!(f, "{} IS NULL", expr),
            Expr::IsNotNull(expr) => write!(f, "{} IS NOT NULL", expr),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}BETWEEN {} AND {}", expr, not, low, high)
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<String> = list.iter().map(|e| e.to_string()).collect();
                write!(f, "{} {}IN ({})", expr, not, items.join(", "))
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE {}", expr, not, pattern)
            }
            Expr::Nested(expr) => write!(f, "({})", expr),
        }
    }
}

/// Column reference
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name or alias (optional)
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl From<String> for ColumnRef {
    fn from(column: String) -> Self {
        Self {
            table: None,
            column,
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// DATE 'YYYY-MM-DD'
    Date(NaiveDate),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // String
    Concat,
}

impl BinaryOperator {
    /// Get the precedence of this operator (higher = binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Neq
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Lte
            | BinaryOperator::Gte => 3,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Concat => 4,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 5,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Neq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Concat => "||",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    /// NOT
    Not,
    /// - (negation)
    Minus,
    /// + (plus sign)
    Plus,
}
