//! SQL Token definitions
//!
//! This module defines all tokens that can appear in SQL statements.

use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Alter,
    Truncate,
    Table,
    Add,
    Column,

    // DML Keywords
    Select,
    Insert,
    Update,
    Delete,
    Into,
    Values,
    Set,
    From,
    Where,

    // Clauses
    And,
    Or,
    Not,
    As,

    // Ordering, Grouping & Row limits
    Order,
    By,
    Asc,
    Desc,
    Group,
    Having,
    Limit,
    Offset,
    Top,

    // Constraints
    Primary,
    Key,
    Default,
    Constraint,
    Null,

    // Data Types
    Int,
    Integer,
    BigInt,
    SmallInt,
    Varchar,
    Char,
    Text,
    Date,

    // Boolean Literals
    True,
    False,

    // Aggregate Functions
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Other Keywords
    Distinct,
    All,
    Exists,
    In,
    Between,
    Like,
    Is,
    If,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(u64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Identifier (table name, column name, etc.)
    Identifier(String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// ||
    Concat,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        !matches!(
            self,
            Token::IntegerLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::Identifier(_)
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Gt
                | Token::Lte
                | Token::Gte
                | Token::Plus
                | Token::Minus
                | Token::Asterisk
                | Token::Slash
                | Token::Percent
                | Token::Concat
                | Token::LParen
                | Token::RParen
                | Token::Comma
                | Token::Semicolon
                | Token::Dot
                | Token::Eof
        )
    }

    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            // DDL
            "CREATE" => Some(Token::Create),
            "DROP" => Some(Token::Drop),
            "ALTER" => Some(Token::Alter),
            "TRUNCATE" => Some(Token::Truncate),
            "TABLE" => Some(Token::Table),
            "ADD" => Some(Token::Add),
            "COLUMN" => Some(Token::Column),

            // DML
            "SELECT" => Some(Token::Select),
            "INSERT" => Some(Token::Insert),
            "UPDATE" => Some(Token::Update),
            "DELETE" => Some(Token::Delete),
            "INTO" => Some(Token::Into),
            "VALUES" => Some(Token::Values),
            "SET" => Some(Token::Set),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),

            // Clauses
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            "AS" => Some(Token::As),

            // Ordering, Grouping & Row limits
            "ORDER" => Some(Token::Order),
            "BY" => Some(Token::By),
            "ASC" => Some(Token::Asc),
            "DESC" => Some(Token::Desc),
            "GROUP" => Some(Token::Group),
            "HAVING" => Some(Token::Having),
            "LIMIT" => Some(Token::Limit),
            "OFFSET" => Some(Token::Offset),
            "TOP" => Some(Token::Top),

            // Constraints
            "PRIMARY" => Some(Token::Primary),
            "KEY" => Some(Token::Key),
            "DEFAULT" => Some(Token::Default),
            "CONSTRAINT" => Some(Token::Constraint),
            "NULL" => Some(Token::Null),

            // Data Types
            "INT" => Some(Token::Int),
            "INTEGER" => Some(Token::Integer),
            "BIGINT" => Some(Token::BigInt),
            "SMALLINT" => Some(Token::SmallInt),
            "VARCHAR" => Some(Token::Varchar),
            "CHAR" => Some(Token::Char),
            "TEXT" => Some(Token::Text),
            "DATE" => Some(Token::Date),

            // Boolean Literals
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),

            // Aggregate Functions
            "COUNT" => Some(Token::Count),
            "SUM" => Some(Token::Sum),
            "AVG" => Some(Token::Avg),
            "MIN" => Some(Token::Min),
            "MAX" => Some(Token::Max),

            // Other Keywords
            "DISTINCT" => Some(Token::Distinct),
            "ALL" => Some(Token::All),
            "EXISTS" => Some(Token::Exists),
            "IN" => Some(Token::In),
            "BETWEEN" => Some(Token::Between),
            "LIKE" => Some(Token::Like),
            "IS" => Some(Token::Is),
            "IF" => Some(Token::If),

            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Create => "CREATE",
            Token::Drop => "DROP",
            Token::Alter => "ALTER",
            Token::Truncate => "TRUNCATE",
            Token::Table => "TABLE",
            Token::Add => "ADD",
            Token::Column => "COLUMN",
            Token::Select => "SELECT",
            Token::Insert => "INSERT",
            Token::Update => "UPDATE",
            Token::Delete => "DELETE",
            Token::Into => "INTO",
            Token::Values => "VALUES",
            Token::Set => "SET",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::As => "AS",
            Token::Order => "ORDER",
            Token::By => "BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Group => "GROUP",
            Token::Having => "HAVING",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::Top => "TOP",
            Token::Primary => "PRIMARY",
            Token::Key => "KEY",
            Token::Default => "DEFAULT",
            Token::Constraint => "CONSTRAINT",
            Token::Null => "NULL",
            Token::Int => "INT",
            Token::Integer => "INTEGER",
            Token::BigInt => "BIGINT",
            Token::SmallInt => "SMALLINT",
            Token::Varchar => "VARCHAR",
            Token::Char => "CHAR",
            Token::Text => "TEXT",
            Token::Date => "DATE",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Count => "COUNT",
            Token::Sum => "SUM",
            Token::Avg => "AVG",
            Token::Min => "MIN",
            Token::Max => "MAX",
            Token::Distinct => "DISTINCT",
            Token::All => "ALL",
            Token::Exists => "EXISTS",
            Token::In => "IN",
            Token::Between => "BETWEEN",
            Token::Like => "LIKE",
            Token::Is => "IS",
            Token::If => "IF",
            Token::IntegerLiteral(n) => return write!(f, "{}", n),
            Token::FloatLiteral(n) => return write!(f, "{}", n),
            Token::StringLiteral(s) => return write!(f, "'{}'", s),
            Token::Identifier(s) => return write!(f, "{}", s),
            Token::Eq => "=",
            Token::Neq => "<>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Asterisk => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Concat => "||",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Eof => "EOF",
        };
        write!(f, "{}", text)
    }
}
