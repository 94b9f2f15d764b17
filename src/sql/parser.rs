//! SQL Parser
//!
//! This module parses SQL tokens into an AST.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::storage::date::parse_date;

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single SQL statement, which must make up the whole input
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_terminated()?;
        if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }
        Ok(stmt)
    }

    /// Parse multiple SQL statements
    pub fn parse_all(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_terminated()?);
        }

        Ok(statements)
    }

    /// Parse a statement followed by a semicolon or the end of input
    fn parse_terminated(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        } else if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }

        Ok(stmt)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Truncate => self.parse_truncate(),
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Alter => self.parse_alter_table().map(Statement::AlterTable),
            Token::Drop => self.parse_drop(),
            Token::Eof => Err(Error::UnexpectedEof("statement".to_string())),
            _ => Err(Error::UnexpectedToken {
                expected: "SELECT, INSERT, UPDATE, DELETE, TRUNCATE, CREATE, ALTER, or DROP"
                    .to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement::default();

        // DISTINCT
        if self.check(&Token::Distinct) {
            self.advance();
            stmt.distinct = true;
        } else if self.check(&Token::All) {
            self.advance();
        }

        // TOP n
        if self.check(&Token::Top) {
            self.advance();
            stmt.limit = Some(self.parse_primary_expr()?);
        }

        // Select list
        stmt.columns = self.parse_select_list()?;

        // FROM clause
        if self.check(&Token::From) {
            self.advance();
            stmt.from = Some(self.parse_table_ref()?);
        }

        // WHERE clause
        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = Some(self.parse_expr()?);
        }

        // GROUP BY clause
        if self.check(&Token::Group) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.group_by = self.parse_expr_list()?;
        }

        // HAVING clause
        if self.check(&Token::Having) {
            self.advance();
            stmt.having = Some(self.parse_expr()?);
        }

        // ORDER BY clause
        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        // LIMIT clause
        if self.check(&Token::Limit) {
            self.advance();
            if stmt.limit.is_some() {
                return Err(Error::ParseError(
                    "TOP and LIMIT cannot be combined".to_string(),
                ));
            }
            stmt.limit = Some(self.parse_expr()?);
        }

        // OFFSET clause
        if self.check(&Token::Offset) {
            self.advance();
            stmt.offset = Some(self.parse_expr()?);
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            items.push(self.parse_select_item()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance(); // consume comma
        }

        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;

        Ok(SelectItem::Expr { expr, alias })
    }

    /// `AS name`, or a bare identifier directly after the aliased item
    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.check(&Token::As) {
            self.advance();
            return self.expect_identifier().map(Some);
        }
        if let Token::Identifier(name) = self.current().clone() {
            self.advance();
            return Ok(Some(name));
        }
        Ok(None)
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_identifier()?;
        let alias = self.parse_alias()?;
        Ok(TableRef { name, alias })
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let expr = self.parse_expr()?;
            let asc = if self.check(&Token::Desc) {
                self.advance();
                false
            } else {
                if self.check(&Token::Asc) {
                    self.advance();
                }
                true
            };

            items.push(OrderByItem { expr, asc });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        // Optional column list
        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        if self.check(&Token::Select) {
            let query = self.parse_select()?;
            return Ok(InsertStatement {
                table_name,
                columns,
                source: InsertSource::Select(Box::new(query)),
            });
        }

        self.expect(&Token::Values)?;

        // Parse value rows
        let mut values = Vec::new();
        loop {
            self.expect(&Token::LParen)?;
            let row = self.parse_expr_list()?;
            self.expect(&Token::RParen)?;
            values.push(row);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table_name,
            columns,
            source: InsertSource::Values(values),
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE / TRUNCATE Statements ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    fn parse_truncate(&mut self) -> Result<Statement> {
        self.expect(&Token::Truncate)?;
        if self.check(&Token::Table) {
            self.advance();
        }
        let table_name = self.expect_identifier()?;
        Ok(Statement::Truncate(table_name))
    }

    fn parse_where(&mut self) -> Result<Option<Expr>> {
        if self.check(&Token::Where) {
            self.advance();
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // ========== CREATE / ALTER / DROP Statements ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let if_not_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Not)?;
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            if self.check(&Token::Primary) || self.check(&Token::Constraint) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
            constraints,
            if_not_exists,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut not_null = false;
        let mut default = None;
        let mut primary_key = false;

        // Parse column constraints
        loop {
            if self.check(&Token::Not) {
                self.advance();
                self.expect(&Token::Null)?;
                not_null = true;
            } else if self.check(&Token::Null) {
                self.advance();
                // NULL is allowed (default)
            } else if self.check(&Token::Default) {
                self.advance();
                default = Some(self.parse_unary_expr()?);
            } else if self.check(&Token::Primary) {
                self.advance();
                self.expect(&Token::Key)?;
                primary_key = true;
                not_null = true;
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            data_type,
            not_null,
            primary_key,
            default,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let dt = match self.current() {
            Token::Int | Token::Integer | Token::BigInt | Token::SmallInt => {
                self.advance();
                DataType::Integer
            }
            Token::Varchar => {
                self.advance();
                match self.parse_length()? {
                    Some(len) => DataType::Varchar(len),
                    None => DataType::Text,
                }
            }
            Token::Char => {
                self.advance();
                DataType::Char(self.parse_length()?.unwrap_or(1))
            }
            Token::Text => {
                self.advance();
                DataType::Text
            }
            Token::Date => {
                self.advance();
                DataType::Date
            }
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "data type".to_string(),
                    found: format!("{}", self.current()),
                });
            }
        };

        Ok(dt)
    }

    /// Optional `(n)` after a string type
    fn parse_length(&mut self) -> Result<Option<usize>> {
        if !self.check(&Token::LParen) {
            return Ok(None);
        }
        self.advance();
        let len = self.expect_integer()?;
        self.expect(&Token::RParen)?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len > 0)
            .map(Some)
            .ok_or_else(|| Error::ParseError(format!("invalid type length {}", len)))
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        // Optional constraint name
        let name = if self.check(&Token::Constraint) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };

        self.expect(&Token::Primary)?;
        self.expect(&Token::Key)?;
        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;
        Ok(TableConstraint::PrimaryKey { name, columns })
    }

    fn parse_alter_table(&mut self) -> Result<AlterTableStatement> {
        self.expect(&Token::Alter)?;
        self.expect(&Token::Table)?;
        let table_name = self.expect_identifier()?;

        let operation = match self.current() {
            Token::Add => {
                self.advance();
                if self.check(&Token::Column) {
                    self.advance();
                }
                AlterTableOperation::AddColumn(self.parse_column_def()?)
            }
            Token::Drop => {
                self.advance();
                self.expect(&Token::Column)?;
                AlterTableOperation::DropColumn(self.expect_identifier()?)
            }
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "ADD or DROP".to_string(),
                    found: format!("{}", self.current()),
                })
            }
        };

        Ok(AlterTableStatement {
            table_name,
            operation,
        })
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;

        let if_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        Ok(Statement::DropTable(DropTableStatement {
            table_name,
            if_exists,
        }))
    }

    // ========== Expression Parsing ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            })
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive_expr()?;

        // IS NULL / IS NOT NULL
        if self.check(&Token::Is) {
            self.advance();
            let negated = self.check(&Token::Not);
            if negated {
                self.advance();
            }
            self.expect(&Token::Null)?;
            return Ok(if negated {
                Expr::IsNotNull(Box::new(left))
            } else {
                Expr::IsNull(Box::new(left))
            });
        }

        // [NOT] BETWEEN, [NOT] IN, [NOT] LIKE
        let negated = self.check(&Token::Not);
        if negated {
            self.advance();
        }

        match self.current() {
            Token::Between => {
                self.advance();
                let low = self.parse_additive_expr()?;
                self.expect(&Token::And)?;
                let high = self.parse_additive_expr()?;
                return Ok(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                });
            }
            Token::In => {
                self.advance();
                self.expect(&Token::LParen)?;
                let list = self.parse_expr_list()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::InList {
                    expr: Box::new(left),
                    list,
                    negated,
                });
            }
            Token::Like => {
                self.advance();
                let pattern = self.parse_additive_expr()?;
                return Ok(Expr::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    negated,
                });
            }
            _ if negated => {
                return Err(Error::UnexpectedToken {
                    expected: "BETWEEN, IN, or LIKE".to_string(),
                    found: format!("{}", self.current()),
                });
            }
            _ => {}
        }

        // Comparison operators
        let op = match self.current() {
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::Neq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::Lte => Some(BinaryOperator::Lte),
            Token::Gte => Some(BinaryOperator::Gte),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive_expr()?;
            Ok(Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.current() {
            Token::Minus => UnaryOperator::Minus,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary_expr(),
        };
        self.advance();

        // Integer digits are unsigned, so the minus is needed to reach i64::MIN
        if let (UnaryOperator::Minus, Token::IntegerLiteral(n)) = (&op, self.current()) {
            let n = *n;
            self.advance();
            return 0i64
                .checked_sub_unsigned(n)
                .map(|n| Expr::Literal(Literal::Integer(n)))
                .ok_or_else(|| integer_out_of_range(format!("-{}", n)));
        }

        // Fold signed numeric literals so DEFAULT -1 and TOP -1 stay literals
        match (op, self.parse_unary_expr()?) {
            (UnaryOperator::Minus, Expr::Literal(Literal::Integer(n))) if n != i64::MIN => {
                Ok(Expr::Literal(Literal::Integer(-n)))
            }
            (UnaryOperator::Minus, Expr::Literal(Literal::Float(n))) => {
                Ok(Expr::Literal(Literal::Float(-n)))
            }
            (op, expr) => Ok(Expr::UnaryOp {
                op,
                expr: Box::new(expr),
            }),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().clone() {
            // Literals
            Token::IntegerLiteral(n) => {
                self.advance();
                i64::try_from(n)
                    .map(|n| Expr::Literal(Literal::Integer(n)))
                    .map_err(|_| integer_out_of_range(n))
            }
            Token::FloatLiteral(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(n)))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            // DATE 'YYYY-MM-DD'
            Token::Date => {
                self.advance();
                match self.current().clone() {
                    Token::StringLiteral(s) => {
                        self.advance();
                        Ok(Expr::Literal(Literal::Date(parse_date(&s)?)))
                    }
                    other => Err(Error::UnexpectedToken {
                        expected: "date string".to_string(),
                        found: format!("{}", other),
                    }),
                }
            }

            // Parenthesized expression
            Token::LParen => {
                self.advance();
                if self.check(&Token::Select) {
                    return Err(Error::ParseError("subqueries are not supported".to_string()));
                }
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Nested(Box::new(expr)))
            }

            // Aggregate functions
            Token::Count | Token::Sum | Token::Avg | Token::Min | Token::Max => {
                let name = self.current().to_string();
                self.advance();
                self.parse_function_args(name)
            }

            // Identifier (column or function)
            Token::Identifier(name) => {
                self.advance();

                if self.check(&Token::LParen) {
                    self.parse_function_args(name.to_uppercase())
                } else if self.check(&Token::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    Ok(Expr::Column(ColumnRef {
                        table: Some(name),
                        column,
                    }))
                } else {
                    Ok(Expr::Column(ColumnRef {
                        table: None,
                        column: name,
                    }))
                }
            }

            Token::Eof => Err(Error::UnexpectedEof("expression".to_string())),

            _ => Err(Error::UnexpectedToken {
                expected: "expression".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    /// Parse `( [DISTINCT] args )` after a function name
    fn parse_function_args(&mut self, name: String) -> Result<Expr> {
        self.expect(&Token::LParen)?;

        let distinct = if self.check(&Token::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let args = if self.check(&Token::Asterisk) {
            self.advance();
            vec![Expr::Wildcard]
        } else if self.check(&Token::RParen) {
            vec![]
        } else {
            self.parse_expr_list()?
        };

        self.expect(&Token::RParen)?;

        Ok(Expr::Function {
            name,
            args,
            distinct,
        })
    }

    // ========== Helper functions ==========

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();

        loop {
            exprs.push(self.parse_expr()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(exprs)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(Error::UnexpectedEof(format!("{}", token)))
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            Token::Eof => Err(Error::UnexpectedEof("identifier".to_string())),
            _ => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn expect_integer(&mut self) -> Result<u64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "integer".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}

fn integer_out_of_range(literal: impl std::fmt::Display) -> Error {
    Error::ParseError(format!("integer literal {} is out of range", literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::new(sql).unwrap().parse().unwrap()
    }

    fn parse_select(sql: &str) -> SelectStatement {
        match parse(sql) {
            Statement::Select(s) => s,
            other => panic!("Expected SELECT statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_select() {
        let s = parse_select("SELECT * FROM customers");
        assert_eq!(s.columns.len(), 1);
        assert!(matches!(s.columns[0], SelectItem::Wildcard));
        assert_eq!(s.from.unwrap().name, "customers");
    }

    #[test]
    fn test_parse_select_clauses() {
        let s = parse_select(
            "SELECT country, SUM(score) AS total_score FROM customers \
             WHERE score <> 0 GROUP BY country HAVING SUM(score) > 800 \
             ORDER BY total_score DESC LIMIT 2 OFFSET 1",
        );
        assert_eq!(s.columns.len(), 2);
        assert!(s.where_clause.is_some());
        assert_eq!(s.group_by, vec![Expr::column("country")]);
        assert!(s.having.is_some());
        assert_eq!(s.order_by.len(), 1);
        assert!(!s.order_by[0].asc);
        assert_eq!(s.limit, Some(Expr::Literal(Literal::Integer(2))));
        assert_eq!(s.offset, Some(Expr::Literal(Literal::Integer(1))));

        match &s.columns[1] {
            SelectItem::Expr { expr, alias } => {
                assert!(expr.is_aggregate());
                assert_eq!(alias.as_deref(), Some("total_score"));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_top_and_distinct() {
        let s = parse_select("SELECT DISTINCT TOP 3 country FROM customers");
        assert!(s.distinct);
        assert_eq!(s.limit, Some(Expr::Literal(Literal::Integer(3))));

        let err = Parser::new("SELECT TOP 1 * FROM customers LIMIT 2")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_parse_alias_without_as_and_table_alias() {
        let s = parse_select("SELECT c.first_name name FROM customers c");
        assert_eq!(s.from.unwrap().alias.as_deref(), Some("c"));
        match &s.columns[0] {
            SelectItem::Expr { expr, alias } => {
                assert_eq!(alias.as_deref(), Some("name"));
                assert!(matches!(expr, Expr::Column(ColumnRef { table: Some(t), .. }) if t == "c"));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_predicates() {
        let s = parse_select(
            "SELECT * FROM customers WHERE country NOT IN ('USA', 'UK') \
             AND score BETWEEN 100 AND 500 AND first_name LIKE 'M%' AND score IS NOT NULL",
        );
        let mut kinds = Vec::new();
        s.where_clause.unwrap().walk(&mut |e| match e {
            Expr::InList { negated: true, .. } => kinds.push("not in"),
            Expr::Between { negated: false, .. } => kinds.push("between"),
            Expr::Like { .. } => kinds.push("like"),
            Expr::IsNotNull(_) => kinds.push("is not null"),
            _ => {}
        });
        assert_eq!(kinds, vec!["not in", "between", "like", "is not null"]);
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "CREATE TABLE persons (
                id INT NOT NULL,
                person_name VARCHAR(50) NOT NULL,
                birth_date DATE,
                phone VARCHAR(15) NOT NULL DEFAULT 'n/a',
                CONSTRAINT pk_persons PRIMARY KEY (id)
            )",
        );

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.table_name, "persons");
                assert_eq!(ct.columns.len(), 4);
                assert!(ct.columns[0].not_null);
                assert_eq!(ct.columns[1].data_type, DataType::Varchar(50));
                assert_eq!(ct.columns[2].data_type, DataType::Date);
                assert!(ct.columns[3].default.is_some());
                assert_eq!(
                    ct.constraints,
                    vec![TableConstraint::PrimaryKey {
                        name: Some("pk_persons".to_string()),
                        columns: vec!["id".to_string()],
                    }]
                );
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_alter_table() {
        match parse("ALTER TABLE persons ADD email VARCHAR(50) NOT NULL") {
            Statement::AlterTable(at) => match at.operation {
                AlterTableOperation::AddColumn(def) => {
                    assert_eq!(def.name, "email");
                    assert!(def.not_null);
                }
                other => panic!("unexpected operation {:?}", other),
            },
            _ => panic!("Expected ALTER TABLE statement"),
        }

        match parse("ALTER TABLE persons DROP COLUMN phone") {
            Statement::AlterTable(at) => {
                assert_eq!(
                    at.operation,
                    AlterTableOperation::DropColumn("phone".to_string())
                );
            }
            _ => panic!("Expected ALTER TABLE statement"),
        }
    }

    #[test]
    fn test_parse_insert() {
        match parse("INSERT INTO customers (id, first_name) VALUES (6, 'Anna'), (7, 'Sam')") {
            Statement::Insert(i) => {
                assert_eq!(i.table_name, "customers");
                assert_eq!(i.columns.as_ref().unwrap().len(), 2);
                assert!(matches!(i.source, InsertSource::Values(rows) if rows.len() == 2));
            }
            _ => panic!("Expected INSERT statement"),
        }

        match parse("INSERT INTO persons (id, person_name, phone) SELECT id, first_name, 'Unknown' FROM customers") {
            Statement::Insert(i) => assert!(matches!(i.source, InsertSource::Select(_))),
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_update_delete_truncate() {
        match parse("UPDATE customers SET score = 0, country = 'UK' WHERE id = 6") {
            Statement::Update(u) => {
                assert_eq!(u.table_name, "customers");
                assert_eq!(u.assignments.len(), 2);
                assert!(u.where_clause.is_some());
            }
            _ => panic!("Expected UPDATE statement"),
        }

        match parse("DELETE FROM customers WHERE id > 5") {
            Statement::Delete(d) => assert!(d.where_clause.is_some()),
            _ => panic!("Expected DELETE statement"),
        }

        assert_eq!(
            parse("TRUNCATE TABLE persons"),
            Statement::Truncate("persons".to_string())
        );
    }

    #[test]
    fn test_parse_drop_if_exists() {
        assert_eq!(
            parse("DROP TABLE IF EXISTS persons;"),
            Statement::DropTable(DropTableStatement {
                table_name: "persons".to_string(),
                if_exists: true,
            })
        );
    }

    #[test]
    fn test_parse_date_literal_and_negative_numbers() {
        let s = parse_select("SELECT -score, DATE '2021-01-11', 2 - -1");
        let exprs: Vec<String> = s
            .columns
            .iter()
            .map(|item| match item {
                SelectItem::Expr { expr, .. } => expr.to_string(),
                SelectItem::Wildcard => "*".to_string(),
            })
            .collect();
        assert_eq!(exprs, vec!["-score", "DATE '2021-01-11'", "2 - -1"]);

        let err = Parser::new("SELECT DATE '2021-02-30'")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
    }

    #[test]
    fn test_parse_integer_limits() {
        let s = parse_select("SELECT -9223372036854775808, 9223372036854775807, - -5");
        let exprs: Vec<&Expr> = s
            .columns
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr { expr, .. } => Some(expr),
                SelectItem::Wildcard => None,
            })
            .collect();
        assert_eq!(exprs[0], &Expr::Literal(Literal::Integer(i64::MIN)));
        assert_eq!(exprs[1], &Expr::Literal(Literal::Integer(i64::MAX)));
        assert_eq!(exprs[2], &Expr::Literal(Literal::Integer(5)));

        for sql in ["SELECT 9223372036854775808", "SELECT -9223372036854775809"] {
            let err = Parser::new(sql).unwrap().parse().unwrap_err();
            assert!(matches!(err, Error::ParseError(_)), "{}", sql);
        }
    }

    #[test]
    fn test_parse_errors() {
        let err = Parser::new("SELEC * FROM customers").unwrap().parse().unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));

        let err = Parser::new("SELECT * FROM").unwrap().parse().unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(_)));

        let err = Parser::new("SELECT 1 2").unwrap().parse().unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_statement() {
        assert!(matches!(parse("SELECT 1;"), Statement::Select(_)));

        let err = Parser::new("SELECT 1; DROP TABLE customers")
            .unwrap()
            .parse()
            .unwrap_err();
        match err {
            Error::UnexpectedToken { expected, found } => {
                assert_eq!(expected, "end of statement");
                assert_eq!(found, "DROP");
            }
            other => panic!("Expected UnexpectedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_all() {
        let statements = Parser::new("SELECT 1; DELETE FROM orders; TRUNCATE persons")
            .unwrap()
            .parse_all()
            .unwrap();
        assert_eq!(statements.len(), 3);
    }
}
