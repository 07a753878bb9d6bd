//! SQL tokenizer
//!
//! Hand-written lexer + matcher turning one `;`-terminated statement of the
//! engine's small SQL dialect into a [`Statement`]. Anything that does not
//! match an operation shape is a syntax error, raised before the engine
//! touches the catalog.
//!
//! ## Dialect
//!
//! ```text
//! create table T (col kind [unique], ..., primary key(col));
//! drop table T;
//! create index I on T (col);
//! drop index I;
//! insert into T values (lit, ...);
//! select *|col,... from T [where col op lit [and ...]];
//! delete from T [where ...];
//! ```
//!
//! Keywords are case-insensitive; literal values are passed through in
//! their raw text form for the codec to coerce.

use crate::error::{DbError, Result};
use crate::statement::{CompareOp, Condition, Projection, Statement};
use crate::types::{ColumnDef, ColumnKind};

/// Parse one `;`-terminated statement
pub fn parse(input: &str) -> Result<Statement> {
    let tokens = lex(input)?;
    Parser { tokens, pos: 0 }.statement()
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Bare word: keyword, identifier, or numeric literal
    Word(String),

    /// Quoted string literal, quotes preserved
    Quoted(String),

    /// Comparison operator
    Cmp(String),

    LParen,
    RParen,
    Comma,
    Star,
    Semi,
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '\'' => {
                chars.next();
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => inner.push(c),
                        None => {
                            return Err(DbError::Syntax(
                                "Unterminated string literal".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Quoted(format!("'{}'", inner)));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Cmp("<>".to_string()));
                    }
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Cmp("<=".to_string()));
                    }
                    _ => tokens.push(Token::Cmp("<".to_string())),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(">=".to_string()));
                } else {
                    tokens.push(Token::Cmp(">".to_string()));
                }
            }
            '=' => {
                chars.next();
                tokens.push(Token::Cmp("=".to_string()));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "(),*;<>='".contains(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                if word.is_empty() {
                    return Err(DbError::Syntax(format!("Unexpected character '{}'", c)));
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn statement(&mut self) -> Result<Statement> {
        let statement = if self.accept_keyword("create") {
            if self.accept_keyword("table") {
                self.create_table()?
            } else if self.accept_keyword("index") {
                self.create_index()?
            } else {
                return Err(self.unexpected("'table' or 'index'"));
            }
        } else if self.accept_keyword("drop") {
            if self.accept_keyword("table") {
                Statement::DropTable {
                    table: self.ident()?,
                }
            } else if self.accept_keyword("index") {
                Statement::DropIndex {
                    index: self.ident()?,
                }
            } else {
                return Err(self.unexpected("'table' or 'index'"));
            }
        } else if self.accept_keyword("insert") {
            self.insert()?
        } else if self.accept_keyword("select") {
            self.select()?
        } else if self.accept_keyword("delete") {
            self.delete()?
        } else {
            return Err(self.unexpected("a statement keyword"));
        };

        self.expect(&Token::Semi, "';'")?;
        if self.pos != self.tokens.len() {
            return Err(DbError::Syntax("Trailing input after ';'".to_string()));
        }
        Ok(statement)
    }

    fn create_table(&mut self) -> Result<Statement> {
        let table = self.ident()?;
        self.expect(&Token::LParen, "'('")?;
        let mut schemas = Vec::new();
        loop {
            if self.accept_keyword("primary") {
                if !self.accept_keyword("key") {
                    return Err(self.unexpected("'key'"));
                }
                self.expect(&Token::LParen, "'('")?;
                let column = self.ident()?;
                self.expect(&Token::RParen, "')'")?;
                schemas.push(ColumnDef::primary_key(column));
            } else {
                let name = self.ident()?;
                let kind = self.column_kind()?;
                let mut def = ColumnDef::new(name, kind);
                if self.accept_keyword("unique") {
                    def = def.unique();
                }
                schemas.push(def);
            }
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(Statement::CreateTable { table, schemas })
    }

    fn column_kind(&mut self) -> Result<ColumnKind> {
        let word = self.ident()?;
        match word.to_ascii_lowercase().as_str() {
            "int" => Ok(ColumnKind::Int),
            "float" => Ok(ColumnKind::Float),
            "char" => {
                self.expect(&Token::LParen, "'('")?;
                let length = self.ident()?;
                let length: usize = length
                    .parse()
                    .map_err(|_| DbError::Syntax(format!("Bad char length '{}'", length)))?;
                self.expect(&Token::RParen, "')'")?;
                Ok(ColumnKind::Char(length))
            }
            other => Err(DbError::Syntax(format!("Unknown column type '{}'", other))),
        }
    }

    fn create_index(&mut self) -> Result<Statement> {
        let index = self.ident()?;
        if !self.accept_keyword("on") {
            return Err(self.unexpected("'on'"));
        }
        let table = self.ident()?;
        self.expect(&Token::LParen, "'('")?;
        let column = self.ident()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(Statement::CreateIndex {
            table,
            index,
            column,
        })
    }

    fn insert(&mut self) -> Result<Statement> {
        if !self.accept_keyword("into") {
            return Err(self.unexpected("'into'"));
        }
        let table = self.ident()?;
        if !self.accept_keyword("values") {
            return Err(self.unexpected("'values'"));
        }
        self.expect(&Token::LParen, "'('")?;
        let mut values = Vec::new();
        loop {
            values.push(self.literal()?);
            if !self.accept(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(Statement::Insert { table, values })
    }

    fn select(&mut self) -> Result<Statement> {
        let columns = if self.accept(&Token::Star) {
            Projection::All
        } else {
            let mut columns = vec![self.ident()?];
            while self.accept(&Token::Comma) {
                columns.push(self.ident()?);
            }
            Projection::Columns(columns)
        };
        if !self.accept_keyword("from") {
            return Err(self.unexpected("'from'"));
        }
        let table = self.ident()?;
        let conditions = self.where_clause()?;
        Ok(Statement::Select {
            table,
            columns,
            conditions,
        })
    }

    fn delete(&mut self) -> Result<Statement> {
        if !self.accept_keyword("from") {
            return Err(self.unexpected("'from'"));
        }
        let table = self.ident()?;
        let conditions = self.where_clause()?;
        Ok(Statement::Delete { table, conditions })
    }

    fn where_clause(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = Vec::new();
        if !self.accept_keyword("where") {
            return Ok(conditions);
        }
        loop {
            let column = self.ident()?;
            let op = match self.next() {
                Some(Token::Cmp(op)) => CompareOp::parse(op)
                    .ok_or_else(|| DbError::Syntax(format!("Unknown operator '{}'", op)))?,
                _ => return Err(self.unexpected("a comparison operator")),
            };
            let literal = self.literal()?;
            conditions.push(Condition {
                column,
                op,
                literal,
            });
            if !self.accept_keyword("and") {
                break;
            }
        }
        Ok(conditions)
    }

    // -------------------------------------------------------------------------
    // Token Helpers
    // -------------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn accept_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token, describe: &str) -> Result<()> {
        if self.accept(token) {
            Ok(())
        } else {
            Err(self.unexpected(describe))
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w.clone()),
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// A literal in raw text form (quotes preserved on strings)
    fn literal(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w.clone()),
            Some(Token::Quoted(q)) => Ok(q.clone()),
            _ => Err(self.unexpected("a literal")),
        }
    }

    fn unexpected(&self, expected: &str) -> DbError {
        match self.tokens.get(self.pos.min(self.tokens.len().saturating_sub(1))) {
            Some(token) => DbError::Syntax(format!("Expected {}, found {:?}", expected, token)),
            None => DbError::Syntax(format!("Expected {}, found end of input", expected)),
        }
    }
}
