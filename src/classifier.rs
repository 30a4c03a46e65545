//! Statement classification
//!
//! Decides whether a buffered batch is executed on the row-fetch path or on
//! the affected-rows path. Parsing is delegated to sqlparser. Statements no
//! dialect accepts (TiDB extensions such as `ADMIN` or `SET GLOBAL`) are
//! classified by their leading keyword; only text whose leading keyword is
//! unknown is rejected before anything reaches the server.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect};
use sqlparser::parser::{Parser, ParserError};

use crate::error::{CLIError, Result};

/// Execution-relevant kind of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementCategory {
    /// Row-producing (SELECT, SHOW, DESCRIBE and anything unlisted)
    Query,
    /// INSERT / UPDATE / DELETE
    Mutation,
    /// Schema and privilege changes
    Ddl,
    /// Transaction control
    Transaction,
    /// Session state: USE and SET
    Session,
    /// Server administration: FLUSH, KILL and table locks
    Admin,
}

impl StatementCategory {
    /// Whether the statement is executed on the row-fetch path
    pub fn is_query(self) -> bool {
        matches!(self, StatementCategory::Query)
    }
}

/// Classify a (possibly multi-statement) batch.
///
/// The batch is non-query as soon as one of its statements is; the category
/// of the first such statement is reported.
pub fn classify(sql: &str) -> Result<StatementCategory> {
    let categories = match parse_sql(sql) {
        Ok(statements) => statements.iter().map(category_of).collect::<Vec<_>>(),
        Err(_) => split_statements(sql)
            .into_iter()
            .map(classify_single)
            .collect::<Result<Vec<_>>>()?,
    };
    if categories.is_empty() {
        return Err(CLIError::ParseError("no statement to execute".into()));
    }

    Ok(categories
        .into_iter()
        .find(|category| !category.is_query())
        .unwrap_or(StatementCategory::Query))
}

fn classify_single(sql: &str) -> Result<StatementCategory> {
    let parse_error = match parse_sql(sql) {
        Ok(statements) => {
            return Ok(statements
                .iter()
                .map(category_of)
                .find(|category| !category.is_query())
                .unwrap_or(StatementCategory::Query))
        }
        Err(e) => e,
    };

    let keyword = leading_keyword(sql).to_ascii_uppercase();
    match keyword.as_str() {
        "SET" | "USE" => Ok(StatementCategory::Session),
        "CREATE" | "DROP" | "ALTER" | "RENAME" | "TRUNCATE" | "GRANT" | "REVOKE" | "ADMIN" => {
            Ok(StatementCategory::Ddl)
        }
        "BEGIN" | "START" | "COMMIT" | "ROLLBACK" => Ok(StatementCategory::Transaction),
        "INSERT" | "REPLACE" | "UPDATE" | "DELETE" | "LOAD" => Ok(StatementCategory::Mutation),
        _ => Err(parse_error),
    }
}

/// Parse with the MySQL dialect, falling back to the generic dialect.
fn parse_sql(sql: &str) -> Result<Vec<Statement>> {
    if let Ok(statements) = try_parse_with_dialect(sql, &MySqlDialect {}) {
        return Ok(statements);
    }

    try_parse_with_dialect(sql, &GenericDialect {})
        .map_err(|e| CLIError::ParseError(e.to_string()))
}

fn try_parse_with_dialect(
    sql: &str,
    dialect: &dyn Dialect,
) -> std::result::Result<Vec<Statement>, ParserError> {
    Parser::parse_sql(dialect, sql)
}

/// Split a batch on `;` outside quotes and comments, dropping empty pieces
fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' && quote != b'`' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line(bytes, i),
            b'#' => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block(bytes, i),
            b';' => {
                pieces.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(&sql[start..]);

    pieces
        .into_iter()
        .filter(|piece| !leading_keyword(piece).is_empty())
        .collect()
}

/// First word of a statement, after whitespace and comments
fn leading_keyword(sql: &str) -> &str {
    let bytes = sql.as_bytes();
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            Some(b'-') if bytes.get(i + 1) == Some(&b'-') => i = skip_line(bytes, i) + 1,
            Some(b'#') => i = skip_line(bytes, i) + 1,
            Some(b'/') if bytes.get(i + 1) == Some(&b'*') => i = skip_block(bytes, i) + 1,
            _ => break,
        }
    }

    let start = i.min(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_alphabetic())
        .map_or(bytes.len(), |len| start + len);
    &sql[start..end]
}

/// Index of the newline ending the comment at `i`, or the last index
fn skip_line(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |len| i + len)
}

/// Index of the `/` closing the block comment at `i`, or the last index
fn skip_block(bytes: &[u8], i: usize) -> usize {
    bytes[i + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |len| i + 2 + len + 1)
}

fn category_of(statement: &Statement) -> StatementCategory {
    match statement {
        Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. } => {
            StatementCategory::Mutation
        }

        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateFunction { .. }
        | Statement::AlterTable { .. }
        | Statement::AlterView { .. }
        | Statement::AlterIndex { .. }
        | Statement::Drop { .. }
        | Statement::DropFunction { .. }
        | Statement::Truncate { .. }
        | Statement::Grant { .. }
        | Statement::Revoke { .. } => StatementCategory::Ddl,

        Statement::Flush { .. }
        | Statement::Kill { .. }
        | Statement::LockTables { .. }
        | Statement::UnlockTables => StatementCategory::Admin,

        Statement::StartTransaction { .. }
        | Statement::Commit { .. }
        | Statement::Rollback { .. }
        | Statement::Savepoint { .. }
        | Statement::ReleaseSavepoint { .. }
        | Statement::SetTransaction { .. } => StatementCategory::Transaction,

        Statement::Use { .. }
        | Statement::SetVariable { .. }
        | Statement::SetNames { .. }
        | Statement::SetNamesDefault { .. }
        | Statement::SetTimeZone { .. }
        | Statement::SetRole { .. } => StatementCategory::Session,

        _ => StatementCategory::Query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_show_are_queries() {
        assert_eq!(classify("SELECT 1;").unwrap(), StatementCategory::Query);
        assert_eq!(classify("SHOW TABLES").unwrap(), StatementCategory::Query);
    }

    #[test]
    fn test_mutations() {
        for sql in [
            "INSERT INTO t (a) VALUES (1)",
            "UPDATE t SET x = 1 WHERE id = 999",
            "DELETE FROM t WHERE id = 1",
        ] {
            assert_eq!(classify(sql).unwrap(), StatementCategory::Mutation, "{}", sql);
        }
    }

    #[test]
    fn test_non_query_statements_skip_row_fetch() {
        for sql in [
            "CREATE TABLE t (id INT PRIMARY KEY)",
            "DROP TABLE t",
            "BEGIN",
            "COMMIT",
            "ROLLBACK",
            "USE test",
            "SET autocommit = 1",
        ] {
            let category = classify(sql).unwrap();
            assert!(!category.is_query(), "{} classified as {:?}", sql, category);
        }
    }

    #[test]
    fn test_use_and_set_are_session_statements() {
        assert_eq!(classify("USE test").unwrap(), StatementCategory::Session);
        assert_eq!(classify("SET @a = 1").unwrap(), StatementCategory::Session);
    }

    #[test]
    fn test_batch_with_any_mutation_is_non_query() {
        let category = classify("SELECT 1; INSERT INTO t VALUES (1);").unwrap();
        assert_eq!(category, StatementCategory::Mutation);
    }

    #[test]
    fn test_tidb_statements_outside_the_grammar_use_leading_keyword() {
        let cases = [
            ("SET GLOBAL tidb_mem_quota_query = 1;", StatementCategory::Session),
            ("CREATE USER 'u'@'%' IDENTIFIED BY 'p';", StatementCategory::Ddl),
            ("DROP USER 'u'@'%';", StatementCategory::Ddl),
            ("RENAME TABLE a TO b;", StatementCategory::Ddl),
            ("ADMIN SHOW DDL JOBS;", StatementCategory::Ddl),
            (
                "LOAD DATA LOCAL INFILE '/tmp/t.csv' INTO TABLE t FIELDS TERMINATED BY ',';",
                StatementCategory::Mutation,
            ),
            ("/* hint */ -- note\n  admin check table t;", StatementCategory::Ddl),
        ];
        for (sql, expected) in cases {
            assert_eq!(classify(sql).unwrap(), expected, "{}", sql);
        }
    }

    #[test]
    fn test_server_administration_is_non_query() {
        for sql in ["FLUSH PRIVILEGES;", "KILL 12;", "LOCK TABLES t WRITE;", "UNLOCK TABLES;"] {
            let category = classify(sql).unwrap();
            assert!(!category.is_query(), "{} classified as {:?}", sql, category);
        }
    }

    #[test]
    fn test_mixed_batch_falls_back_per_statement() {
        let category = classify("SELECT 1; SET GLOBAL tidb_mem_quota_query = 1;").unwrap();
        assert_eq!(category, StatementCategory::Session);

        let category = classify("SELECT ';' AS s; ADMIN SHOW DDL;").unwrap();
        assert_eq!(category, StatementCategory::Ddl);
    }

    #[test]
    fn test_unknown_keyword_in_batch_is_rejected() {
        let err = classify("ADMIN SHOW DDL; FROBNICATE t;").unwrap_err();
        assert!(matches!(err, CLIError::ParseError(_)));
    }

    #[test]
    fn test_parse_failure() {
        let err = classify("SELEC 1 FROM").unwrap_err();
        assert!(matches!(err, CLIError::ParseError(_)));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(matches!(classify(";"), Err(CLIError::ParseError(_))));
    }
}
