//! `QueryBuilder` backed by sea-query.
//!
//! Statements are assembled with sea-query's builders and rendered as plain SQL
//! text for the configured dialect. Bound values never pass through sea-query:
//! every parameter is a custom `@name` expression resolved by the database
//! adapter at execution time. Page limits are the only inlined literals.

use super::predicate::{self, Comparison};
use super::projection::{select_projection, Projected};
use super::{param_name, Params, QueryBuilder, QueryKind, Statement, PARAM_PREFIX};
use crate::error::ScaffoldError;
use crate::filter::{Filter, SortOrder};
use crate::meta::{Column, Table};
use sea_query::{
    Alias, BinOper, Expr, ExprTrait, JoinType, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SelectStatement, SqliteQueryBuilder,
};
use serde::{Deserialize, Serialize};

/// SQL dialect used to quote identifiers and render paging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    fn render<S: QueryStatementWriter>(self, statement: &S) -> String {
        match self {
            Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
            Dialect::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }
}

/// Placeholder names in first-use order
#[derive(Debug, Default)]
struct Placeholders(Vec<String>);

impl Placeholders {
    fn take(&mut self, key: &str) -> Expr {
        let name = param_name(key);
        if !self.0.contains(&name) {
            self.0.push(name.clone());
        }
        Expr::cust(name)
    }
}

/// Join alias for the referenced table of `column`
fn join_alias(column: &Column) -> String {
    format!("{}_ref", column.name)
}

fn qualified(table: &str, column: &str) -> Expr {
    Expr::col((Alias::new(table), Alias::new(column)))
}

fn require_keys(table: &Table, kind: QueryKind) -> Result<Vec<&Column>, ScaffoldError> {
    let keys = table.primary_keys();
    if keys.is_empty() {
        return Err(ScaffoldError::InvalidMetadata(format!(
            "table {} has no primary key; cannot build {}",
            table.name,
            kind.as_str()
        )));
    }
    Ok(keys)
}

/// Default query builder
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlQueryBuilder {
    dialect: Dialect,
}

impl SqlQueryBuilder {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn apply_predicates(
        select: &mut SelectStatement,
        table: &Table,
        filter: &Filter,
        placeholders: &mut Placeholders,
    ) -> Result<(), ScaffoldError> {
        for (key, value) in &filter.parameters {
            let predicate = predicate::resolve(table, key, value)?;
            let column = qualified(&table.name, &predicate.column.name);
            let condition = match predicate.comparison {
                Comparison::Eq => column.eq(placeholders.take(predicate.parameter)),
                Comparison::IsNull => column.is_null(),
                Comparison::Gte => column.gte(placeholders.take(predicate.parameter)),
                Comparison::Lte => column.lte(placeholders.take(predicate.parameter)),
                Comparison::Like => {
                    column.binary(BinOper::Like, placeholders.take(predicate.parameter))
                }
            };
            select.and_where(condition);
        }
        Ok(())
    }

    fn build_select(
        &self,
        table: &Table,
        filter: Option<&Filter>,
    ) -> Result<Statement, ScaffoldError> {
        let detail = filter.is_some_and(|f| f.detail_mode);
        let projection = select_projection(table, detail);
        if projection.is_empty() {
            return Err(ScaffoldError::InvalidMetadata(format!(
                "table {} has no projectable columns",
                table.name
            )));
        }

        let mut placeholders = Placeholders::default();
        let mut select = Query::select();
        select.from(Alias::new(table.name.as_str()));

        for projected in projection {
            match projected {
                Projected::Plain(column) => {
                    select.column((Alias::new(table.name.as_str()), Alias::new(column.name.as_str())));
                }
                Projected::Pair {
                    column,
                    reference,
                    alias,
                } => {
                    let join = join_alias(column);
                    select.column((Alias::new(table.name.as_str()), Alias::new(column.name.as_str())));
                    select.expr_as(
                        qualified(&join, &reference.display_column),
                        Alias::new(alias),
                    );
                    select.join_as(
                        JoinType::LeftJoin,
                        Alias::new(reference.table.as_str()),
                        Alias::new(join.as_str()),
                        qualified(&table.name, &column.name).equals((
                            Alias::new(join.as_str()),
                            Alias::new(reference.key_column.as_str()),
                        )),
                    );
                }
            }
        }

        if let Some(filter) = filter {
            Self::apply_predicates(&mut select, table, filter, &mut placeholders)?;
        }

        let sort = filter.and_then(|f| f.sort.as_ref());
        if let Some(sort) = sort {
            let column = table.column(&sort.column).ok_or_else(|| {
                ScaffoldError::UnknownParameter(format!(
                    "sort column {} is not a column of table {}",
                    sort.column, table.name
                ))
            })?;
            let order = match sort.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            select.order_by(
                (Alias::new(table.name.as_str()), Alias::new(column.name.as_str())),
                order,
            );
        }
        for key in table.primary_keys() {
            if sort.is_some_and(|s| s.column == key.name) {
                continue;
            }
            select.order_by(
                (Alias::new(table.name.as_str()), Alias::new(key.name.as_str())),
                Order::Asc,
            );
        }

        if let Some((limit, offset)) = filter.and_then(Filter::page_window) {
            select.limit(limit).offset(offset);
        }

        Ok(Statement::new(self.dialect.render(&select), placeholders.0))
    }

    fn build_insert(&self, table: &Table) -> Result<Statement, ScaffoldError> {
        let columns: Vec<&Column> = table.columns.iter().filter(|c| c.is_insertable()).collect();
        let mut placeholders = Placeholders::default();
        let mut insert = Query::insert();
        insert.into_table(Alias::new(table.name.as_str()));

        if columns.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(columns.iter().map(|c| Alias::new(c.name.as_str())));
            let values: Vec<Expr> = columns.iter().map(|c| placeholders.take(&c.name)).collect();
            insert.values(values).map_err(|e| {
                ScaffoldError::InvalidMetadata(format!("insert into {}: {e}", table.name))
            })?;
        }
        insert.returning_all();

        Ok(Statement::new(self.dialect.render(&insert), placeholders.0))
    }

    fn build_update(
        &self,
        table: &Table,
        params: Option<&Params>,
    ) -> Result<Statement, ScaffoldError> {
        let keys = require_keys(table, QueryKind::Update)?;

        let assigned: Vec<&Column> = match params {
            Some(params) => {
                let mut present = Vec::with_capacity(params.len());
                for key in params.keys() {
                    let name = key.strip_prefix(PARAM_PREFIX).unwrap_or(key);
                    let column = table.column_ignore_case(name).ok_or_else(|| {
                        ScaffoldError::UnknownParameter(format!(
                            "{name} is not a column of table {}",
                            table.name
                        ))
                    })?;
                    present.push(column.name.as_str());
                }
                table
                    .columns
                    .iter()
                    .filter(|c| c.is_updatable() && present.contains(&c.name.as_str()))
                    .collect()
            }
            None => table.columns.iter().filter(|c| c.is_updatable()).collect(),
        };
        if assigned.is_empty() {
            return Err(ScaffoldError::InvalidMetadata(format!(
                "update of {} has no updatable columns to set",
                table.name
            )));
        }

        let mut placeholders = Placeholders::default();
        let mut update = Query::update();
        update.table(Alias::new(table.name.as_str()));
        for column in assigned {
            update.value(Alias::new(column.name.as_str()), placeholders.take(&column.name));
        }
        for key in keys {
            update.and_where(Expr::col(Alias::new(key.name.as_str())).eq(placeholders.take(&key.name)));
        }
        update.returning_all();

        Ok(Statement::new(self.dialect.render(&update), placeholders.0))
    }

    fn build_delete(&self, table: &Table) -> Result<Statement, ScaffoldError> {
        let keys = require_keys(table, QueryKind::Delete)?;

        let mut placeholders = Placeholders::default();
        let mut delete = Query::delete();
        delete.from_table(Alias::new(table.name.as_str()));
        for key in keys {
            delete.and_where(Expr::col(Alias::new(key.name.as_str())).eq(placeholders.take(&key.name)));
        }
        delete.returning_all();

        Ok(Statement::new(self.dialect.render(&delete), placeholders.0))
    }
}

impl QueryBuilder for SqlQueryBuilder {
    fn build(
        &self,
        kind: QueryKind,
        table: &Table,
        filter: Option<&Filter>,
        params: Option<&Params>,
    ) -> Result<Statement, ScaffoldError> {
        match kind {
            QueryKind::Select => self.build_select(table, filter),
            QueryKind::Insert => self.build_insert(table),
            QueryKind::Update => self.build_update(table, params),
            QueryKind::Delete => self.build_delete(table),
        }
    }

    fn build_record_count_query(
        &self,
        table: &Table,
        filter: &Filter,
    ) -> Result<Statement, ScaffoldError> {
        let mut placeholders = Placeholders::default();
        let mut select = Query::select();
        select
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
            .from(Alias::new(table.name.as_str()));
        Self::apply_predicates(&mut select, table, filter, &mut placeholders)?;

        Ok(Statement::new(self.dialect.render(&select), placeholders.0))
    }
}
