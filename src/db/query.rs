//! Statement builder over validated identifiers.
//!
//! Table and column names come only from [`Ident`]s resolved at mapping load;
//! every value is a numbered `?N` parameter.

use rusqlite::types::ToSql;

use crate::mapping::Ident;

/// Shared WHERE-clause accumulator.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Conditions {
    fn push_eq(&mut self, column: &Ident, value: Box<dyn ToSql>) {
        self.params.push(value);
        self.clauses
            .push(format!(" AND {} = ?{}", column.quoted(), self.params.len()));
    }

    fn push_in(&mut self, column: &Ident, values: &[String]) {
        if values.is_empty() {
            self.clauses.push(" AND 1 = 0".into());
            return;
        }
        let mut placeholders = Vec::with_capacity(values.len());
        for v in values {
            self.params.push(Box::new(v.clone()));
            placeholders.push(format!("?{}", self.params.len()));
        }
        self.clauses.push(format!(
            " AND {} IN ({})",
            column.quoted(),
            placeholders.join(", ")
        ));
    }

    fn sql_suffix(&self) -> String {
        format!(" WHERE 1 = 1{}", self.clauses.join(""))
    }

    fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// `SELECT <columns> FROM <table> WHERE ...`
pub struct SelectQuery {
    table: Ident,
    distinct: bool,
    columns: Vec<String>,
    conditions: Conditions,
}

impl SelectQuery {
    pub fn from(table: &Ident) -> Self {
        Self {
            table: table.clone(),
            distinct: false,
            columns: Vec::new(),
            conditions: Conditions::default(),
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn column(mut self, column: &Ident) -> Self {
        self.columns.push(column.quoted());
        self
    }

    pub fn columns<'a>(mut self, columns: impl IntoIterator<Item = &'a Ident>) -> Self {
        self.columns.extend(columns.into_iter().map(Ident::quoted));
        self
    }

    pub fn where_eq(mut self, column: &Ident, value: impl ToSql + 'static) -> Self {
        self.conditions.push_eq(column, Box::new(value));
        self
    }

    pub fn sql(&self) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        format!(
            "SELECT {}{} FROM {}{}",
            if self.distinct { "DISTINCT " } else { "" },
            columns,
            self.table.quoted(),
            self.conditions.sql_suffix()
        )
    }

    pub fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.conditions.param_refs()
    }
}

/// `DELETE FROM <table> WHERE ...`
pub struct DeleteQuery {
    table: Ident,
    conditions: Conditions,
}

impl DeleteQuery {
    pub fn from(table: &Ident) -> Self {
        Self {
            table: table.clone(),
            conditions: Conditions::default(),
        }
    }

    pub fn where_in(mut self, column: &Ident, values: &[String]) -> Self {
        self.conditions.push_in(column, values);
        self
    }

    pub fn sql(&self) -> String {
        format!(
            "DELETE FROM {}{}",
            self.table.quoted(),
            self.conditions.sql_suffix()
        )
    }

    pub fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.conditions.param_refs()
    }
}
