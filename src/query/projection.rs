//! Column projection policy shared by SELECT generation and row mapping.
//!
//! A column with a wired reference is projected as a pair: its raw value and the
//! referenced display value under the reference alias. Any other column is
//! projected when it is shown in the grid, is a key, or detail mode is on.

use crate::meta::{Column, Reference, Table};

/// How one column appears in a projection
#[derive(Debug, Clone, PartialEq)]
pub enum Projected<'a> {
    /// Raw value only
    Plain(&'a Column),
    /// Raw value plus the referenced display value named `alias`
    Pair {
        column: &'a Column,
        reference: &'a Reference,
        alias: String,
    },
}

impl Projected<'_> {
    #[must_use]
    pub fn column(&self) -> &Column {
        match self {
            Projected::Plain(column) | Projected::Pair { column, .. } => column,
        }
    }
}

/// Plain projection rule: grid-visible, key, or detail mode
#[must_use]
pub fn shows_plain(column: &Column, detail: bool) -> bool {
    column.show_in_grid || column.is_key || detail
}

/// Columns a SELECT projects, in declaration order
#[must_use]
pub fn select_projection(table: &Table, detail: bool) -> Vec<Projected<'_>> {
    table
        .columns
        .iter()
        .filter_map(|column| match column.wired_reference() {
            Some(reference) => Some(Projected::Pair {
                column,
                reference,
                alias: reference.column_alias(&column.name),
            }),
            None if shows_plain(column, detail) => Some(Projected::Plain(column)),
            None => None,
        })
        .collect()
}

/// Result names a SELECT is anticipated to produce, in order
#[must_use]
pub fn output_names(table: &Table, detail: bool) -> Vec<String> {
    let mut names = Vec::new();
    for projected in select_projection(table, detail) {
        names.push(projected.column().name.clone());
        if let Projected::Pair { alias, .. } = projected {
            names.push(alias);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id").key().auto_increment(),
                Column::new("login").in_grid(),
                Column::new("email"),
                Column::new("manager_id").references(Reference::new("users", "id", "login")),
                Column::new("team_id").references(Reference::new("teams", "", "name")),
            ],
        )
    }

    #[test]
    fn test_grid_projection() {
        assert_eq!(
            output_names(&users(), false),
            vec!["id", "login", "manager_id", "manager_login"]
        );
    }

    #[test]
    fn test_detail_projection_includes_everything() {
        assert_eq!(
            output_names(&users(), true),
            vec!["id", "login", "email", "manager_id", "manager_login", "team_id"]
        );
    }

    #[test]
    fn test_hidden_key_still_projected() {
        let table = Table::new("codes", vec![Column::new("code").key(), Column::new("label")]);
        assert_eq!(output_names(&table, false), vec!["code"]);
    }
}
