//! Destination schema and the ordered constraint plan.
//!
//! Tables are first loaded as all-TEXT staging tables. Once every table is
//! present the plan retypes columns, then promotes each dimension key through
//! NOT NULL, UNIQUE and PRIMARY KEY, and only then declares the fact table's
//! foreign keys.

use crate::domain::{Card, DateTimeEntry, NaturalKey, Order, Product, Store, User};
use crate::entity::EntityKind;
use crate::table::{ColumnDef, SqlType, TableRow};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A fact column referencing a dimension's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: EntityKind,
}

const ORDER_FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey {
        column: "date_uuid",
        references: EntityKind::DateTimes,
    },
    ForeignKey {
        column: "user_uuid",
        references: EntityKind::Users,
    },
    ForeignKey {
        column: "card_number",
        references: EntityKind::Cards,
    },
    ForeignKey {
        column: "store_code",
        references: EntityKind::Stores,
    },
    ForeignKey {
        column: "product_code",
        references: EntityKind::Products,
    },
];

/// Declared shape of one destination table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub entity: EntityKind,
    pub columns: &'static [ColumnDef],
    pub primary_key: Option<&'static str>,
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    pub fn table(&self) -> &'static str {
        self.entity.table_name()
    }
}

fn schema_of<T: TableRow + NaturalKey>(entity: EntityKind) -> TableSchema {
    TableSchema {
        entity,
        columns: T::COLUMNS,
        primary_key: T::KEY_COLUMN,
        foreign_keys: if entity == EntityKind::Orders {
            ORDER_FOREIGN_KEYS
        } else {
            &[]
        },
    }
}

pub fn table_schema(kind: EntityKind) -> TableSchema {
    match kind {
        EntityKind::Users => schema_of::<User>(kind),
        EntityKind::Cards => schema_of::<Card>(kind),
        EntityKind::Stores => schema_of::<Store>(kind),
        EntityKind::Products => schema_of::<Product>(kind),
        EntityKind::DateTimes => schema_of::<DateTimeEntry>(kind),
        EntityKind::Orders => schema_of::<Order>(kind),
    }
}

/// One DDL statement of the constraint plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConstraintStep {
    SetType {
        table: &'static str,
        column: &'static str,
        sql_type: SqlType,
    },
    SetNotNull {
        table: &'static str,
        column: &'static str,
    },
    AddUnique {
        table: &'static str,
        column: &'static str,
    },
    AddPrimaryKey {
        table: &'static str,
        column: &'static str,
    },
    AddForeignKey {
        table: &'static str,
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
    },
}

impl ConstraintStep {
    pub fn table(&self) -> &'static str {
        match self {
            ConstraintStep::SetType { table, .. }
            | ConstraintStep::SetNotNull { table, .. }
            | ConstraintStep::AddUnique { table, .. }
            | ConstraintStep::AddPrimaryKey { table, .. }
            | ConstraintStep::AddForeignKey { table, .. } => table,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ConstraintStep::SetType { column, .. }
            | ConstraintStep::SetNotNull { column, .. }
            | ConstraintStep::AddUnique { column, .. }
            | ConstraintStep::AddPrimaryKey { column, .. }
            | ConstraintStep::AddForeignKey { column, .. } => column,
        }
    }

    /// Constraint name used in the DDL, if the step creates one.
    pub fn constraint_name(&self) -> Option<String> {
        match self {
            ConstraintStep::AddUnique { table, column } => Some(format!("uq_{table}_{column}")),
            ConstraintStep::AddPrimaryKey { table, .. } => Some(format!("pk_{table}")),
            ConstraintStep::AddForeignKey { table, column, .. } => {
                Some(format!("fk_{table}_{column}"))
            }
            _ => None,
        }
    }

    /// PostgreSQL DDL. `fitted` bounds a `FittedVarchar` retype; pass the
    /// observed maximum length of the column.
    pub fn to_sql(&self, fitted: Option<usize>) -> String {
        let name = self.constraint_name().unwrap_or_default();
        match self {
            ConstraintStep::SetType {
                table,
                column,
                sql_type,
            } => {
                let ty = sql_type.ddl(fitted);
                let col = quote_ident(column);
                format!(
                    "ALTER TABLE {} ALTER COLUMN {col} TYPE {ty} USING {col}::{ty}",
                    quote_ident(table)
                )
            }
            ConstraintStep::SetNotNull { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
                quote_ident(table),
                quote_ident(column)
            ),
            ConstraintStep::AddUnique { table, column } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                quote_ident(table),
                quote_ident(&name),
                quote_ident(column)
            ),
            ConstraintStep::AddPrimaryKey { table, column } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(table),
                quote_ident(&name),
                quote_ident(column)
            ),
            ConstraintStep::AddForeignKey {
                table,
                column,
                references_table,
                references_column,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(table),
                quote_ident(&name),
                quote_ident(column),
                quote_ident(references_table),
                quote_ident(references_column)
            ),
        }
    }
}

impl fmt::Display for ConstraintStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(None))
    }
}

fn type_steps(schema: &TableSchema, plan: &mut Vec<ConstraintStep>) {
    for col in schema.columns.iter().filter(|c| c.sql_type.needs_cast()) {
        plan.push(ConstraintStep::SetType {
            table: schema.table(),
            column: col.name,
            sql_type: col.sql_type,
        });
    }
}

/// The full plan: dimension types and keys first, then fact types, then foreign keys.
pub fn constraint_plan() -> Vec<ConstraintStep> {
    let mut plan = Vec::new();

    for kind in EntityKind::DIMENSIONS {
        let schema = table_schema(kind);
        type_steps(&schema, &mut plan);
        if let Some(key) = schema.primary_key {
            let table = schema.table();
            plan.push(ConstraintStep::SetNotNull { table, column: key });
            plan.push(ConstraintStep::AddUnique { table, column: key });
            plan.push(ConstraintStep::AddPrimaryKey { table, column: key });
        }
    }

    let facts = table_schema(EntityKind::Orders);
    type_steps(&facts, &mut plan);
    for fk in facts.foreign_keys {
        let target = table_schema(fk.references);
        // Every dimension has a key; a missing one would be a schema bug caught by tests.
        if let Some(references_column) = target.primary_key {
            plan.push(ConstraintStep::AddForeignKey {
                table: facts.table(),
                column: fk.column,
                references_table: target.table(),
                references_column,
            });
        }
    }

    plan
}

/// Number of steps per table, for logging.
pub fn plan_summary(plan: &[ConstraintStep]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for step in plan {
        *counts.entry(step.table()).or_insert(0) += 1;
    }
    counts
}

/// Double-quoted SQL identifier with embedded quotes doubled.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(plan: &[ConstraintStep], pred: impl Fn(&ConstraintStep) -> bool) -> usize {
        plan.iter().position(pred).expect("step present")
    }

    #[test]
    fn keys_promote_before_any_foreign_key() {
        let plan = constraint_plan();
        let first_fk = position(&plan, |s| matches!(s, ConstraintStep::AddForeignKey { .. }));
        for kind in EntityKind::DIMENSIONS {
            let table = kind.table_name();
            let nn = position(&plan, |s| matches!(s, ConstraintStep::SetNotNull { table: t, .. } if *t == table));
            let uq = position(&plan, |s| matches!(s, ConstraintStep::AddUnique { table: t, .. } if *t == table));
            let pk = position(&plan, |s| matches!(s, ConstraintStep::AddPrimaryKey { table: t, .. } if *t == table));
            assert!(nn < uq && uq < pk && pk < first_fk, "{table}");
        }
    }

    #[test]
    fn five_foreign_keys_all_last() {
        let plan = constraint_plan();
        let fks: Vec<_> = plan
            .iter()
            .filter(|s| matches!(s, ConstraintStep::AddForeignKey { .. }))
            .collect();
        assert_eq!(fks.len(), 5);
        assert!(plan[plan.len() - 5..]
            .iter()
            .all(|s| matches!(s, ConstraintStep::AddForeignKey { .. })));
    }

    #[test]
    fn primary_keys_match_natural_keys() {
        assert_eq!(table_schema(EntityKind::Users).primary_key, Some("user_uuid"));
        assert_eq!(table_schema(EntityKind::Cards).primary_key, Some("card_number"));
        assert_eq!(table_schema(EntityKind::Stores).primary_key, Some("store_code"));
        assert_eq!(table_schema(EntityKind::Products).primary_key, Some("product_code"));
        assert_eq!(table_schema(EntityKind::DateTimes).primary_key, Some("date_uuid"));
        assert_eq!(table_schema(EntityKind::Orders).primary_key, None);
    }

    fn sql_type_of(schema: &TableSchema, name: &str) -> Option<SqlType> {
        schema.columns.iter().find(|c| c.name == name).map(|c| c.sql_type)
    }

    #[test]
    fn foreign_key_columns_exist_on_both_sides() {
        let orders = table_schema(EntityKind::Orders);
        for fk in orders.foreign_keys {
            let target = table_schema(fk.references);
            assert_eq!(target.primary_key, Some(fk.column));
            let a = sql_type_of(&orders, fk.column).unwrap();
            let b = sql_type_of(&target, fk.column).unwrap();
            assert_eq!(a, b, "{} type mismatch", fk.column);
        }
    }

    #[test]
    fn sql_rendering() {
        let retype = ConstraintStep::SetType {
            table: "dim_products",
            column: "EAN",
            sql_type: SqlType::FittedVarchar,
        };
        assert_eq!(
            retype.to_sql(Some(17)),
            r#"ALTER TABLE "dim_products" ALTER COLUMN "EAN" TYPE VARCHAR(17) USING "EAN"::VARCHAR(17)"#
        );
        let fk = ConstraintStep::AddForeignKey {
            table: "orders_table",
            column: "store_code",
            references_table: "dim_store_details",
            references_column: "store_code",
        };
        assert_eq!(
            fk.to_sql(None),
            r#"ALTER TABLE "orders_table" ADD CONSTRAINT "fk_orders_table_store_code" FOREIGN KEY ("store_code") REFERENCES "dim_store_details" ("store_code")"#
        );
    }

    #[test]
    fn untyped_columns_stay_text() {
        let plan = constraint_plan();
        assert!(!plan.iter().any(|s| matches!(
            s,
            ConstraintStep::SetType { table: "dim_users", column: "company", .. }
        )));
    }
}
