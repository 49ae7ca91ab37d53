//! SQL issued by the trigger installer.

use crate::error::ListenerError;

/// Channel every attached table publishes on.
pub const CHANNEL_NAME: &str = "pgevents_event";

/// Name of the trigger procedure installed at open time.
pub const PROCEDURE_NAME: &str = "pgevents_notify_event";

/// Suffix appended to the relation name to form the trigger name.
pub const TRIGGER_SUFFIX: &str = "_events";

/// The trigger procedure, replaced on every open.
pub fn procedure() -> String {
    format!(
        r#"
CREATE OR REPLACE FUNCTION {PROCEDURE_NAME}() RETURNS TRIGGER AS $$
DECLARE
    data json;
    notification json;
BEGIN
    IF (TG_OP = 'DELETE') THEN
        data = row_to_json(OLD);
    ELSE
        data = row_to_json(NEW);
    END IF;

    notification = json_build_object(
        'table', TG_TABLE_NAME,
        'action', TG_OP,
        'data', data::text);

    PERFORM pg_notify('{CHANNEL_NAME}', notification::text);

    RETURN NULL;
END;
$$ LANGUAGE plpgsql;
"#
    )
}

/// A validated `table` or `schema.table` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    relation: String,
}

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, ListenerError> {
        let invalid = |reason| ListenerError::InvalidTableName(raw.to_owned(), reason);

        if raw.contains('\0') {
            return Err(invalid("contains a NUL byte"));
        }

        let (schema, relation) = match raw.split_once('.') {
            Some((schema, relation)) => (Some(schema), relation),
            None => (None, raw),
        };

        if relation.contains('.') {
            return Err(invalid("expected `table` or `schema.table`"));
        }
        if relation.is_empty() || schema.is_some_and(str::is_empty) {
            return Err(invalid("empty identifier"));
        }

        Ok(Self {
            schema: schema.map(str::to_owned),
            relation: relation.to_owned(),
        })
    }

    /// The unqualified table name, as reported by `TG_TABLE_NAME`.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn trigger_name(&self) -> String {
        format!("{}{TRIGGER_SUFFIX}", self.relation)
    }

    /// Quoted, possibly schema-qualified reference usable in DDL.
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.relation)),
            None => quote_ident(&self.relation),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.relation),
            None => write!(f, "{}", self.relation),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Statements that (re)attach the notify trigger to `table`.
///
/// Meant to run inside a single transaction so the table is never left
/// without its trigger.
pub fn attach_statements(table: &TableName) -> [String; 2] {
    let trigger = quote_ident(&table.trigger_name());
    let target = table.qualified();
    [
        format!("DROP TRIGGER IF EXISTS {trigger} ON {target}"),
        format!(
            "CREATE TRIGGER {trigger} \
             AFTER INSERT OR UPDATE OR DELETE ON {target} \
             FOR EACH ROW EXECUTE PROCEDURE {PROCEDURE_NAME}()"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_publishes_on_fixed_channel() {
        let sql = procedure();
        assert!(sql.contains("CREATE OR REPLACE FUNCTION pgevents_notify_event()"));
        assert!(sql.contains("pg_notify('pgevents_event', notification::text)"));
        assert!(sql.contains("row_to_json(OLD)"));
        assert!(sql.contains("'data', data::text"));
    }

    #[test]
    fn test_attach_statements_drop_then_create() {
        let table = TableName::parse("orders").unwrap();
        let [drop, create] = attach_statements(&table);
        assert_eq!(drop, r#"DROP TRIGGER IF EXISTS "orders_events" ON "orders""#);
        assert!(create.starts_with(r#"CREATE TRIGGER "orders_events" AFTER INSERT OR UPDATE OR DELETE ON "orders""#));
        assert!(create.ends_with("FOR EACH ROW EXECUTE PROCEDURE pgevents_notify_event()"));
    }

    #[test]
    fn test_schema_qualified_table() {
        let table = TableName::parse("sales.orders").unwrap();
        assert_eq!(table.relation(), "orders");
        assert_eq!(table.trigger_name(), "orders_events");
        assert_eq!(table.qualified(), r#""sales"."orders""#);
        assert_eq!(table.to_string(), "sales.orders");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let table = TableName::parse(r#"odd"name"#).unwrap();
        let [drop, _] = attach_statements(&table);
        assert_eq!(drop, r#"DROP TRIGGER IF EXISTS "odd""name_events" ON "odd""name""#);
    }

    #[test]
    fn test_invalid_table_names() {
        for raw in ["", ".orders", "sales.", "a.b.c", "bad\0name"] {
            assert!(
                matches!(
                    TableName::parse(raw),
                    Err(ListenerError::InvalidTableName(..))
                ),
                "{raw:?} should be rejected"
            );
        }
    }
}
