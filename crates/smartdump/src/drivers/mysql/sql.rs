//! MySQL SQL text generation: quoting, literals, and DDL rewriting.

use crate::core::schema::Table;
use crate::core::value::{Row, SqlValue};

/// Quote a MySQL identifier using backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quoted `schema`.`table` identifier.
pub fn table_identifier(table: &Table) -> String {
    format!(
        "{}.{}",
        quote_identifier(&table.schema),
        quote_identifier(&table.name)
    )
}

/// Quote a value for direct embedding in a statement.
pub fn quote_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::UInt(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Decimal(v) => v.to_string(),
        SqlValue::Text(v) => quote_string(v),
        SqlValue::Bytes(v) => quote_bytes(v),
        SqlValue::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
        SqlValue::Time(v) => format!("'{}'", v.format("%H:%M:%S%.f")),
        SqlValue::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
    }
}

/// Quote a string literal. Both quotes and backslashes are doubled, since
/// MySQL treats backslash as an escape character in default SQL mode.
fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Render binary data as a hex literal.
fn quote_bytes(value: &[u8]) -> String {
    let mut out = String::with_capacity(3 + value.len() * 2);
    out.push_str("X'");
    for byte in value {
        out.push_str(&format!("{:02X}", byte));
    }
    out.push('\'');
    out
}

/// Statement dropping an already-quoted table if it exists.
pub fn drop_table_if_exists(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", table)
}

pub fn disable_foreign_keys() -> String {
    "SET FOREIGN_KEY_CHECKS = 0;".to_string()
}

pub fn enable_foreign_keys() -> String {
    "SET FOREIGN_KEY_CHECKS = 1;".to_string()
}

/// Upsert for the row: INSERT … ON DUPLICATE KEY UPDATE over every column.
///
/// Updating key columns to their own values is a no-op on conflict, so the
/// statement needs no knowledge of which columns form the key, and the
/// existing row is updated in place rather than deleted and re-inserted.
pub fn upsert(table: &str, row: &Row) -> String {
    let columns = row
        .iter()
        .map(|(column, _)| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");

    let values = row
        .iter()
        .map(|(_, value)| quote_value(value))
        .collect::<Vec<_>>()
        .join(", ");

    let updates = row
        .iter()
        .map(|(column, _)| {
            let quoted = quote_identifier(column);
            format!("{} = VALUES({})", quoted, quoted)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {};",
        table, columns, values, updates
    )
}

/// Rewrite a SHOW CREATE TABLE statement for the requested qualification.
///
/// MySQL never schema-qualifies the created table's own name, and only
/// qualifies `REFERENCES` targets living in another schema. When the output
/// is schema-qualified, the table name and every unqualified `REFERENCES`
/// target gain the source schema; when it is not, schema qualifiers are
/// stripped from `REFERENCES` targets instead.
pub fn rewrite_create_table(sql: &str, table: &Table, include_schema: bool) -> String {
    let head_rewritten = if include_schema {
        match sql.strip_prefix("CREATE TABLE ") {
            Some(rest) => format!(
                "CREATE TABLE {}.{}",
                quote_identifier(&table.schema),
                rest
            ),
            None => sql.to_string(),
        }
    } else {
        sql.to_string()
    };

    rewrite_references(&head_rewritten, &table.schema, include_schema)
}

/// Rewrite `REFERENCES` targets to match the schema-qualification choice.
fn rewrite_references(sql: &str, schema: &str, include_schema: bool) -> String {
    const MARKER: &str = "REFERENCES `";

    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(at) = rest.find(MARKER) {
        let ident_start = at + MARKER.len() - 1;
        let Some(ident_end) = quoted_ident_end(rest, ident_start) else {
            break;
        };

        out.push_str(&rest[..at + "REFERENCES ".len()]);

        let ident = &rest[ident_start..ident_end];
        let qualified = rest[ident_end..].starts_with('.');

        if qualified {
            // `schema`.`table` target: keep or strip the qualifier.
            let target_start = ident_end + 1;
            let Some(target_end) = quoted_ident_end(rest, target_start) else {
                break;
            };
            if include_schema {
                out.push_str(&rest[ident_start..target_end]);
            } else {
                out.push_str(&rest[target_start..target_end]);
            }
            rest = &rest[target_end..];
        } else {
            // Bare `table` target: qualify it when requested.
            if include_schema {
                out.push_str(&quote_identifier(schema));
                out.push('.');
            }
            out.push_str(ident);
            rest = &rest[ident_end..];
        }
    }

    out.push_str(rest);
    out
}

/// End index (exclusive) of a backtick-quoted identifier starting at
/// `start`, honoring doubled backticks.
fn quoted_ident_end(s: &str, start: usize) -> Option<usize> {
    debug_assert!(s[start..].starts_with('`'));
    let bytes = s.as_bytes();
    let mut i = start + 1;

    while i < bytes.len() {
        if bytes[i] == b'`' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'`' {
                i += 2;
            } else {
                return Some(i + 1);
            }
        } else {
            i += 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name"), "`name`");
        assert_eq!(quote_identifier("table`name"), "`table``name`");
    }

    #[test]
    fn test_quote_value_scalars() {
        assert_eq!(quote_value(&SqlValue::Null), "NULL");
        assert_eq!(quote_value(&SqlValue::Bool(true)), "1");
        assert_eq!(quote_value(&SqlValue::Int(-7)), "-7");
        assert_eq!(quote_value(&SqlValue::UInt(u64::MAX)), u64::MAX.to_string());
        assert_eq!(quote_value(&SqlValue::Float(1.5)), "1.5");
    }

    #[test]
    fn test_quote_value_strings() {
        assert_eq!(quote_value(&SqlValue::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(
            quote_value(&SqlValue::Text("a\\b".into())),
            "'a\\\\b'"
        );
    }

    #[test]
    fn test_quote_value_bytes() {
        assert_eq!(quote_value(&SqlValue::Bytes(vec![0x00, 0xFF])), "X'00FF'");
        assert_eq!(quote_value(&SqlValue::Bytes(vec![])), "X''");
    }

    #[test]
    fn test_quote_value_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(quote_value(&SqlValue::Date(date)), "'2024-03-09'");

        let time = NaiveTime::from_hms_opt(13, 5, 0).unwrap();
        assert_eq!(quote_value(&SqlValue::Time(time)), "'13:05:00'");

        // %.f trims trailing zeros and prints nothing for whole seconds.
        let datetime = date.and_hms_micro_opt(13, 5, 0, 250_000).unwrap();
        assert_eq!(
            quote_value(&SqlValue::DateTime(datetime)),
            "'2024-03-09 13:05:00.25'"
        );
    }

    #[test]
    fn test_upsert_updates_every_column() {
        let row = Row::new(vec![
            ("id".to_string(), SqlValue::Int(1)),
            ("name".to_string(), SqlValue::Text("a".into())),
        ]);

        let sql = upsert("`orders`", &row);
        assert_eq!(
            sql,
            "INSERT INTO `orders` (`id`, `name`) VALUES (1, 'a') \
             ON DUPLICATE KEY UPDATE `id` = VALUES(`id`), `name` = VALUES(`name`);"
        );
    }

    const CREATE_SQL: &str = "CREATE TABLE `orders` (\n\
        \x20 `id` int NOT NULL,\n\
        \x20 `customer_id` int DEFAULT NULL,\n\
        \x20 `warehouse_id` int DEFAULT NULL,\n\
        \x20 PRIMARY KEY (`id`),\n\
        \x20 CONSTRAINT `fk_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`),\n\
        \x20 CONSTRAINT `fk_warehouse` FOREIGN KEY (`warehouse_id`) REFERENCES `logistics`.`warehouses` (`id`)\n\
        );";

    #[test]
    fn test_rewrite_create_table_qualified() {
        let table = Table::new("shop", "orders");
        let sql = rewrite_create_table(CREATE_SQL, &table, true);

        assert!(sql.starts_with("CREATE TABLE `shop`.`orders` ("));
        assert!(sql.contains("REFERENCES `shop`.`customers` (`id`)"));
        // Cross-schema targets keep their own schema.
        assert!(sql.contains("REFERENCES `logistics`.`warehouses` (`id`)"));
    }

    #[test]
    fn test_rewrite_create_table_unqualified() {
        let table = Table::new("shop", "orders");
        let sql = rewrite_create_table(CREATE_SQL, &table, false);

        assert!(sql.starts_with("CREATE TABLE `orders` ("));
        assert!(sql.contains("REFERENCES `customers` (`id`)"));
        assert!(sql.contains("REFERENCES `warehouses` (`id`)"));
        assert!(!sql.contains("`logistics`."));
    }

    #[test]
    fn test_rewrite_handles_backticks_in_names() {
        let table = Table::new("shop", "a`b");
        let sql = "CREATE TABLE `a``b` (`x` int, CONSTRAINT `fk` FOREIGN KEY (`x`) REFERENCES `c``d` (`x`));";
        let rewritten = rewrite_create_table(sql, &table, true);
        assert!(rewritten.starts_with("CREATE TABLE `shop`.`a``b` ("));
        assert!(rewritten.contains("REFERENCES `shop`.`c``d` (`x`)"));
    }
}
