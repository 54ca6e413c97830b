use serde_json::Value;

use crate::error::{AppError, AppResult};

/// SQL bindable value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    Bool(bool),
}

/// Binds every value of `$values` (an iterable of `&SqlValue`) onto a `query`,
/// `query_as` or `query_scalar` builder.
#[macro_export]
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                $crate::utils::db_utils::SqlValue::String(v) => query.bind(v.clone()),
                $crate::utils::db_utils::SqlValue::U64(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::I64(v) => query.bind(*v),
                $crate::utils::db_utils::SqlValue::Bool(v) => query.bind(*v),
            };
        }
        query
    }};
}

/// `AND`-joined WHERE clause with positional values.
#[derive(Debug, Default)]
pub struct Conditions {
    clauses: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Conditions {
    pub fn push(&mut self, clause: &str, value: SqlValue) {
        self.clauses.push(clause.to_string());
        self.values.push(value);
    }

    /// For clauses with more than one placeholder, e.g. a multi-column LIKE.
    pub fn push_many(&mut self, clause: &str, values: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    /// Empty, or ` WHERE a AND b`.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// SQL update container
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds `UPDATE table SET ... WHERE id = ?` from a JSON object. Only keys in `allowed` are
/// accepted; anything else, nulls and nested values are rejected.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id: u64,
) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        if !allowed.contains(&key.as_str()) {
            return Err(AppError::validation(format!("Field '{key}' cannot be updated")));
        }

        let value = match value {
            Value::String(s) => SqlValue::String(s.trim().to_string()),
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => SqlValue::U64(u),
                (None, Some(i)) => SqlValue::I64(i),
                _ => return Err(AppError::validation(format!("Field '{key}' must be an integer"))),
            },
            Value::Null => return Err(AppError::validation(format!("Field '{key}' cannot be null"))),
            _ => return Err(AppError::validation(format!("Unsupported value for '{key}'"))),
        };

        columns.push(format!("{key} = ?"));
        values.push(value);
    }

    values.push(SqlValue::U64(id));

    Ok(SqlUpdate {
        sql: format!("UPDATE {table} SET {} WHERE id = ?", columns.join(", ")),
        values,
    })
}

pub async fn execute_update<'c, E>(executor: E, update: &SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = sqlx::MySql>,
{
    let query = bind_values!(sqlx::query(&update.sql), &update.values);
    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_update_from_allowed_fields() {
        let update = build_update_sql(
            "employees",
            &json!({ "full_name": " Ana ", "age": 40 }),
            &["full_name", "age"],
            7,
        )
        .unwrap();

        assert!(update.sql.starts_with("UPDATE employees SET "));
        assert!(update.sql.ends_with(" WHERE id = ?"));
        assert!(update.sql.contains("full_name = ?"));
        assert!(update.values.contains(&SqlValue::String("Ana".into())));
        assert!(update.values.contains(&SqlValue::U64(40)));
        assert_eq!(update.values.last(), Some(&SqlValue::U64(7)));
    }

    #[test]
    fn rejects_unknown_columns_and_nulls() {
        let err = build_update_sql("employees", &json!({ "id = 1; --": 1 }), &["age"], 1);
        assert!(matches!(err, Err(AppError::Validation(_))));

        let err = build_update_sql("employees", &json!({ "age": null }), &["age"], 1);
        assert!(matches!(err, Err(AppError::Validation(_))));

        let err = build_update_sql("employees", &json!({}), &["age"], 1);
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn conditions_render_where_clause() {
        let mut c = Conditions::default();
        assert_eq!(c.where_sql(), "");

        c.push("e.is_active = ?", SqlValue::Bool(true));
        c.push_many(
            "(e.full_name LIKE ? OR e.employee_code LIKE ?)",
            [SqlValue::String("%an%".into()), SqlValue::String("%an%".into())],
        );
        assert_eq!(
            c.where_sql(),
            " WHERE e.is_active = ? AND (e.full_name LIKE ? OR e.employee_code LIKE ?)"
        );
        assert_eq!(c.values.len(), 3);
    }
}
