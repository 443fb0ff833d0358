pub const SCHEMA_SQL: &str = include_str!("sql/schema.sql");
pub const FETCH_STORE_PAGE_SQL: &str = include_str!("sql/fetch_store_page.sql");

/// Postgres refuses statements with more than 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

const HISTORY_COLUMNS: [&str; 3] = ["store_name", "product_names", "employee_names"];

/// Largest number of history rows a single INSERT may carry.
pub const fn max_rows_per_insert() -> usize {
    MAX_BIND_PARAMS / HISTORY_COLUMNS.len()
}

/// Multi-row `INSERT INTO store_history … RETURNING id` for `rows` rows.
pub fn insert_history(rows: usize) -> String {
    let width = HISTORY_COLUMNS.len();
    let mut sql = format!(
        "INSERT INTO store_history ({}) VALUES ",
        HISTORY_COLUMNS.join(", ")
    );
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..width {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&(row * width + col + 1).to_string());
        }
        sql.push(')');
    }
    sql.push_str(" RETURNING id");
    sql
}
