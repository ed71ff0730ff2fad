use anyhow::{Context, Result};

use super::connection::DbConn;

/// Drops and recreates every competition table from the bundled schema.
pub fn reset_database(conn: &mut DbConn) -> Result<()> {
    let statements = split_sql_statements(include_str!("schema.sql"));

    for (idx, statement) in &statements {
        conn.execute(statement, [])
            .with_context(|| format!("Failed to execute schema statement {}", idx + 1))?;
    }

    log::info!("Competition schema reset ({} statements)", statements.len());
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<(usize, &str)> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .collect()
}
