//! Create sample SQLite database with demo data

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Table created by [`create_sample_database`]
pub const SAMPLE_TABLE: &str = "sensor_readings";

/// Create and populate the sample database if it does not exist yet
pub fn create_sample_database(path: &Path, rows: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            sensor_id TEXT,
            temperature REAL,
            status TEXT
        );
        ",
    )?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM sensor_readings", [], |row| row.get(0))?;
    if existing > 0 {
        info!("Sample database already has {} rows", existing);
        return Ok(());
    }

    info!("Generating {} sensor readings in {}", rows, path.display());
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO sensor_readings (timestamp, sensor_id, temperature, status)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut rng = 42u32;
        let base_time = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or_default();

        for i in 0..rows {
            let timestamp = base_time + chrono::Duration::seconds(i64::from(i) * 60);
            let sensor_id = format!("SENSOR_{}", (i % 5) + 1);
            let t = f64::from(i) * 0.01;
            let temperature = 20.0 + 5.0 * t.sin() + random_float(&mut rng) * 0.2;
            let status = if random_float(&mut rng) < 0.95 { "OK" } else { "WARNING" };

            stmt.execute((
                timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                sensor_id,
                temperature,
                status,
            ))?;
        }
    }
    tx.commit()?;

    info!("Sample database created");
    Ok(())
}

fn random_float(seed: &mut u32) -> f64 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    (*seed as f64) / (u32::MAX as f64)
}
