//! Writing generated tables into fresh SQLite files.

use std::fs;
use std::path::{Path, PathBuf};

use bandjoin_error::{BandJoinError, Result};
use rusqlite::{Connection, params};
use tracing::info;

use crate::{
    EmployeeRecord, GeneratorConfig, ProjectRecord, generate_employees, generate_projects,
};

/// Paths and row counts of a generated database pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPair {
    /// Holds the `Projects` table.
    pub db1: PathBuf,
    /// Holds the `Employees` table.
    pub db2: PathBuf,
    pub projects: usize,
    pub employees: usize,
}

/// Generate both tables and write them to `dir/db1_name` (Projects) and
/// `dir/db2_name` (Employees), replacing existing files.
pub fn generate_databases(
    config: &GeneratorConfig,
    dir: &Path,
    db1_name: &str,
    db2_name: &str,
) -> Result<GeneratedPair> {
    config.validate()?;
    fs::create_dir_all(dir)
        .map_err(|e| BandJoinError::source_unavailable(dir.display().to_string(), e))?;

    let projects = generate_projects(config, &mut config.rng())?;
    let employees = generate_employees(config, &mut config.rng())?;

    let db1 = dir.join(db1_name);
    let db2 = dir.join(db2_name);
    write_projects(&db1, &projects)?;
    write_employees(&db2, &employees)?;

    for path in [&db1, &db2] {
        if let Ok(meta) = fs::metadata(path) {
            info!(
                path = %path.display(),
                mib = meta.len() as f64 / (1024.0 * 1024.0),
                "database written"
            );
        }
    }

    Ok(GeneratedPair {
        db1,
        db2,
        projects: projects.len(),
        employees: employees.len(),
    })
}

/// Replace `path` with a database holding one `Projects` table.
pub fn write_projects(path: &Path, projects: &[ProjectRecord]) -> Result<()> {
    let mut conn = fresh_database(path)?;
    let fail = |e: rusqlite::Error| write_failed(path, "Projects", e);
    conn.execute_batch(
        "CREATE TABLE Projects (
             ProjectID INTEGER PRIMARY KEY,
             Department TEXT,
             StartDate TEXT,
             Funding INTEGER
         )",
    )
    .map_err(fail)?;
    let tx = conn.transaction().map_err(fail)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO Projects (ProjectID, Department, StartDate, Funding) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(fail)?;
        for p in projects {
            stmt.execute(params![p.id, p.department, p.start_date.to_string(), p.funding])
                .map_err(fail)?;
        }
    }
    tx.commit().map_err(fail)?;
    info!(path = %path.display(), rows = projects.len(), "Projects table created");
    Ok(())
}

/// Replace `path` with a database holding one `Employees` table.
pub fn write_employees(path: &Path, employees: &[EmployeeRecord]) -> Result<()> {
    let mut conn = fresh_database(path)?;
    let fail = |e: rusqlite::Error| write_failed(path, "Employees", e);
    conn.execute_batch(
        "CREATE TABLE Employees (
             EmployeeID INTEGER PRIMARY KEY,
             Department TEXT,
             Name TEXT,
             HireDate TEXT
         )",
    )
    .map_err(fail)?;
    let tx = conn.transaction().map_err(fail)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO Employees (EmployeeID, Department, Name, HireDate) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(fail)?;
        for e in employees {
            stmt.execute(params![e.id, e.department, e.name, e.hire_date.to_string()])
                .map_err(fail)?;
        }
    }
    tx.commit().map_err(fail)?;
    info!(path = %path.display(), rows = employees.len(), "Employees table created");
    Ok(())
}

fn fresh_database(path: &Path) -> Result<Connection> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| BandJoinError::source_unavailable(path.display().to_string(), e))?;
        info!(path = %path.display(), "deleted existing database");
    }
    Connection::open(path)
        .map_err(|e| BandJoinError::source_unavailable(path.display().to_string(), e))
}

fn write_failed(path: &Path, table: &str, err: rusqlite::Error) -> BandJoinError {
    BandJoinError::source_unavailable(table, format!("{}: {err}", path.display()))
}
