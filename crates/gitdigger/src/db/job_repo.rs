//! Job repository: row-level access to the `jobs` table.
//!
//! Functions take a borrowed `Connection` so callers can compose them
//! inside a single transaction (see `Database::with_transaction`).

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub job_id: String,
    pub pdf_filename: String,
    pub status: String,
    pub company_name: Option<String>,
    pub num_members: i64,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_id: row.get("job_id")?,
            pdf_filename: row.get("pdf_filename")?,
            status: row.get("status")?,
            company_name: row.get("company_name")?,
            num_members: row.get("num_members")?,
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
            error_message: row.get("error_message")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (job_id, pdf_filename, status, company_name, num_members,
         created_at, completed_at, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            job.job_id,
            job.pdf_filename,
            job.status,
            job.company_name,
            job.num_members,
            job.created_at,
            job.completed_at,
            job.error_message,
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of an existing row.
/// Returns the number of rows touched (0 when the id is unknown).
pub fn update(conn: &Connection, job: &JobRow) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET status=?2, company_name=?3, num_members=?4,
         completed_at=?5, error_message=?6
         WHERE job_id=?1",
        params![
            job.job_id,
            job.status,
            job.company_name,
            job.num_members,
            job.completed_at,
            job.error_message,
        ],
    )?;
    Ok(changed)
}

/// Finds a job by its ID.
pub fn find_by_id(conn: &Connection, job_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM jobs WHERE job_id = ?1",
            params![job_id],
            JobRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Counts all job rows.
pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
    Ok(total.max(0) as u64)
}

/// Counts jobs grouped by status.
pub fn count_by_status(conn: &Connection) -> Result<Vec<(String, u64)>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get::<_, i64>(1)?.max(0) as u64)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
