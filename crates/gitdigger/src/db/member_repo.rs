//! Member repository: rows of the `github_members` table.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw member row. `id` is assigned by SQLite and preserves insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub id: i64,
    pub job_id: String,
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub member_type: Option<String>,
    pub organization: String,
}

impl MemberRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            login: row.get("login")?,
            avatar_url: row.get("avatar_url")?,
            html_url: row.get("html_url")?,
            member_type: row.get("member_type")?,
            organization: row.get("organization")?,
        })
    }
}

/// Fields needed to insert a member; the id is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemberRow<'a> {
    pub login: &'a str,
    pub avatar_url: Option<&'a str>,
    pub html_url: Option<&'a str>,
    pub member_type: Option<&'a str>,
    pub organization: &'a str,
}

/// Inserts members for a job in the given order.
pub fn insert_many(
    conn: &Connection,
    job_id: &str,
    members: &[NewMemberRow<'_>],
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO github_members (job_id, login, avatar_url, html_url, member_type, organization)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for member in members {
        stmt.execute(params![
            job_id,
            member.login,
            member.avatar_url,
            member.html_url,
            member.member_type,
            member.organization,
        ])?;
    }
    Ok(members.len())
}

/// Lists members of a job in insertion order.
pub fn list_by_job(conn: &Connection, job_id: &str) -> Result<Vec<MemberRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM github_members WHERE job_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![job_id], MemberRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
