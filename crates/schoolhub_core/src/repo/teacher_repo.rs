//! Teacher store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist teacher profiles, credential hashes, the `teacher_subjects`
//!   assignment set and the attendance log.
//! - Hand credential hashes out only through `TeacherAccount`.
//!
//! # Invariants
//! - `email` is unique and stored normalized.
//! - `teacher_subjects` has one row per (teacher, subject): set semantics are
//!   enforced by the primary key.
//! - `teacher_attendance` has at most one row per (teacher, day).
//! - Deleting a teacher removes its owned set rows and attendance log.

use crate::model::attendance::{day_from_db, day_to_db, AttendanceEntry, AttendanceStatus};
use crate::model::subject::SubjectId;
use crate::model::teacher::{Teacher, TeacherAccount, TeacherId};
use crate::model::SchoolId;
use crate::repo::{
    execute_chunked, id_values, parse_optional_uuid, parse_uuid, placeholders, RepoError,
    RepoResult, Scope, MAX_IN_BINDS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;

const TEACHER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    password_hash,
    role,
    school_id,
    class_id
FROM teachers";

/// Repository interface for the teacher aggregate.
pub trait TeacherStore {
    /// Inserts profile, credential and subject set.
    fn insert_teacher(&self, account: &TeacherAccount) -> RepoResult<()>;
    /// Overwrites profile, credential and the full subject set.
    fn update_teacher(&self, account: &TeacherAccount) -> RepoResult<()>;
    fn get_account(&self, id: TeacherId) -> RepoResult<Option<TeacherAccount>>;
    fn get_account_by_email(&self, email: &str) -> RepoResult<Option<TeacherAccount>>;
    fn list_accounts(&self, school_id: SchoolId) -> RepoResult<Vec<TeacherAccount>>;
    fn collect_ids(&self, scope: Scope) -> RepoResult<Vec<TeacherId>>;
    fn delete_teacher(&self, id: TeacherId) -> RepoResult<()>;
    fn delete_teachers(&self, ids: &[TeacherId]) -> RepoResult<usize>;
    /// Pulls the listed subject ids out of one teacher's set.
    fn remove_subjects_from(&self, teacher_id: TeacherId, subject_ids: &[SubjectId]) -> RepoResult<usize>;
    /// Pulls the listed subject ids out of every teacher's set.
    ///
    /// Returns the number of distinct teachers that lost at least one id.
    fn remove_subjects_everywhere(&self, subject_ids: &[SubjectId]) -> RepoResult<usize>;
    /// Replaces the whole attendance log of one teacher.
    fn replace_attendance(&self, teacher_id: TeacherId, log: &[AttendanceEntry]) -> RepoResult<()>;
}

/// SQLite-backed teacher store.
pub struct SqliteTeacherStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeacherStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_accounts(&self, sql: &str, binds: Vec<Value>) -> RepoResult<Vec<TeacherAccount>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            let mut account = parse_teacher_row(row)?;
            let id = account.teacher.id;
            account.teacher.subject_ids = load_subject_set(self.conn, id)?;
            account.teacher.attendance = load_attendance(self.conn, id)?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    fn write_subject_set(&self, teacher: &Teacher) -> RepoResult<()> {
        let id = teacher.id.to_string();
        self.conn.execute(
            "DELETE FROM teacher_subjects WHERE teacher_id = ?1;",
            [id.as_str()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO teacher_subjects (teacher_id, subject_id) VALUES (?1, ?2);",
        )?;
        for subject_id in &teacher.subject_ids {
            stmt.execute(params![id.as_str(), subject_id.to_string()])?;
        }
        Ok(())
    }
}

impl TeacherStore for SqliteTeacherStore<'_> {
    fn insert_teacher(&self, account: &TeacherAccount) -> RepoResult<()> {
        let teacher = &account.teacher;
        self.conn.execute(
            "INSERT INTO teachers (
                id,
                name,
                email,
                password_hash,
                role,
                school_id,
                class_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                teacher.id.to_string(),
                teacher.name.as_str(),
                teacher.email.as_str(),
                account.password_hash.as_str(),
                teacher.role.as_str(),
                teacher.school_id.to_string(),
                teacher.class_id.map(|id| id.to_string()),
            ],
        )?;
        self.write_subject_set(teacher)?;
        self.replace_attendance(teacher.id, &teacher.attendance)
    }

    fn update_teacher(&self, account: &TeacherAccount) -> RepoResult<()> {
        let teacher = &account.teacher;
        let changed = self.conn.execute(
            "UPDATE teachers
             SET
                name = ?2,
                email = ?3,
                password_hash = ?4,
                role = ?5,
                school_id = ?6,
                class_id = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                teacher.id.to_string(),
                teacher.name.as_str(),
                teacher.email.as_str(),
                account.password_hash.as_str(),
                teacher.role.as_str(),
                teacher.school_id.to_string(),
                teacher.class_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "teacher",
                id: teacher.id,
            });
        }
        self.write_subject_set(teacher)
    }

    fn get_account(&self, id: TeacherId) -> RepoResult<Option<TeacherAccount>> {
        let mut accounts = self.query_accounts(
            &format!("{TEACHER_SELECT_SQL} WHERE id = ?1;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(accounts.pop())
    }

    fn get_account_by_email(&self, email: &str) -> RepoResult<Option<TeacherAccount>> {
        let mut accounts = self.query_accounts(
            &format!("{TEACHER_SELECT_SQL} WHERE email = ?1;"),
            vec![Value::Text(email.to_string())],
        )?;
        Ok(accounts.pop())
    }

    fn list_accounts(&self, school_id: SchoolId) -> RepoResult<Vec<TeacherAccount>> {
        self.query_accounts(
            &format!("{TEACHER_SELECT_SQL} WHERE school_id = ?1 ORDER BY name ASC, id ASC;"),
            vec![Value::Text(school_id.to_string())],
        )
    }

    fn collect_ids(&self, scope: Scope) -> RepoResult<Vec<TeacherId>> {
        let sql = format!(
            "SELECT id FROM teachers WHERE {} = ?1 ORDER BY id ASC;",
            scope.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([scope.id().to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "teachers.id")?);
        }
        Ok(ids)
    }

    fn delete_teacher(&self, id: TeacherId) -> RepoResult<()> {
        if self.delete_teachers(&[id])? == 0 {
            return Err(RepoError::NotFound {
                entity: "teacher",
                id,
            });
        }
        Ok(())
    }

    fn delete_teachers(&self, ids: &[TeacherId]) -> RepoResult<usize> {
        execute_chunked(self.conn, ids, &[], |in_list| {
            format!("DELETE FROM teacher_subjects WHERE teacher_id IN ({in_list});")
        })?;
        execute_chunked(self.conn, ids, &[], |in_list| {
            format!("DELETE FROM teacher_attendance WHERE teacher_id IN ({in_list});")
        })?;
        execute_chunked(self.conn, ids, &[], |in_list| {
            format!("DELETE FROM teachers WHERE id IN ({in_list});")
        })
    }

    fn remove_subjects_from(
        &self,
        teacher_id: TeacherId,
        subject_ids: &[SubjectId],
    ) -> RepoResult<usize> {
        execute_chunked(
            self.conn,
            subject_ids,
            &[Value::Text(teacher_id.to_string())],
            |in_list| {
                format!(
                    "DELETE FROM teacher_subjects WHERE teacher_id = ? AND subject_id IN ({in_list});"
                )
            },
        )
    }

    fn remove_subjects_everywhere(&self, subject_ids: &[SubjectId]) -> RepoResult<usize> {
        let mut affected = BTreeSet::new();
        for chunk in subject_ids.chunks(MAX_IN_BINDS) {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT DISTINCT teacher_id FROM teacher_subjects WHERE subject_id IN ({});",
                placeholders(chunk.len())
            ))?;
            let mut rows = stmt.query(params_from_iter(id_values(chunk)))?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                affected.insert(parse_uuid(&value, "teacher_subjects.teacher_id")?);
            }
        }
        execute_chunked(self.conn, subject_ids, &[], |in_list| {
            format!("DELETE FROM teacher_subjects WHERE subject_id IN ({in_list});")
        })?;
        Ok(affected.len())
    }

    fn replace_attendance(&self, teacher_id: TeacherId, log: &[AttendanceEntry]) -> RepoResult<()> {
        let id = teacher_id.to_string();
        self.conn.execute(
            "DELETE FROM teacher_attendance WHERE teacher_id = ?1;",
            [id.as_str()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO teacher_attendance (teacher_id, day, status) VALUES (?1, ?2, ?3);",
        )?;
        for entry in log {
            stmt.execute(params![
                id.as_str(),
                day_to_db(entry.date),
                entry.status.as_db()
            ])?;
        }
        Ok(())
    }
}

fn parse_teacher_row(row: &Row<'_>) -> RepoResult<TeacherAccount> {
    let id_text: String = row.get("id")?;
    let school_text: String = row.get("school_id")?;

    Ok(TeacherAccount {
        teacher: Teacher {
            id: parse_uuid(&id_text, "teachers.id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            role: row.get("role")?,
            school_id: parse_uuid(&school_text, "teachers.school_id")?,
            class_id: parse_optional_uuid(row.get("class_id")?, "teachers.class_id")?,
            subject_ids: BTreeSet::new(),
            attendance: Vec::new(),
        },
        password_hash: row.get("password_hash")?,
    })
}

fn load_subject_set(conn: &Connection, teacher_id: TeacherId) -> RepoResult<BTreeSet<SubjectId>> {
    let mut stmt =
        conn.prepare("SELECT subject_id FROM teacher_subjects WHERE teacher_id = ?1;")?;
    let mut rows = stmt.query([teacher_id.to_string()])?;
    let mut ids = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.insert(parse_uuid(&value, "teacher_subjects.subject_id")?);
    }
    Ok(ids)
}

fn load_attendance(conn: &Connection, teacher_id: TeacherId) -> RepoResult<Vec<AttendanceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT day, status
         FROM teacher_attendance
         WHERE teacher_id = ?1
         ORDER BY day ASC;",
    )?;
    let mut rows = stmt.query([teacher_id.to_string()])?;
    let mut log = Vec::new();
    while let Some(row) = rows.next()? {
        let day_text: String = row.get("day")?;
        let status_text: String = row.get("status")?;
        let date = day_from_db(&day_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid day `{day_text}` in teacher_attendance.day"))
        })?;
        let status = AttendanceStatus::from_db(&status_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid status `{status_text}` in teacher_attendance.status"
            ))
        })?;
        log.push(AttendanceEntry { date, status });
    }
    Ok(log)
}
