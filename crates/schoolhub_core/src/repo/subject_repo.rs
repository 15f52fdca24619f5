//! Subject store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist subject records and the `teacher_id` back-reference.
//! - Provide the bulk id-collection, delete and back-reference writes the
//!   coordinator sequences during cascades.
//!
//! # Invariants
//! - `(school_id, code)` is unique.
//! - Listing order is deterministic: `name ASC, id ASC`.
//! - This store never touches teacher or student tables.

use crate::model::subject::{Subject, SubjectId};
use crate::model::teacher::TeacherId;
use crate::model::{ClassId, SchoolId};
use crate::repo::{
    execute_chunked, id_values, parse_optional_uuid, parse_u32, parse_uuid, placeholders,
    RepoError, RepoResult, Scope, MAX_IN_BINDS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SUBJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    code,
    session_count,
    class_id,
    school_id,
    teacher_id
FROM subjects";

/// Filter for subject list reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectQuery {
    pub school_id: Option<SchoolId>,
    pub class_id: Option<ClassId>,
    /// Only subjects without an assigned teacher.
    pub unassigned_only: bool,
}

/// Repository interface for the subject aggregate.
pub trait SubjectStore {
    fn insert_subject(&self, subject: &Subject) -> RepoResult<()>;
    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>>;
    /// Loads the subjects among `ids` that exist, in `name ASC, id ASC` order.
    fn get_subjects(&self, ids: &[SubjectId]) -> RepoResult<Vec<Subject>>;
    fn list_subjects(&self, query: &SubjectQuery) -> RepoResult<Vec<Subject>>;
    /// Returns which of `codes` already exist in the school.
    fn existing_codes(&self, school_id: SchoolId, codes: &[String]) -> RepoResult<Vec<String>>;
    fn collect_ids(&self, scope: Scope) -> RepoResult<Vec<SubjectId>>;
    fn delete_subject(&self, id: SubjectId) -> RepoResult<()>;
    /// Deletes the listed subjects and returns the number removed.
    fn delete_subjects(&self, ids: &[SubjectId]) -> RepoResult<usize>;
    /// Points every listed subject at `teacher_id`.
    fn assign_teacher(&self, ids: &[SubjectId], teacher_id: TeacherId) -> RepoResult<usize>;
    /// Unsets the back-reference on every subject owned by any listed teacher.
    fn clear_teacher(&self, teacher_ids: &[TeacherId]) -> RepoResult<usize>;
}

/// SQLite-backed subject store.
pub struct SqliteSubjectStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubjectStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_subjects(&self, sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Subject>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next()? {
            subjects.push(parse_subject_row(row)?);
        }
        Ok(subjects)
    }
}

impl SubjectStore for SqliteSubjectStore<'_> {
    fn insert_subject(&self, subject: &Subject) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO subjects (
                id,
                name,
                code,
                session_count,
                class_id,
                school_id,
                teacher_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                subject.id.to_string(),
                subject.name.as_str(),
                subject.code.as_str(),
                i64::from(subject.session_count),
                subject.class_id.to_string(),
                subject.school_id.to_string(),
                subject.teacher_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        let mut subjects = self.query_subjects(
            &format!("{SUBJECT_SELECT_SQL} WHERE id = ?1;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(subjects.pop())
    }

    fn get_subjects(&self, ids: &[SubjectId]) -> RepoResult<Vec<Subject>> {
        let mut subjects = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IN_BINDS) {
            subjects.extend(self.query_subjects(
                &format!(
                    "{SUBJECT_SELECT_SQL} WHERE id IN ({});",
                    placeholders(chunk.len())
                ),
                id_values(chunk),
            )?);
        }
        // Same order as `ORDER BY name ASC, id ASC` under the BINARY collation.
        subjects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(subjects)
    }

    fn list_subjects(&self, query: &SubjectQuery) -> RepoResult<Vec<Subject>> {
        let mut sql = format!("{SUBJECT_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();

        if let Some(school_id) = query.school_id {
            sql.push_str(" AND school_id = ?");
            binds.push(Value::Text(school_id.to_string()));
        }
        if let Some(class_id) = query.class_id {
            sql.push_str(" AND class_id = ?");
            binds.push(Value::Text(class_id.to_string()));
        }
        if query.unassigned_only {
            sql.push_str(" AND teacher_id IS NULL");
        }
        sql.push_str(" ORDER BY name ASC, id ASC;");

        self.query_subjects(&sql, binds)
    }

    fn existing_codes(&self, school_id: SchoolId, codes: &[String]) -> RepoResult<Vec<String>> {
        let mut existing: Vec<String> = Vec::new();
        for chunk in codes.chunks(MAX_IN_BINDS) {
            let sql = format!(
                "SELECT code FROM subjects WHERE school_id = ? AND code IN ({});",
                placeholders(chunk.len())
            );
            let mut binds = vec![Value::Text(school_id.to_string())];
            binds.extend(chunk.iter().map(|code| Value::Text(code.clone())));

            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            while let Some(row) = rows.next()? {
                existing.push(row.get(0)?);
            }
        }
        existing.sort();
        Ok(existing)
    }

    fn collect_ids(&self, scope: Scope) -> RepoResult<Vec<SubjectId>> {
        let sql = format!(
            "SELECT id FROM subjects WHERE {} = ?1 ORDER BY id ASC;",
            scope.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([scope.id().to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "subjects.id")?);
        }
        Ok(ids)
    }

    fn delete_subject(&self, id: SubjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM subjects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "subject",
                id,
            });
        }
        Ok(())
    }

    fn delete_subjects(&self, ids: &[SubjectId]) -> RepoResult<usize> {
        execute_chunked(self.conn, ids, &[], |in_list| {
            format!("DELETE FROM subjects WHERE id IN ({in_list});")
        })
    }

    fn assign_teacher(&self, ids: &[SubjectId], teacher_id: TeacherId) -> RepoResult<usize> {
        execute_chunked(
            self.conn,
            ids,
            &[Value::Text(teacher_id.to_string())],
            |in_list| {
                format!(
                    "UPDATE subjects
                     SET teacher_id = ?,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id IN ({in_list});"
                )
            },
        )
    }

    fn clear_teacher(&self, teacher_ids: &[TeacherId]) -> RepoResult<usize> {
        execute_chunked(self.conn, teacher_ids, &[], |in_list| {
            format!(
                "UPDATE subjects
                 SET teacher_id = NULL,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE teacher_id IN ({in_list});"
            )
        })
    }
}

fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    let id_text: String = row.get("id")?;
    let class_text: String = row.get("class_id")?;
    let school_text: String = row.get("school_id")?;

    Ok(Subject {
        id: parse_uuid(&id_text, "subjects.id")?,
        name: row.get("name")?,
        code: row.get("code")?,
        session_count: parse_u32(row.get("session_count")?, "subjects.session_count")?,
        class_id: parse_uuid(&class_text, "subjects.class_id")?,
        school_id: parse_uuid(&school_text, "subjects.school_id")?,
        teacher_id: parse_optional_uuid(row.get("teacher_id")?, "subjects.teacher_id")?,
    })
}
