//! Student store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist students plus their exam-result and attendance collections.
//! - Provide the fine-grained (per subject) and coarse (all students)
//!   cleanup writes used by subject deletion.

use crate::model::attendance::{day_from_db, day_to_db, AttendanceStatus};
use crate::model::student::{ExamResult, Student, StudentAttendance, StudentId};
use crate::model::subject::SubjectId;
use crate::repo::{parse_u32, parse_uuid, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

/// Rows removed by a per-subject cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovedEntries {
    pub exam_results: usize,
    pub attendance: usize,
}

/// Repository interface for the student aggregate.
pub trait StudentStore {
    fn insert_student(&self, student: &Student) -> RepoResult<()>;
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn student_exists(&self, id: StudentId) -> RepoResult<bool>;
    fn upsert_exam_result(&self, id: StudentId, subject_id: SubjectId, marks: u32) -> RepoResult<()>;
    fn upsert_attendance(
        &self,
        id: StudentId,
        subject_id: SubjectId,
        day: NaiveDate,
        status: AttendanceStatus,
    ) -> RepoResult<()>;
    /// Removes every exam-result and attendance entry referencing the subject.
    fn remove_subject_entries(&self, subject_id: SubjectId) -> RepoResult<RemovedEntries>;
    /// Empties the academic collections of every student.
    ///
    /// Returns the number of students whose collections were reset.
    fn reset_all_records(&self) -> RepoResult<usize>;
}

/// SQLite-backed student store.
pub struct SqliteStudentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StudentStore for SqliteStudentStore<'_> {
    fn insert_student(&self, student: &Student) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO students (id, name, roll_number, school_id, class_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                student.id.to_string(),
                student.name.as_str(),
                i64::from(student.roll_number),
                student.school_id.to_string(),
                student.class_id.to_string(),
            ],
        )?;
        for result in &student.exam_results {
            self.upsert_exam_result(student.id, result.subject_id, result.marks)?;
        }
        for entry in &student.attendance {
            self.upsert_attendance(student.id, entry.subject_id, entry.date, entry.status)?;
        }
        Ok(())
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, roll_number, school_id, class_id FROM students WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, roll_number, school_text, class_text)) = row else {
            return Ok(None);
        };

        Ok(Some(Student {
            id,
            name,
            roll_number: parse_u32(roll_number, "students.roll_number")?,
            school_id: parse_uuid(&school_text, "students.school_id")?,
            class_id: parse_uuid(&class_text, "students.class_id")?,
            exam_results: load_exam_results(self.conn, id)?,
            attendance: load_attendance(self.conn, id)?,
        }))
    }

    fn student_exists(&self, id: StudentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn upsert_exam_result(&self, id: StudentId, subject_id: SubjectId, marks: u32) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO student_exam_results (student_id, subject_id, marks)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (student_id, subject_id) DO UPDATE SET marks = excluded.marks;",
            params![id.to_string(), subject_id.to_string(), i64::from(marks)],
        )?;
        Ok(())
    }

    fn upsert_attendance(
        &self,
        id: StudentId,
        subject_id: SubjectId,
        day: NaiveDate,
        status: AttendanceStatus,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO student_attendance (student_id, subject_id, day, status)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (student_id, subject_id, day) DO UPDATE SET status = excluded.status;",
            params![
                id.to_string(),
                subject_id.to_string(),
                day_to_db(day),
                status.as_db()
            ],
        )?;
        Ok(())
    }

    fn remove_subject_entries(&self, subject_id: SubjectId) -> RepoResult<RemovedEntries> {
        let id = subject_id.to_string();
        let exam_results = self.conn.execute(
            "DELETE FROM student_exam_results WHERE subject_id = ?1;",
            [id.as_str()],
        )?;
        let attendance = self.conn.execute(
            "DELETE FROM student_attendance WHERE subject_id = ?1;",
            [id.as_str()],
        )?;
        Ok(RemovedEntries {
            exam_results,
            attendance,
        })
    }

    fn reset_all_records(&self) -> RepoResult<usize> {
        let students: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "DELETE FROM student_exam_results;
             DELETE FROM student_attendance;",
        )?;
        usize::try_from(students)
            .map_err(|_| RepoError::InvalidData(format!("negative student count `{students}`")))
    }
}

fn load_exam_results(conn: &Connection, id: StudentId) -> RepoResult<Vec<ExamResult>> {
    let mut stmt = conn.prepare(
        "SELECT subject_id, marks
         FROM student_exam_results
         WHERE student_id = ?1
         ORDER BY subject_id ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let subject_text: String = row.get(0)?;
        results.push(ExamResult {
            subject_id: parse_uuid(&subject_text, "student_exam_results.subject_id")?,
            marks: parse_u32(row.get(1)?, "student_exam_results.marks")?,
        });
    }
    Ok(results)
}

fn load_attendance(conn: &Connection, id: StudentId) -> RepoResult<Vec<StudentAttendance>> {
    let mut stmt = conn.prepare(
        "SELECT subject_id, day, status
         FROM student_attendance
         WHERE student_id = ?1
         ORDER BY day ASC, subject_id ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let subject_text: String = row.get(0)?;
        let day_text: String = row.get(1)?;
        let status_text: String = row.get(2)?;
        entries.push(StudentAttendance {
            subject_id: parse_uuid(&subject_text, "student_attendance.subject_id")?,
            date: day_from_db(&day_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid day `{day_text}` in student_attendance.day"))
            })?,
            status: AttendanceStatus::from_db(&status_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid status `{status_text}` in student_attendance.status"
                ))
            })?,
        });
    }
    Ok(entries)
}
