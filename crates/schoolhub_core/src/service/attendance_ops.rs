//! Teacher attendance upsert.
//!
//! # Invariants
//! - Matching is by calendar day: two timestamps on the same date update one
//!   entry, whatever their time of day.

use crate::model::attendance::{calendar_day, upsert_entry, AttendanceStatus};
use crate::model::teacher::{Teacher, TeacherId};
use crate::repo::teacher_repo::TeacherStore;
use crate::service::coordinator::{ConsistencyCoordinator, CoordinatorError, CoordinatorResult};
use crate::service::credential::CredentialHasher;
use chrono::NaiveDateTime;
use log::info;

impl<H: CredentialHasher> ConsistencyCoordinator<'_, H> {
    /// Records `status` for the calendar day of `at`, overwriting any entry
    /// already logged for that day.
    pub fn mark_teacher_attendance(
        &self,
        teacher_id: TeacherId,
        at: NaiveDateTime,
        status: AttendanceStatus,
    ) -> CoordinatorResult<Teacher> {
        let day = calendar_day(at);
        self.write("teacher_attendance", |stores| {
            let mut teacher = stores
                .teachers
                .get_account(teacher_id)?
                .ok_or(CoordinatorError::TeacherNotFound(teacher_id))?
                .into_public();

            let overwritten = upsert_entry(&mut teacher.attendance, day, status);
            stores
                .teachers
                .replace_attendance(teacher_id, &teacher.attendance)?;

            info!(
                "event=teacher_attendance module=coordinator status=ok teacher_id={teacher_id} day={day} attendance={status} overwritten={overwritten}"
            );
            Ok(teacher)
        })
    }
}
