use chrono::NaiveDate;
use rusqlite::Connection;
use schoolhub_core::db::open_db_in_memory;
use schoolhub_core::{
    AttendanceStatus, BcryptHasher, BulkDeletion, ConsistencyCoordinator, CoordinatorError,
    NewSubject, TeacherDeletionSummary, TeacherRegistration,
};
use uuid::Uuid;

fn coordinator(conn: &Connection) -> ConsistencyCoordinator<'_> {
    ConsistencyCoordinator::with_hasher(conn, BcryptHasher::with_cost(4))
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn delete_teacher_unassigns_subjects_but_keeps_them() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let (school, class) = (Uuid::new_v4(), Uuid::new_v4());
    let subjects = coordinator
        .create_subjects(
            class,
            school,
            &[NewSubject::new("Drama", "DRM", 1), NewSubject::new("Dance", "DNC", 1)],
        )
        .unwrap();
    let teacher = coordinator
        .register_teacher(
            TeacherRegistration::new("noor@school.test")
                .name("Noor")
                .password("pw")
                .school(school)
                .subjects(subjects.iter().map(|s| s.id)),
        )
        .unwrap()
        .teacher;
    coordinator
        .mark_teacher_attendance(
            teacher.id,
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            AttendanceStatus::Present,
        )
        .unwrap();

    let deleted = coordinator.delete_teacher(teacher.id).unwrap();
    assert_eq!(deleted.id, teacher.id);
    assert_eq!(deleted.subject_ids.len(), 2);

    let remaining = coordinator.list_subjects(school).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|s| s.teacher_id.is_none()));
    assert_eq!(coordinator.list_unassigned_subjects(class).unwrap().len(), 2);

    assert_eq!(count(&conn, "teachers"), 0);
    assert_eq!(count(&conn, "teacher_subjects"), 0);
    assert_eq!(count(&conn, "teacher_attendance"), 0);
    assert!(matches!(
        coordinator.get_teacher_detail(teacher.id).unwrap_err(),
        CoordinatorError::TeacherNotFound(_)
    ));
}

#[test]
fn delete_unknown_teacher_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let missing = Uuid::new_v4();

    match coordinator.delete_teacher(missing).unwrap_err() {
        CoordinatorError::TeacherNotFound(id) => assert_eq!(id, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn scoped_teacher_delete_reports_counts_or_nothing_matched() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let (school, class, other_class) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let subjects = coordinator
        .create_subjects(
            class,
            school,
            &[NewSubject::new("Chem", "CHM", 2), NewSubject::new("Bio", "BIO", 2)],
        )
        .unwrap();

    for (email, class_id, subject) in [
        ("one@school.test", class, subjects[0].id),
        ("two@school.test", class, subjects[1].id),
        ("three@school.test", other_class, subjects[1].id),
    ] {
        coordinator
            .register_teacher(
                TeacherRegistration::new(email)
                    .name(email)
                    .password("pw")
                    .school(school)
                    .class(class_id)
                    .subjects([subject]),
            )
            .unwrap();
    }
    // "three" took Bio from "two", so only Chem still points into `class`.

    let outcome = coordinator.delete_teachers_by_class(class).unwrap();
    assert_eq!(
        outcome,
        BulkDeletion::Deleted(TeacherDeletionSummary {
            deleted: 2,
            subjects_unassigned: 1,
        })
    );
    assert!(!outcome.is_empty());

    let survivors = coordinator.list_teachers(school).unwrap();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].teacher.email, "three@school.test");
    assert_eq!(
        coordinator.get_subject_detail(subjects[1].id).unwrap().subject.teacher_id,
        Some(survivors[0].teacher.id)
    );

    let again = coordinator.delete_teachers_by_class(class).unwrap();
    assert_eq!(again, BulkDeletion::NothingMatched);
    assert!(again.is_empty());

    let by_school = coordinator.delete_teachers_by_school(school).unwrap();
    assert_eq!(
        by_school,
        BulkDeletion::Deleted(TeacherDeletionSummary {
            deleted: 1,
            subjects_unassigned: 1,
        })
    );
    assert_eq!(coordinator.list_subjects(school).unwrap().len(), 2);
    assert_eq!(count(&conn, "teacher_subjects"), 0);
}

#[test]
fn bulk_outcome_serializes_with_tag() {
    let deleted = BulkDeletion::Deleted(TeacherDeletionSummary {
        deleted: 3,
        subjects_unassigned: 4,
    });
    let json = serde_json::to_value(deleted).unwrap();
    assert_eq!(json["outcome"], "deleted");
    assert_eq!(json["deleted"], 3);

    let json = serde_json::to_value(BulkDeletion::<TeacherDeletionSummary>::NothingMatched).unwrap();
    assert_eq!(json["outcome"], "nothing_matched");
}
