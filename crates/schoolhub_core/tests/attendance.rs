use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use schoolhub_core::db::open_db_in_memory;
use schoolhub_core::{
    AttendanceEntry, AttendanceStatus, BcryptHasher, ConsistencyCoordinator, CoordinatorError,
    NewStudent, NewSubject, TeacherRegistration,
};
use uuid::Uuid;

fn coordinator(conn: &Connection) -> ConsistencyCoordinator<'_> {
    ConsistencyCoordinator::with_hasher(conn, BcryptHasher::with_cost(4))
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
}

#[test]
fn same_day_marks_overwrite_and_other_days_append_in_order() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let teacher = coordinator
        .register_teacher(
            TeacherRegistration::new("ravi@school.test")
                .name("Ravi")
                .password("pw")
                .school(Uuid::new_v4()),
        )
        .unwrap()
        .teacher;

    coordinator
        .mark_teacher_attendance(teacher.id, at(8, 7, 55), AttendanceStatus::Present)
        .unwrap();
    coordinator
        .mark_teacher_attendance(teacher.id, at(7, 9, 0), AttendanceStatus::Present)
        .unwrap();
    let updated = coordinator
        .mark_teacher_attendance(teacher.id, at(8, 23, 59), AttendanceStatus::Absent)
        .unwrap();

    let expected = vec![
        AttendanceEntry {
            date: date(7),
            status: AttendanceStatus::Present,
        },
        AttendanceEntry {
            date: date(8),
            status: AttendanceStatus::Absent,
        },
    ];
    assert_eq!(updated.attendance, expected);

    let reloaded = coordinator.get_teacher_detail(teacher.id).unwrap().teacher;
    assert_eq!(reloaded.attendance, expected);
}

#[test]
fn marking_unknown_teacher_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let err = coordinator
        .mark_teacher_attendance(Uuid::new_v4(), at(1, 8, 0), AttendanceStatus::Present)
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::TeacherNotFound(_)));
}

#[test]
fn student_records_upsert_per_subject_and_day() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let (school, class) = (Uuid::new_v4(), Uuid::new_v4());
    let subject = coordinator
        .create_subjects(class, school, &[NewSubject::new("Music", "MUS", 1)])
        .unwrap()
        .remove(0);
    let student = coordinator
        .register_student(NewStudent {
            name: " Leo ".to_string(),
            roll_number: 4,
            school_id: school,
            class_id: class,
        })
        .unwrap();
    assert_eq!(student.name, "Leo");
    assert!(!student.has_academic_records());

    coordinator.record_exam_result(student.id, subject.id, 40).unwrap();
    let student = coordinator.record_exam_result(student.id, subject.id, 72).unwrap();
    assert_eq!(student.exam_results.len(), 1);
    assert_eq!(student.exam_results[0].marks, 72);

    coordinator
        .mark_student_attendance(student.id, subject.id, at(3, 8, 0), AttendanceStatus::Absent)
        .unwrap();
    let student = coordinator
        .mark_student_attendance(student.id, subject.id, at(3, 14, 0), AttendanceStatus::Present)
        .unwrap();
    assert_eq!(student.attendance.len(), 1);
    assert_eq!(student.attendance[0].date, date(3));
    assert_eq!(student.attendance[0].status, AttendanceStatus::Present);
}

#[test]
fn student_records_require_existing_subject_and_student() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let (school, class) = (Uuid::new_v4(), Uuid::new_v4());
    let student = coordinator
        .register_student(NewStudent {
            name: "Ana".to_string(),
            roll_number: 1,
            school_id: school,
            class_id: class,
        })
        .unwrap();

    let missing_subject = Uuid::new_v4();
    match coordinator
        .record_exam_result(student.id, missing_subject, 10)
        .unwrap_err()
    {
        CoordinatorError::SubjectNotFound(id) => assert_eq!(id, missing_subject),
        other => panic!("unexpected error: {other}"),
    }

    let subject = coordinator
        .create_subjects(class, school, &[NewSubject::new("PE", "PE", 1)])
        .unwrap()
        .remove(0);
    let missing_student = Uuid::new_v4();
    match coordinator
        .mark_student_attendance(missing_student, subject.id, at(2, 8, 0), AttendanceStatus::Present)
        .unwrap_err()
    {
        CoordinatorError::StudentNotFound(id) => assert_eq!(id, missing_student),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        coordinator.get_student(missing_student).unwrap_err(),
        CoordinatorError::StudentNotFound(_)
    ));

    let blank = coordinator
        .register_student(NewStudent {
            name: "   ".to_string(),
            roll_number: 2,
            school_id: school,
            class_id: class,
        })
        .unwrap_err();
    assert!(matches!(blank, CoordinatorError::InvalidInput(_)));
}
