use rusqlite::Connection;
use schoolhub_core::db::open_db_in_memory;
use schoolhub_core::{
    BcryptHasher, ConsistencyCoordinator, CoordinatorError, NewSubject, Subject,
    TeacherRegistration,
};
use uuid::Uuid;

fn coordinator(conn: &Connection) -> ConsistencyCoordinator<'_> {
    ConsistencyCoordinator::with_hasher(conn, BcryptHasher::with_cost(4))
}

fn subjects(coordinator: &ConsistencyCoordinator<'_>, school: Uuid, codes: &[&str]) -> Vec<Subject> {
    let batch: Vec<NewSubject> = codes
        .iter()
        .map(|code| NewSubject::new(format!("Subject {code}"), *code, 1))
        .collect();
    coordinator
        .create_subjects(Uuid::new_v4(), school, &batch)
        .unwrap()
}

fn new_teacher(email: &str, school: Uuid) -> TeacherRegistration {
    TeacherRegistration::new(email)
        .name("Ines")
        .password("first-pass")
        .school(school)
}

fn teacher_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM teachers;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn re_registering_unions_subject_sets() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let s = subjects(&coordinator, school, &["A", "B", "C"]);

    let first = coordinator
        .register_teacher(new_teacher("ines@school.test", school).subjects([s[0].id, s[1].id]))
        .unwrap();
    let second = coordinator
        .register_teacher(TeacherRegistration::new("ines@school.test").subjects([s[1].id, s[2].id]))
        .unwrap();

    assert_eq!(teacher_rows(&conn), 1);
    assert_eq!(first.teacher.id, second.teacher.id);
    assert_eq!(second.teacher.name, "Ines");
    assert_eq!(second.teacher.role, "Teacher");
    let expected: Vec<Uuid> = {
        let mut ids = vec![s[0].id, s[1].id, s[2].id];
        ids.sort();
        ids
    };
    assert_eq!(
        second.teacher.subject_ids.iter().copied().collect::<Vec<_>>(),
        expected
    );
    assert_eq!(second.subjects.len(), 3);
    assert!(second
        .subjects
        .iter()
        .all(|subject| subject.teacher_id == Some(second.teacher.id)));
}

#[test]
fn merge_overwrites_only_provided_fields() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let class = Uuid::new_v4();

    coordinator
        .register_teacher(new_teacher("ines@school.test", school).class(class))
        .unwrap();
    let updated = coordinator
        .register_teacher(TeacherRegistration::new("  INES@School.Test ").role("Head of Science"))
        .unwrap()
        .teacher;

    assert_eq!(updated.email, "ines@school.test");
    assert_eq!(updated.role, "Head of Science");
    assert_eq!(updated.name, "Ines");
    assert_eq!(updated.school_id, school);
    assert_eq!(updated.class_id, Some(class));

    // No password on merge keeps the stored hash.
    coordinator
        .authenticate_teacher("ines@school.test", "first-pass")
        .unwrap();

    coordinator
        .register_teacher(TeacherRegistration::new("ines@school.test").password("second-pass"))
        .unwrap();
    assert!(matches!(
        coordinator
            .authenticate_teacher("ines@school.test", "first-pass")
            .unwrap_err(),
        CoordinatorError::InvalidCredential
    ));
    coordinator
        .authenticate_teacher("ines@school.test", "second-pass")
        .unwrap();
}

#[test]
fn assigning_owned_subject_moves_it_between_teachers() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let s = subjects(&coordinator, school, &["A", "B"]);

    let first = coordinator
        .register_teacher(new_teacher("first@school.test", school).subjects([s[0].id, s[1].id]))
        .unwrap()
        .teacher;
    let second = coordinator
        .register_teacher(new_teacher("second@school.test", school).subjects([s[0].id]))
        .unwrap()
        .teacher;

    let first = coordinator.get_teacher_detail(first.id).unwrap().teacher;
    assert!(!first.teaches(s[0].id));
    assert!(first.teaches(s[1].id));
    assert!(second.teaches(s[0].id));

    let detail = coordinator.get_subject_detail(s[0].id).unwrap();
    assert_eq!(detail.subject.teacher_id, Some(second.id));
}

#[test]
fn unknown_subject_rolls_back_registration() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let s = subjects(&coordinator, school, &["A"]);
    let missing = Uuid::new_v4();

    let err = coordinator
        .register_teacher(new_teacher("ghost@school.test", school).subjects([s[0].id, missing]))
        .unwrap_err();

    match err {
        CoordinatorError::SubjectNotFound(id) => assert_eq!(id, missing),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(teacher_rows(&conn), 0);
    assert!(coordinator.get_subject_detail(s[0].id).unwrap().teacher.is_none());
}

#[test]
fn new_teacher_requires_identity_fields() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();

    let cases = [
        TeacherRegistration::new("not-an-email").name("X").password("p").school(school),
        TeacherRegistration::new("a@school.test").password("p").school(school),
        TeacherRegistration::new("a@school.test").name("X").school(school),
        TeacherRegistration::new("a@school.test").name("X").password("p"),
        TeacherRegistration::new("a@school.test").name("  ").password("p").school(school),
        TeacherRegistration::new("a@school.test").name("X").password("").school(school),
    ];
    for registration in cases {
        let err = coordinator.register_teacher(registration).unwrap_err();
        assert!(
            matches!(err, CoordinatorError::InvalidInput(_)),
            "unexpected error: {err}"
        );
    }
    assert_eq!(teacher_rows(&conn), 0);
}

#[test]
fn append_subjects_merges_into_existing_teacher() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let s = subjects(&coordinator, school, &["A", "B"]);

    let teacher = coordinator
        .register_teacher(new_teacher("ines@school.test", school).subjects([s[0].id]))
        .unwrap()
        .teacher;
    let detail = coordinator
        .append_teacher_subjects(teacher.id, &[s[0].id, s[1].id, s[1].id])
        .unwrap();

    assert_eq!(detail.teacher.subject_ids.len(), 2);
    assert_eq!(detail.subjects.len(), 2);

    let missing = Uuid::new_v4();
    match coordinator
        .append_teacher_subjects(missing, &[s[0].id])
        .unwrap_err()
    {
        CoordinatorError::TeacherNotFound(id) => assert_eq!(id, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn authentication_outcomes_are_distinct() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    coordinator
        .register_teacher(new_teacher("ines@school.test", Uuid::new_v4()))
        .unwrap();

    let detail = coordinator
        .authenticate_teacher(" Ines@School.test", "first-pass")
        .unwrap();
    assert_eq!(detail.teacher.email, "ines@school.test");

    let wrong = coordinator
        .authenticate_teacher("ines@school.test", "nope")
        .unwrap_err();
    assert!(matches!(wrong, CoordinatorError::InvalidCredential));
    assert_eq!(wrong.code(), "invalid_credential");

    let unknown = coordinator
        .authenticate_teacher("nobody@school.test", "first-pass")
        .unwrap_err();
    assert!(matches!(unknown, CoordinatorError::TeacherEmailNotFound(_)));
    assert_eq!(unknown.code(), "not_found");

    // Stored emails are always well formed, so a malformed login is unknown too.
    match coordinator
        .authenticate_teacher(" NoBody ", "first-pass")
        .unwrap_err()
    {
        CoordinatorError::TeacherEmailNotFound(email) => assert_eq!(email, "nobody"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn serialized_teachers_never_carry_credentials() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let school = Uuid::new_v4();
    let s = subjects(&coordinator, school, &["A"]);
    let detail = coordinator
        .register_teacher(new_teacher("ines@school.test", school).subjects([s[0].id]))
        .unwrap();

    let stored_hash: String = conn
        .query_row("SELECT password_hash FROM teachers;", [], |row| row.get(0))
        .unwrap();
    assert!(stored_hash.starts_with("$2"));
    assert_ne!(stored_hash, "first-pass");

    let listed = coordinator.list_teachers(school).unwrap();
    for json in [
        serde_json::to_string(&detail).unwrap(),
        serde_json::to_string(&listed).unwrap(),
    ] {
        assert!(!json.contains("password"));
        assert!(!json.contains(&stored_hash));
        assert!(json.contains("ines@school.test"));
    }
}

#[test]
fn list_teachers_is_scoped_and_sorted() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let (school, other) = (Uuid::new_v4(), Uuid::new_v4());

    for (email, name, school_id) in [
        ("zoe@school.test", "Zoe", school),
        ("amir@school.test", "Amir", school),
        ("kai@other.test", "Kai", other),
    ] {
        coordinator
            .register_teacher(
                TeacherRegistration::new(email)
                    .name(name)
                    .password("pw")
                    .school(school_id),
            )
            .unwrap();
    }

    let names: Vec<String> = coordinator
        .list_teachers(school)
        .unwrap()
        .into_iter()
        .map(|detail| detail.teacher.name)
        .collect();
    assert_eq!(names, vec!["Amir", "Zoe"]);
    assert!(coordinator.list_teachers(Uuid::new_v4()).unwrap().is_empty());
}
