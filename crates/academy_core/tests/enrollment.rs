use academy_core::docstore::Filter;
use academy_core::{
    collections, Conditions, DocumentBackend, DocumentManager, EnrollmentService, Fixture,
    PersonRecord, SeedReport, SqliteManager, StoreError, Student, Table, ValidationError,
};
use rusqlite::types::Value;
use std::collections::HashSet;

const FIXTURE: &str = r#"{
    "advisors": [
        {"name": "Nino", "surname": "Beridze", "age": 45},
        {"name": "Giorgi", "surname": "Kapanadze", "age": 51},
        {"name": "Tamar", "surname": "Jishkariani", "age": 39}
    ],
    "students": [
        {"name": "Ana", "surname": "Lomidze", "age": 20},
        {"name": "Luka", "surname": "Tsiklauri", "age": 22}
    ]
}"#;

fn relational() -> SqliteManager {
    let mut manager = SqliteManager::open_in_memory().unwrap();
    manager.create_schema().unwrap();
    manager
}

fn document_store() -> (tempfile::TempDir, DocumentManager) {
    let dir = tempfile::tempdir().unwrap();
    let manager = DocumentManager::open(dir.path().join("academy")).unwrap();
    for name in collections::ALL {
        manager.ensure_collection(name).unwrap();
    }
    (dir, manager)
}

fn relational_links(manager: &SqliteManager, student_id: i64) -> Vec<i64> {
    manager
        .search(
            Table::StudentAdvisor,
            &["advisor_id"],
            &Conditions::new().eq("student_id", student_id),
        )
        .unwrap()
        .into_iter()
        .map(|row| match row[0] {
            Value::Integer(id) => id,
            ref other => panic!("unexpected advisor id {other:?}"),
        })
        .collect()
}

fn document_links(manager: &DocumentManager, student_id: i64) -> Vec<i64> {
    manager
        .backend()
        .find(
            collections::STUDENT_ADVISOR,
            Filter::all().eq("student_id", student_id),
            None,
        )
        .unwrap()
        .map(|document| document.unwrap()["advisor_id"].as_i64().unwrap())
        .collect()
}

fn assert_distinct_known_links(links: &[i64], expected_len: usize) {
    let distinct = links.iter().copied().collect::<HashSet<_>>();
    assert_eq!(links.len(), expected_len);
    assert_eq!(distinct.len(), expected_len);
    assert!(links.iter().all(|id| (1..=3).contains(id)));
}

#[test]
fn relational_seed_gives_every_student_exactly_quota_links() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let manager = relational();
    let service = EnrollmentService::new(&manager);

    let report = service.seed(&fixture, 2).unwrap();
    assert_eq!(
        report,
        SeedReport {
            advisors_inserted: 3,
            students_inserted: 2,
            links_inserted: 4,
        }
    );

    for student_id in [1, 2] {
        assert_distinct_known_links(&relational_links(&manager, student_id), 2);
    }
}

#[test]
fn relational_reseed_is_idempotent_for_entities_and_saturated_links() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let manager = relational();
    let service = EnrollmentService::new(&manager);

    service.seed(&fixture, 2).unwrap();
    let second = service.seed(&fixture, 2).unwrap();

    assert_eq!(second, SeedReport::default());
    assert_eq!(manager.load_all(Table::Advisors).unwrap().len(), 3);
    assert_eq!(manager.load_all(Table::Students).unwrap().len(), 2);
    assert_eq!(manager.load_all(Table::StudentAdvisor).unwrap().len(), 4);
}

#[test]
fn quota_above_advisor_count_links_every_advisor_once() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let manager = relational();
    let service = EnrollmentService::new(&manager);

    service.seed(&fixture, 5).unwrap();
    service.seed(&fixture, 5).unwrap();

    for student_id in [1, 2] {
        assert_distinct_known_links(&relational_links(&manager, student_id), 3);
    }
}

#[test]
fn document_seed_gives_every_student_exactly_quota_links() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let (_dir, manager) = document_store();
    let service = EnrollmentService::new(&manager);

    let report = service.seed(&fixture, 2).unwrap();
    assert_eq!(report.advisors_inserted, 3);
    assert_eq!(report.students_inserted, 2);
    assert_eq!(report.links_inserted, 4);

    for student_id in [1, 2] {
        assert_distinct_known_links(&document_links(&manager, student_id), 2);
    }

    let again = service.seed(&fixture, 2).unwrap();
    assert_eq!(again, SeedReport::default());
    assert_eq!(
        manager
            .backend()
            .count_documents(collections::STUDENT_ADVISOR, &Filter::all())
            .unwrap(),
        4
    );
}

#[test]
fn document_quota_above_advisor_count_never_duplicates_pairs() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let (_dir, manager) = document_store();
    let service = EnrollmentService::new(&manager);

    service.seed(&fixture, 5).unwrap();
    service.seed(&fixture, 5).unwrap();

    for student_id in [1, 2] {
        assert_distinct_known_links(&document_links(&manager, student_id), 3);
    }
}

#[test]
fn invalid_student_is_rejected_before_any_write() {
    let manager = relational();
    let service = EnrollmentService::new(&manager);
    let student = Student::new(
        1,
        PersonRecord {
            name: " ".to_string(),
            surname: "Lomidze".to_string(),
            age: 20,
        },
        2,
    );

    let err = service.add_student(&student).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::BlankField("name"))
    ));
    assert!(manager.load_all(Table::Students).unwrap().is_empty());
}

#[test]
fn linking_without_advisors_adds_nothing() {
    let manager = relational();
    let service = EnrollmentService::new(&manager);
    let student = Student::new(
        1,
        PersonRecord {
            name: "Ana".to_string(),
            surname: "Lomidze".to_string(),
            age: 20,
        },
        2,
    );

    service.add_student(&student).unwrap();
    assert_eq!(service.link_advisors(&student).unwrap(), 0);
}
