use academy_core::{
    AcademyStore, Assignments, Conditions, RepoError, SqliteManager, StudentAdvisorLink, Table,
};
use rusqlite::types::Value;
use std::collections::HashSet;

fn setup() -> SqliteManager {
    let mut manager = SqliteManager::open_in_memory().unwrap();
    manager.create_schema().unwrap();
    manager
}

fn person(id: i64, name: &str, age: i64) -> Vec<Value> {
    vec![
        Value::Integer(id),
        Value::Text(name.to_string()),
        Value::Text("Surname".to_string()),
        Value::Integer(age),
    ]
}

fn seed_advisors(manager: &SqliteManager, count: i64) {
    for id in 1..=count {
        assert!(manager
            .insert_record(Table::Advisors, &person(id, &format!("Advisor{id}"), 40))
            .unwrap());
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

#[test]
fn inserting_the_same_id_twice_keeps_one_row() {
    let manager = setup();

    assert!(manager
        .insert_record(Table::Students, &person(1, "Ana", 20))
        .unwrap());
    assert!(!manager
        .insert_record(Table::Students, &person(1, "Other", 99))
        .unwrap());

    let rows = manager.load_all(Table::Students).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], text("Ana"));
}

#[test]
fn duplicate_link_pair_is_ignored() {
    let manager = setup();
    seed_advisors(&manager, 1);
    manager
        .insert_record(Table::Students, &person(1, "Ana", 20))
        .unwrap();

    let link = [Value::Integer(1), Value::Integer(1)];
    assert!(manager.insert_record(Table::StudentAdvisor, &link).unwrap());
    assert!(!manager.insert_record(Table::StudentAdvisor, &link).unwrap());
    assert_eq!(manager.load_all(Table::StudentAdvisor).unwrap().len(), 1);
}

#[test]
fn link_to_missing_advisor_is_an_error() {
    let manager = setup();
    manager
        .insert_record(Table::Students, &person(1, "Ana", 20))
        .unwrap();

    let err = manager
        .insert_record(
            Table::StudentAdvisor,
            &[Value::Integer(1), Value::Integer(42)],
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn insert_with_wrong_arity_is_rejected() {
    let manager = setup();
    let err = manager
        .insert_record(Table::Advisors, &[Value::Integer(1)])
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ArityMismatch {
            table: "advisors",
            expected: 4,
            actual: 1
        }
    ));
}

#[test]
fn sample_random_rows_returns_min_of_n_and_table_size_distinct_rows() {
    let manager = setup();
    seed_advisors(&manager, 5);

    assert!(manager
        .sample_random_rows(Table::Advisors, 0)
        .unwrap()
        .is_empty());

    for (requested, expected) in [(1, 1), (3, 3), (5, 5), (10, 5)] {
        let rows = manager.sample_random_rows(Table::Advisors, requested).unwrap();
        let ids = rows.iter().map(|row| row[0].clone()).collect::<Vec<_>>();
        let distinct = rows
            .iter()
            .map(|row| match row[0] {
                Value::Integer(id) => id,
                ref other => panic!("unexpected id {other:?}"),
            })
            .collect::<HashSet<_>>();

        assert_eq!(ids.len(), expected);
        assert_eq!(distinct.len(), expected);
        assert!(distinct.iter().all(|id| (1..=5).contains(id)));
        assert!(rows.iter().all(|row| row.len() == 4));
    }
}

#[test]
fn sampling_an_empty_table_returns_nothing() {
    let manager = setup();
    assert!(manager
        .sample_random_rows(Table::Students, 3)
        .unwrap()
        .is_empty());
}

#[test]
fn count_relations_counts_matching_rows() {
    let manager = setup();
    seed_advisors(&manager, 3);
    manager
        .insert_record(Table::Students, &person(1, "Ana", 20))
        .unwrap();
    manager
        .insert_record(Table::Students, &person(2, "Beka", 21))
        .unwrap();
    for (student, advisor) in [(1, 1), (1, 2), (2, 3)] {
        manager
            .insert_record(
                Table::StudentAdvisor,
                &[Value::Integer(student), Value::Integer(advisor)],
            )
            .unwrap();
    }

    assert_eq!(
        manager
            .count_relations(Table::StudentAdvisor, "student_id", 1_i64)
            .unwrap(),
        2
    );
    assert_eq!(
        manager
            .count_relations(Table::StudentAdvisor, "student_id", 3_i64)
            .unwrap(),
        0
    );
}

#[test]
fn delete_by_key_removes_matching_rows_only() {
    let manager = setup();
    seed_advisors(&manager, 3);

    let removed = manager
        .delete_by_key(Table::Advisors, "advisor_id", 2_i64)
        .unwrap();
    assert_eq!(removed, 1);

    let remaining = manager
        .load_all(Table::Advisors)
        .unwrap()
        .into_iter()
        .map(|row| row[0].clone())
        .collect::<Vec<_>>();
    assert_eq!(remaining, vec![Value::Integer(1), Value::Integer(3)]);
}

#[test]
fn load_all_returns_rows_in_insertion_order() {
    let manager = setup();
    for (id, name) in [(3, "C"), (1, "A"), (2, "B")] {
        manager
            .insert_record(Table::Students, &person(id, name, 20))
            .unwrap();
    }

    let names = manager
        .load_all(Table::Students)
        .unwrap()
        .into_iter()
        .map(|row| row[1].clone())
        .collect::<Vec<_>>();
    // INTEGER PRIMARY KEY is the rowid, so rowid order is id order.
    assert_eq!(names, vec![text("A"), text("B"), text("C")]);
}

#[test]
fn search_projects_and_filters() {
    let manager = setup();
    manager
        .insert_record(Table::Students, &person(1, "A", 20))
        .unwrap();
    manager
        .insert_record(Table::Students, &person(2, "B", 30))
        .unwrap();

    let everything = manager
        .search(Table::Students, &[], &Conditions::new())
        .unwrap();
    assert_eq!(everything.len(), 2);
    assert_eq!(everything[0].len(), 4);

    let matched = manager
        .search(
            Table::Students,
            &["name", "age"],
            &Conditions::new()
                .eq("age", 30_i64)
                .eq("surname", "Surname".to_string()),
        )
        .unwrap();
    assert_eq!(matched, vec![vec![text("B"), Value::Integer(30)]]);
}

#[test]
fn update_changes_only_rows_matching_every_condition() {
    let manager = setup();
    for (id, name, age) in [(1, "A", 20), (2, "B", 20), (3, "C", 30)] {
        manager
            .insert_record(Table::Students, &person(id, name, age))
            .unwrap();
    }

    let changed = manager
        .update(
            Table::Students,
            &Assignments::new().eq("name", "Z".to_string()),
            &Conditions::new().eq("age", 20_i64),
        )
        .unwrap();
    assert_eq!(changed, 2);

    let renamed = manager
        .search(
            Table::Students,
            &["student_id"],
            &Conditions::new().eq("name", "Z".to_string()),
        )
        .unwrap();
    assert_eq!(renamed.len(), 2);

    let untouched = manager
        .search(
            Table::Students,
            &["name"],
            &Conditions::new().eq("student_id", 3_i64),
        )
        .unwrap();
    assert_eq!(untouched, vec![vec![text("C")]]);
}

#[test]
fn update_with_unknown_column_is_rejected_before_execution() {
    let manager = setup();
    let err = manager
        .update(
            Table::Students,
            &Assignments::new().eq("nickname", "Z".to_string()),
            &Conditions::new().eq("age", 20_i64),
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { table: "students", .. }));
}

#[test]
fn conditional_link_stops_at_quota() {
    let manager = setup();
    seed_advisors(&manager, 3);
    manager
        .insert_record(Table::Students, &person(1, "Ana", 20))
        .unwrap();

    assert!(manager
        .link_if_below_quota(StudentAdvisorLink::new(1, 1), 2)
        .unwrap());
    assert!(!manager
        .link_if_below_quota(StudentAdvisorLink::new(1, 1), 2)
        .unwrap());
    assert!(manager
        .link_if_below_quota(StudentAdvisorLink::new(1, 2), 2)
        .unwrap());
    assert!(!manager
        .link_if_below_quota(StudentAdvisorLink::new(1, 3), 2)
        .unwrap());

    assert_eq!(manager.advisor_link_count(1).unwrap(), 2);
}
