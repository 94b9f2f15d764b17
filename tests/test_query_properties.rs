use primerdb::catalog::Catalog;
use primerdb::executor::ExecutionEngine;
use primerdb::storage::{Tuple, Value};
use primerdb::Error;

fn scores_engine() -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(Catalog::new());
    engine
        .execute_sql("CREATE TABLE customers (id INT PRIMARY KEY, score INT)")
        .unwrap();
    engine
        .execute_sql("INSERT INTO customers VALUES (1, NULL), (2, 500), (3, 0)")
        .unwrap();
    engine
}

fn rows(engine: &mut ExecutionEngine, sql: &str) -> Vec<Tuple> {
    engine.execute_sql(sql).unwrap().rows
}

fn scalar(engine: &mut ExecutionEngine, sql: &str) -> Value {
    let rows = rows(engine, sql);
    assert_eq!(rows.len(), 1, "expected one row from {}", sql);
    rows[0].values()[0].clone()
}

#[test]
fn test_null_scores_scenario() {
    let mut engine = scores_engine();

    // Row 1 drops out on the NULL comparison, row 3 on the predicate
    assert_eq!(
        scalar(&mut engine, "SELECT AVG(score) FROM customers WHERE score != 0"),
        Value::Float(500.0)
    );

    let result = engine
        .execute_sql("UPDATE customers SET score = 0 WHERE score IS NULL")
        .unwrap();
    assert_eq!(result.affected_rows, 1);
    assert_eq!(
        scalar(&mut engine, "SELECT COUNT(*) FROM customers WHERE score = 0"),
        Value::Integer(2)
    );
}

#[test]
fn test_limit_larger_than_input() {
    let mut engine = scores_engine();
    assert_eq!(rows(&mut engine, "SELECT * FROM customers LIMIT 10").len(), 3);
    assert_eq!(rows(&mut engine, "SELECT TOP 10 * FROM customers").len(), 3);
    assert!(rows(&mut engine, "SELECT * FROM customers LIMIT 0").is_empty());
}

#[test]
fn test_avg_of_all_null_partition() {
    let mut engine = scores_engine();
    engine
        .execute_sql("ALTER TABLE customers ADD COLUMN region VARCHAR(10)")
        .unwrap();
    engine
        .execute_sql("UPDATE customers SET region = 'north' WHERE id = 1")
        .unwrap();
    engine
        .execute_sql("UPDATE customers SET region = 'south' WHERE id <> 1")
        .unwrap();

    let result = rows(
        &mut engine,
        "SELECT region, AVG(score), SUM(score), COUNT(score) FROM customers GROUP BY region",
    );
    assert_eq!(
        result[0].values(),
        &[Value::from("north"), Value::Null, Value::Null, Value::Integer(0)]
    );
    assert_eq!(
        result[1].values(),
        &[
            Value::from("south"),
            Value::Float(250.0),
            Value::Integer(500),
            Value::Integer(2)
        ]
    );
}

#[test]
fn test_desc_reverses_asc_except_ties() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());
    let asc = rows(&mut engine, "SELECT country, first_name FROM customers ORDER BY country");
    let desc = rows(&mut engine, "SELECT country, first_name FROM customers ORDER BY country DESC");

    let countries = |rows: &[Tuple]| -> Vec<Value> { rows.iter().map(|r| r.values()[0].clone()).collect() };
    let mut reversed = countries(&asc);
    reversed.reverse();
    assert_eq!(countries(&desc), reversed);

    // Within each tie group both directions keep insertion order
    let names_for = |rows: &[Tuple], country: &str| -> Vec<Value> {
        rows.iter()
            .filter(|r| r.values()[0] == Value::from(country))
            .map(|r| r.values()[1].clone())
            .collect()
    };
    for country in ["Germany", "USA"] {
        assert_eq!(names_for(&asc, country), names_for(&desc, country));
    }
    assert_eq!(
        names_for(&asc, "Germany"),
        vec![Value::from("Maria"), Value::from("Martin")]
    );
}

#[test]
fn test_distinct_is_idempotent() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());
    let once = rows(&mut engine, "SELECT DISTINCT country FROM customers");

    engine
        .execute_sql("CREATE TABLE countries (name VARCHAR(50))")
        .unwrap();
    engine
        .execute_sql("INSERT INTO countries SELECT DISTINCT country FROM customers")
        .unwrap();
    let twice = rows(&mut engine, "SELECT DISTINCT name FROM countries");
    assert_eq!(once, twice);
    assert_eq!(once.len(), 3);
}

#[test]
fn test_type_mismatch_leaves_table_unchanged() {
    let mut engine = scores_engine();
    let before = rows(&mut engine, "SELECT * FROM customers");

    let err = engine
        .execute_sql("INSERT INTO customers VALUES (4, 10), (5, 'ten')")
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert_eq!(rows(&mut engine, "SELECT * FROM customers"), before);
}

#[test]
fn test_dropped_table_is_unknown() {
    let mut engine = scores_engine();
    engine.execute_sql("DROP TABLE customers").unwrap();

    for sql in [
        "SELECT * FROM customers",
        "INSERT INTO customers VALUES (4, 1)",
        "UPDATE customers SET score = 1",
        "DELETE FROM customers",
        "TRUNCATE TABLE customers",
        "ALTER TABLE customers ADD note TEXT",
        "DROP TABLE customers",
    ] {
        assert!(
            matches!(engine.execute_sql(sql), Err(Error::UnknownTable(_))),
            "{} should fail with UnknownTable",
            sql
        );
    }
}

#[test]
fn test_ungrouped_column_is_an_invalid_projection() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());
    let err = engine
        .execute_sql("SELECT country, first_name, SUM(score) FROM customers GROUP BY country")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidProjection(_)));
}

#[test]
fn test_alter_add_backfills_null() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());
    engine
        .execute_sql("ALTER TABLE customers ADD email VARCHAR(50)")
        .unwrap();
    let emails = rows(&mut engine, "SELECT email FROM customers");
    assert_eq!(emails.len(), 5);
    assert!(emails.iter().all(|r| r.values() == [Value::Null]));

    engine
        .execute_sql("INSERT INTO customers (id, first_name, email) VALUES (6, 'Anna', 'a@b.c')")
        .unwrap();
    assert_eq!(
        scalar(&mut engine, "SELECT email FROM customers WHERE id = 6"),
        Value::from("a@b.c")
    );
}

#[test]
fn test_insert_select_arity_mismatch_leaves_table_unchanged() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());

    let err = engine
        .execute_sql("INSERT INTO persons SELECT id, first_name FROM customers")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ArityMismatch {
            expected: 4,
            found: 2
        }
    ));
    assert_eq!(
        scalar(&mut engine, "SELECT COUNT(*) FROM persons"),
        Value::Integer(0)
    );
}

#[test]
fn test_omitted_not_null_column_is_rejected() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());

    // phone is NOT NULL without a default
    let err = engine
        .execute_sql("INSERT INTO persons (id, person_name) VALUES (1, 'Ann')")
        .unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)));
    assert_eq!(
        scalar(&mut engine, "SELECT COUNT(*) FROM persons"),
        Value::Integer(0)
    );
}

#[test]
fn test_only_one_statement_per_call() {
    let mut engine = ExecutionEngine::new(Catalog::with_examples().unwrap());

    let err = engine
        .execute_sql("SELECT 1; DROP TABLE customers")
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedToken { .. }));
    assert!(engine.catalog().get_table("customers").is_ok());
}
