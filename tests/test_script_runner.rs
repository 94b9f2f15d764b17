use std::io::Write;

use primerdb::format::OutputFormat;
use primerdb::{Error, RunnerConfig, ScriptError, ScriptRunner};

fn script_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_run_file_fail_fast() {
    let file = script_file(
        "-- create and fill a table\n\
         CREATE TABLE persons2 (id INT NOT NULL, name VARCHAR(20) NOT NULL, PRIMARY KEY (id));\n\
         INSERT INTO persons2 VALUES (1, 'Ann');\n\
         INSERT INTO persons2 VALUES (1, 'Bob');\n\
         INSERT INTO persons2 VALUES (2, 'Cid');\n",
    );

    let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
    let mut out = Vec::new();
    let err = runner.run_file(file.path(), &mut out).unwrap_err();

    match &err {
        ScriptError::Statement { index, sql, source } => {
            assert_eq!(*index, 3);
            assert_eq!(sql, "INSERT INTO persons2 VALUES (1, 'Bob')");
            assert!(matches!(source, Error::ConstraintViolation(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }

    // The statement after the failure never ran
    let table = runner.engine().catalog().get_table("persons2").unwrap();
    assert_eq!(table.row_count(), 1);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Table 'persons2' created"));
    assert!(out.contains("1 row(s) inserted"));
}

#[test]
fn test_missing_file() {
    let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = runner
        .run_file(&dir.path().join("missing.sql"), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, ScriptError::Read { .. }));
}

#[test]
fn test_semicolons_in_strings_and_comments() {
    let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
    let mut out = Vec::new();
    let count = runner
        .run_script(
            "/* one; two */ UPDATE customers SET country = 'A;B' WHERE id = 1;\n\
             SELECT country FROM customers WHERE id = 1; -- trailing; comment",
            &mut out,
        )
        .unwrap();
    assert_eq!(count, 2);
    assert!(String::from_utf8(out).unwrap().contains("| A;B     |"));
}

#[test]
fn test_json_output() {
    let config = RunnerConfig::new().format(OutputFormat::Json);
    let mut runner = ScriptRunner::new(config).unwrap();
    let mut out = Vec::new();
    runner
        .run_script("SELECT COUNT(*) AS total FROM orders", &mut out)
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["columns"][0], "total");
    assert_eq!(json["rows"][0][0], 4);
}

#[test]
fn test_tutorial_script_runs() {
    let script = include_str!("../demos/tutorial.sql");
    let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
    let mut out = Vec::new();
    let count = runner.run_script(script, &mut out).unwrap();
    assert!(count > 20);
    assert!(!runner.engine().catalog().table_exists("persons"));
}
