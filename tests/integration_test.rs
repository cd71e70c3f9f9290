use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::str;

use tempfile::NamedTempFile;

#[test]
fn empty_select_prints_only_executed() {
    let db = NamedTempFile::new().unwrap();
    let input = vec!["select".to_owned(), ".exit".to_owned()];

    let output = spawn_rowkeep(db.path().to_str().unwrap(), input);

    assert_eq!(output, vec!["db > Executed.".to_owned(), "db > Bye!".to_owned()]);
}

#[test]
fn insert_and_select_round_trip() {
    let db = NamedTempFile::new().unwrap();
    let input = vec![
        "insert 1 alice alice@x".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = spawn_rowkeep(db.path().to_str().unwrap(), input);

    assert_eq!(
        output,
        vec![
            "db > Executed.".to_owned(),
            "db > (1, alice, alice@x)".to_owned(),
            "Executed.".to_owned(),
            "db > Bye!".to_owned(),
        ]
    );
}

#[test]
fn duplicate_key_is_rejected_and_does_not_appear_in_select() {
    let db = NamedTempFile::new().unwrap();
    let input = vec![
        "insert 1 alice alice@x".to_owned(),
        "insert 1 bob bob@y".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = spawn_rowkeep(db.path().to_str().unwrap(), input);

    assert_eq!(
        output,
        vec![
            "db > Executed.".to_owned(),
            "db > Error: Duplicate key.".to_owned(),
            "db > (1, alice, alice@x)".to_owned(),
            "Executed.".to_owned(),
            "db > Bye!".to_owned(),
        ]
    );
}

#[test]
fn data_persists_after_reopening_the_database() {
    let db = NamedTempFile::new().unwrap();
    let path = db.path().to_str().unwrap();

    let first_run = spawn_rowkeep(
        path,
        vec!["insert 1 alice alice@x".to_owned(), ".exit".to_owned()],
    );
    assert_eq!(
        first_run,
        vec!["db > Executed.".to_owned(), "db > Bye!".to_owned()]
    );

    let second_run = spawn_rowkeep(path, vec!["select".to_owned(), ".exit".to_owned()]);
    assert_eq!(
        second_run,
        vec![
            "db > (1, alice, alice@x)".to_owned(),
            "Executed.".to_owned(),
            "db > Bye!".to_owned(),
        ]
    );
}

#[test]
fn out_of_order_inserts_are_returned_in_ascending_order() {
    let db = NamedTempFile::new().unwrap();
    let input = vec![
        "insert 3 carol carol@x".to_owned(),
        "insert 1 alice alice@x".to_owned(),
        "insert 2 bob bob@x".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ];

    let output = spawn_rowkeep(db.path().to_str().unwrap(), input);

    assert_eq!(
        output,
        vec![
            "db > Executed.".to_owned(),
            "db > Executed.".to_owned(),
            "db > Executed.".to_owned(),
            "db > (1, alice, alice@x)".to_owned(),
            "(2, bob, bob@x)".to_owned(),
            "(3, carol, carol@x)".to_owned(),
            "Executed.".to_owned(),
            "db > Bye!".to_owned(),
        ]
    );
}

#[test]
fn inserting_a_fourteenth_row_splits_the_root_leaf() {
    let db = NamedTempFile::new().unwrap();
    let mut input: Vec<String> = (1..=14)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push("select".to_owned());
    input.push(".btree".to_owned());
    input.push(".exit".to_owned());

    let output = spawn_rowkeep(db.path().to_str().unwrap(), input);
    let joined = output.join("\n");

    for i in 1..=14 {
        assert!(
            joined.contains(&format!("({i}, user{i}, person{i}@example.com)")),
            "missing row {i} in select output: {joined}"
        );
    }

    assert!(joined.contains("- internal (size 1)"));
    assert!(joined.contains("- leaf (size 7)"));
    assert!(joined.contains("- key 7"));
}

fn spawn_rowkeep(database: &str, input: Vec<String>) -> Vec<String> {
    let mut process = rowkeep_exe()
        .arg(database)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Unable to start the process.");

    let stdin = process
        .stdin
        .as_mut()
        .expect("Unable to pipe stdin to process.");

    for line in input {
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .unwrap_or_else(|_| panic!("Unable to write command `{line}`"));
    }

    let output = process
        .wait_with_output()
        .expect("Unable to get output from the process.");

    str::from_utf8(&output.stdout)
        .expect("Could not get process output.")
        .lines()
        .map(str::to_owned)
        .collect()
}

fn rowkeep_exe() -> Command {
    let target_dir = env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .expect("this should only be used where a `current_exe` can be set");
    let rowkeep_exe = target_dir.join(format!("rowkeep{}", env::consts::EXE_SUFFIX));
    Command::new(rowkeep_exe)
}
