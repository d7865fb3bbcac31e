// tests/integration_runner.rs
//! End-to-end unit test runs. Each test returns early when no `python3`
//! interpreter is available.

use std::fs;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;
use unicity_core::project::{Project, ProjectOptions, TestStatus};
use unicity_core::report::Summary;
use unicity_core::roster::Roster;
use unicity_core::testing::{run, RunOptions, UnitTest};
use unicity_core::{UnicityConfig, UnicityError};

const GOOD: &str = "def add(a, b):\n    return a + b\n";
const WRONG: &str = "def add(a, b):\n    return a - b\n";
const BROKEN: &str = "def add(a, b:\n    return a\n";
const HANGS: &str = "def add(a, b):\n    while True:\n        pass\n";

const TEST_BODY: &str = "def test_add():\n    from sub import add\n    assert add(2, 3) == 5\n";

fn have_python() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn cohort(files: &[(&str, &str)], roster: Option<Roster>) -> (TempDir, Project) {
    let d = tempfile::tempdir().unwrap();
    let root = d.path().join("hw");
    fs::create_dir(&root).unwrap();
    for (name, body) in files {
        fs::write(root.join(name), body).unwrap();
    }
    let mut opts = ProjectOptions::new(["sub.py", "main.py"]).workdir(d.path());
    if let Some(r) = roster {
        opts = opts.roster(r);
    }
    let project = Project::open(&root, opts).unwrap();
    (d, project)
}

fn options() -> RunOptions {
    RunOptions::from_config(&UnicityConfig::default())
}

#[test]
fn statuses_cover_pass_fail_missing_compile_and_absent() {
    if !have_python() {
        return;
    }
    let (d, mut project) = cohort(
        &[
            ("alice_sub.py", GOOD),
            ("bob_sub.py", WRONG),
            ("carol_main.py", "print('hi')\n"),
            ("erin_sub.py", BROKEN),
        ],
        Some(Roster::from_names(["alice", "bob", "carol", "dan", "erin"])),
    );
    let test = UnitTest::new("test_add", TEST_BODY, Vec::new());
    let report = run(&mut project, &test, &options()).unwrap();

    let status = |c: &str| report.outcome(c).unwrap().status;
    assert_eq!(status("alice"), TestStatus::Passed);
    assert_eq!(status("bob"), TestStatus::Failed);
    assert_eq!(status("carol"), TestStatus::MissingFile);
    assert_eq!(status("dan"), TestStatus::Absent);
    assert_eq!(status("erin"), TestStatus::CompileError);
    assert_eq!(report.outcome("bob").unwrap().code, -2);
    assert_eq!(report.outcome("carol").unwrap().code, -1);
    assert_eq!(report.outcome("erin").unwrap().code, -3);
    assert_eq!(report.passed(), 1);

    let bob_trace = report.outcome("bob").unwrap().traceback.clone().unwrap();
    assert!(bob_trace.contains("AssertionError"));
    let diag = d.path().join("test_add").join("test_bob_test_add.py");
    let text = fs::read_to_string(diag).unwrap();
    assert!(text.contains("AssertionError"));
    assert!(text.contains("def test_add():"));
    assert!(!d.path().join("test_add").join("test_alice_test_add.py").exists());

    assert_eq!(project.client("alice").unwrap().test_status, TestStatus::Passed);
    let summary = Summary::new(&project);
    assert_eq!(summary.tests[&TestStatus::Passed], vec!["alice"]);
}

#[test]
fn hanging_client_times_out() {
    if !have_python() {
        return;
    }
    let (d, mut project) = cohort(&[("alice_sub.py", HANGS), ("bob_sub.py", GOOD)], None);
    let test = UnitTest::new("test_add", TEST_BODY, Vec::new());
    let opts = options().timeout(Some(Duration::from_secs(1)));
    let report = run(&mut project, &test, &opts).unwrap();

    let alice = report.outcome("alice").unwrap();
    assert_eq!(alice.status, TestStatus::Timeout);
    assert_eq!(alice.code, -4);
    assert!(alice.traceback.as_deref().unwrap().starts_with("timeout"));
    assert!(d.path().join("test_add").join("test_alice_test_add.py").exists());
    assert_eq!(report.outcome("bob").unwrap().status, TestStatus::Passed);
}

#[test]
fn passed_survives_a_later_failure() {
    if !have_python() {
        return;
    }
    let (_d, mut project) = cohort(&[("alice_sub.py", GOOD)], None);
    let pass = UnitTest::new("test_add", TEST_BODY, Vec::new());
    let fail = UnitTest::new(
        "test_sub",
        "def test_sub():\n    from sub import add\n    assert add(2, 2) == 5\n",
        Vec::new(),
    );
    run(&mut project, &pass, &options()).unwrap();
    let report = run(&mut project, &fail, &options()).unwrap();
    assert_eq!(report.outcome("alice").unwrap().status, TestStatus::Failed);
    assert_eq!(project.client("alice").unwrap().test_status, TestStatus::Passed);
}

#[test]
fn aliased_client_import_is_bound() {
    if !have_python() {
        return;
    }
    let (_d, mut project) = cohort(&[("alice_sub.py", GOOD)], None);
    let test = UnitTest::new(
        "test_plus",
        "def test_plus():\n    from sub import add as plus\n    assert plus(2, 3) == 5\n",
        Vec::new(),
    );
    let report = run(&mut project, &test, &options()).unwrap();
    let alice = report.outcome("alice").unwrap();
    assert_eq!(alice.status, TestStatus::Passed, "{:?}", alice.traceback);
}

#[test]
fn tests_from_a_module_bring_their_helpers() {
    if !have_python() {
        return;
    }
    let module = "\
def expected(a, b):
    return a + b

def test_add():
    from sub import add
    assert add(4, 5) == expected(4, 5)
";
    let (_d, mut project) = cohort(&[("alice_sub.py", GOOD), ("bob_sub.py", WRONG)], None);
    let test = UnitTest::from_module(module, "test_add").unwrap();
    let report = run(&mut project, &test, &options().workers(2)).unwrap();
    assert_eq!(report.outcome("alice").unwrap().status, TestStatus::Passed);
    assert_eq!(report.outcome("bob").unwrap().status, TestStatus::Failed);
}

#[test]
fn configuration_errors_come_first() {
    let (_d, mut project) = cohort(&[("alice_sub.py", GOOD)], None);
    let test = UnitTest::new("test_add", TEST_BODY, Vec::new());
    let opts = options().workers(2).timeout(Some(Duration::from_secs(1)));
    assert!(matches!(
        run(&mut project, &test, &opts),
        Err(UnicityError::UnsupportedConfiguration(_))
    ));

    let unrelated = UnitTest::new("test_x", "def test_x():\n    from os import path\n", Vec::new());
    assert!(matches!(
        run(&mut project, &unrelated, &options()),
        Err(UnicityError::NoClientImport(_))
    ));
    assert_eq!(project.client("alice").unwrap().test_status, TestStatus::Unset);
}
