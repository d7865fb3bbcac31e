// tests/integration_similarity.rs
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use unicity_core::parse::{self, SourceFile};
use unicity_core::project::{Project, ProjectOptions};
use unicity_core::report::ScoreReport;
use unicity_core::similarity::{
    CompareRequest, Comparison, Metric, SimilarityEngine, MISSING_ROUTINE, NOT_COMPUTED,
    PARSE_ERROR,
};
use unicity_core::{lang::ParserRegistry, UnicityConfig, UnicityError};

const LOOPS: &str = "\
def add(xs):
    total = 0
    for x in xs:
        if x > 0 and x < 10:
            total += abs(x)
    return total

def scale(xs):
    while xs:
        xs = xs[1:]
    return len(xs)
";

const BRANCHES: &str = "\
def add(xs):
    try:
        return sum(xs)
    except TypeError:
        return not xs
";

fn cohort(files: &[(&str, &str)], expected: &[&str]) -> (TempDir, Project) {
    let d = tempfile::tempdir().unwrap();
    let root = d.path().join("cohort");
    fs::create_dir(&root).unwrap();
    for (name, body) in files {
        fs::write(root.join(name), body).unwrap();
    }
    let opts = ProjectOptions::new(expected.iter().copied()).workdir(d.path());
    let project = Project::open(&root, opts).unwrap();
    (d, project)
}

fn cell(cmp: &Comparison, a: &str, b: &str) -> f64 {
    cmp.get(cmp.index_of(a).unwrap(), cmp.index_of(b).unwrap()).unwrap()
}

#[test]
fn identical_files_have_zero_command_freq_distance() {
    let (_d, project) = cohort(&[("alice_sub.py", LOOPS), ("bob_sub.py", LOOPS)], &["sub.py"]);
    let engine = SimilarityEngine::new();
    let cmp = engine
        .compare(&project, &CompareRequest::new("sub.py", "command_freq").unwrap())
        .unwrap();
    assert_eq!(cmp.n, 2);
    assert!(cell(&cmp, "alice", "bob").abs() < f64::EPSILON);
    assert!(cmp.is_symmetric());
}

#[test]
fn jaro_of_a_routine_against_itself_is_zero() {
    let (_d, project) = cohort(
        &[("alice_sub.py", LOOPS), ("bob_sub.py", BRANCHES)],
        &["sub.py"],
    );
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py/add", "jaro").unwrap())
        .unwrap();
    assert!(cell(&cmp, "alice", "alice").abs() < f64::EPSILON);
    let d = cell(&cmp, "alice", "bob");
    assert!(d > 0.0 && d <= 1.0);
}

#[test]
fn moss_on_disjoint_streams_is_one() {
    let a = "def f():\n    for i in range(3):\n        for j in range(3):\n            if i:\n                break\n";
    let b = "def f():\n    while x:\n        try:\n            continue\n        except E:\n            pass\n";
    let (_d, project) = cohort(&[("alice_sub.py", a), ("bob_sub.py", b)], &["sub.py"]);
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py/f", "moss").unwrap())
        .unwrap();
    assert!((cell(&cmp, "alice", "bob") - 1.0).abs() < f64::EPSILON);
}

#[test]
fn sentinels_mark_broken_and_incomplete_entries() {
    let (d, project) = cohort(
        &[
            ("alice_sub.py", LOOPS),
            ("bob_sub.py", "def add(:\n"),
            ("carol_sub.py", "def other():\n    pass\n"),
            ("dan_main.py", "print(1)\n"),
        ],
        &["sub.py", "main.py"],
    );
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py/add", "jaro").unwrap())
        .unwrap();
    assert!((cell(&cmp, "alice", "bob") - PARSE_ERROR).abs() < f64::EPSILON);
    assert!((cell(&cmp, "alice", "carol") - MISSING_ROUTINE).abs() < f64::EPSILON);
    assert!((cell(&cmp, "bob", "carol") - PARSE_ERROR).abs() < f64::EPSILON);
    assert!((cell(&cmp, "bob", "dan") - PARSE_ERROR).abs() < f64::EPSILON);
    // dan submitted no sub.py at all
    assert!((cell(&cmp, "alice", "dan") - PARSE_ERROR).abs() < f64::EPSILON);
    assert!((cell(&cmp, "bob", "bob") - NOT_COMPUTED).abs() < f64::EPSILON);
    assert!(cell(&cmp, "alice", "alice").abs() < f64::EPSILON);
    assert!(!d.path().join("similarity_errors.log").exists());
}

#[test]
fn text_round_trip_through_a_file() {
    let (d, project) = cohort(
        &[("alice_sub.py", LOOPS), ("bob_sub.py", BRANCHES), ("carol_sub.py", LOOPS)],
        &["sub.py"],
    );
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py/add", "jaro").unwrap())
        .unwrap();
    let path = d.path().join("add.txt");
    cmp.save(&path, project.config.precision).unwrap();
    let back = Comparison::load(&path).unwrap();
    assert_eq!(back.n, cmp.n);
    assert_eq!(back.matrix, cmp.matrix);
    assert_eq!(back.routine, "sub.py/add");
    assert_eq!(back.metric, "jaro");
}

#[test]
fn wildcard_with_no_matches_is_an_empty_selection() {
    let (_d, project) = cohort(&[("alice_sub.py", LOOPS)], &["sub.py"]);
    let err = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("part*.py", "jaro").unwrap())
        .unwrap_err();
    assert!(matches!(err, UnicityError::EmptySelection(_)));
}

#[test]
fn wildcard_merges_matching_files() {
    let (_d, project) = cohort(
        &[
            ("alice_part1.py", LOOPS),
            ("alice_part2.py", BRANCHES),
            ("bob_part1.py", LOOPS),
            ("bob_part2.py", BRANCHES),
        ],
        &["part1.py", "part2.py"],
    );
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("part*.py/scale", "jaro").unwrap())
        .unwrap();
    assert!(cell(&cmp, "alice", "bob").abs() < f64::EPSILON);
}

#[test]
fn unknown_metric_is_rejected_before_work() {
    let (_d, project) = cohort(&[("alice_sub.py", LOOPS)], &["sub.py"]);
    let err = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py", "levenshtein").unwrap())
        .unwrap_err();
    assert!(matches!(err, UnicityError::UnknownMetric(_)));
}

#[test]
fn empty_cohort_gives_empty_matrix() {
    let d = tempfile::tempdir().unwrap();
    let project = Project::open(d.path(), ProjectOptions::new(["sub.py"]).workdir(d.path())).unwrap();
    let cmp = SimilarityEngine::new()
        .compare(&project, &CompareRequest::new("sub.py", "moss").unwrap())
        .unwrap();
    assert_eq!(cmp.n, 0);
    assert!(ScoreReport::new(&cmp, 10, 3).pairwise.is_empty());
}

#[test]
fn prior_cohort_pairs_are_skipped_among_themselves() {
    let (_d1, current) = cohort(&[("alice_sub.py", LOOPS), ("bob_sub.py", BRANCHES)], &["sub.py"]);
    let (_d2, prior) = cohort(&[("old1_sub.py", LOOPS), ("old2_sub.py", LOOPS)], &["sub.py"]);
    let request = CompareRequest::new("sub.py/add", "jaro")
        .unwrap()
        .prior(&prior, "sub.py/add")
        .unwrap();
    let cmp = SimilarityEngine::new().compare(&current, &request).unwrap();
    assert_eq!(cmp.n, 4);
    assert_eq!(cmp.prior_clients, vec!["old1", "old2"]);
    assert_eq!(cmp.prior_routine.as_deref(), Some("sub.py/add"));
    assert!(cell(&cmp, "alice", "old1").abs() < f64::EPSILON);
    assert!((cell(&cmp, "old1", "old2") - NOT_COMPUTED).abs() < f64::EPSILON);

    let report = ScoreReport::new(&cmp, 10, 1);
    assert_eq!(report.minimums.len(), 2);
    assert_eq!(report.closest[0].a, "alice");
}

#[test]
fn template_code_is_discounted() {
    let (_d, project) = cohort(&[("alice_sub.py", LOOPS), ("bob_sub.py", LOOPS)], &["sub.py"]);
    let template = parse::build("sub.py", "template.py", LOOPS.as_bytes(), None, &ParserRegistry::builtin());
    let request = CompareRequest::new("sub.py/add", "command_freq")
        .unwrap()
        .template(&template);
    let cmp = SimilarityEngine::new().compare(&project, &request).unwrap();
    // Nothing is left once the template is removed.
    assert!((cell(&cmp, "alice", "bob") - 1.0).abs() < f64::EPSILON);
}

#[test]
fn template_without_the_routine_subtracts_nothing() {
    let (_d, project) = cohort(
        &[("alice_sub.py", LOOPS), ("bob_sub.py", BRANCHES)],
        &["sub.py"],
    );
    let template = parse::build(
        "sub.py",
        "template.py",
        b"def other():\n    for x in xs:\n        if x:\n            break\n",
        None,
        &ParserRegistry::builtin(),
    );
    let engine = SimilarityEngine::new();
    let plain = CompareRequest::new("sub.py/add", "command_freq").unwrap();
    let with_template = CompareRequest::new("sub.py/add", "command_freq")
        .unwrap()
        .template(&template);
    let a = engine.compare(&project, &plain).unwrap();
    let b = engine.compare(&project, &with_template).unwrap();
    assert_eq!(a.matrix, b.matrix);
}

#[test]
fn repeated_comparisons_are_identical_at_any_worker_count() {
    let (_d, project) = cohort(
        &[
            ("alice_sub.py", LOOPS),
            ("bob_sub.py", BRANCHES),
            ("carol_sub.py", "def add(:\n"),
            ("dan_sub.py", LOOPS),
        ],
        &["sub.py"],
    );
    let engine = SimilarityEngine::new();
    let first = engine
        .compare(&project, &CompareRequest::new("sub.py", "moss").unwrap())
        .unwrap();
    let second = engine
        .compare(&project, &CompareRequest::new("sub.py", "moss").unwrap())
        .unwrap();
    let pooled = engine
        .compare(&project, &CompareRequest::new("sub.py", "moss").unwrap().workers(2))
        .unwrap();
    assert_eq!(first.matrix, second.matrix);
    assert_eq!(first.matrix, pooled.matrix);
    assert_eq!(first.clients, pooled.clients);
}

struct AlwaysFails;

impl Metric for AlwaysFails {
    fn name(&self) -> &str {
        "always_fails"
    }

    fn distance(
        &self,
        _: &SourceFile,
        _: &SourceFile,
        _: Option<&SourceFile>,
        _: Option<&str>,
        _: Option<&str>,
    ) -> anyhow::Result<f64> {
        anyhow::bail!("no opinion")
    }
}

fn read_log(dir: &Path) -> String {
    fs::read_to_string(dir.join(UnicityConfig::default().diagnostics_file)).unwrap()
}

#[test]
fn user_metric_failures_are_logged() {
    let (d, project) = cohort(&[("alice_sub.py", LOOPS), ("bob_sub.py", LOOPS)], &["sub.py"]);
    let mut engine = SimilarityEngine::new();
    engine.metrics_mut().register(Arc::new(AlwaysFails));
    let cmp = engine
        .compare(&project, &CompareRequest::new("sub.py", "always_fails").unwrap().workers(2))
        .unwrap();
    assert!((cell(&cmp, "alice", "bob") - NOT_COMPUTED).abs() < f64::EPSILON);
    let log = read_log(d.path());
    assert!(log.contains("alice vs bob [always_fails]: no opinion"));
}
