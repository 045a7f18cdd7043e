//! Store-level invariants: idempotent replay, watermark decisions,
//! and writer commutativity, exercised through the library API.

use std::path::PathBuf;

use tissue::{ListFilter, NewIssue, Priority, Status, Store};

fn init_store(root: &std::path::Path) -> (PathBuf, Store) {
    let dir = root.join(".tissue");
    let store = Store::init(&dir, Some("t")).unwrap();
    (dir, store)
}

fn new_issue(title: &str) -> NewIssue {
    NewIssue {
        title: title.to_string(),
        body: String::new(),
        priority: Priority::default(),
        tags: vec![],
    }
}

#[test]
fn id_hash_invariant_holds_for_every_issue() {
    let tmp = tempfile::tempdir().unwrap();
    let (_dir, mut store) = init_store(tmp.path());

    for i in 0..20 {
        store.create_issue(&new_issue(&format!("issue {i}"))).unwrap();
    }

    for issue in store.list_issues(&ListFilter::default()).unwrap() {
        let hash = issue.id.rsplit('-').next().unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}

#[test]
fn appending_the_same_record_twice_is_a_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let (dir, mut store) = init_store(tmp.path());

    let issue = store.create_issue(&new_issue("doubled")).unwrap();
    let comment = store.add_comment(&issue.id, "doubled comment").unwrap();
    drop(store);

    // Duplicate every line, as a botched merge might.
    let log_path = dir.join("issues.jsonl");
    let log = std::fs::read_to_string(&log_path).unwrap();
    let doubled: String = log.lines().flat_map(|l| [l, "\n", l, "\n"]).collect();
    std::fs::write(&log_path, doubled).unwrap();

    let store = Store::open(&dir).unwrap();
    let issues = store.list_issues(&ListFilter::default()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rev, issue.rev);
    let comments = store.get_comments(&issue.id).unwrap();
    assert_eq!(comments, vec![comment]);
}

#[test]
fn replaced_log_file_triggers_full_reimport() {
    let tmp = tempfile::tempdir().unwrap();
    let (dir, mut store) = init_store(tmp.path());
    store.create_issue(&new_issue("will vanish")).unwrap();
    drop(store);

    // Replace the log wholesale (new inode), the way git checkout
    // does: the cache must follow the new content, not union it.
    let log_path = dir.join("issues.jsonl");
    let replacement = dir.join("issues.jsonl.new");
    std::fs::write(
        &replacement,
        concat!(
            r#"{"type":"issue","id":"t-11111111","rev":"01J0000000000000000000000A","title":"replacement","body":"","status":"open","priority":2,"tags":[],"created_at":1,"updated_at":1}"#,
            "\n"
        ),
    )
    .unwrap();
    std::fs::rename(&replacement, &log_path).unwrap();

    let store = Store::open(&dir).unwrap();
    let issues = store.list_issues(&ListFilter::default()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].id, "t-11111111");
}

#[test]
fn truncated_log_triggers_full_reimport() {
    let tmp = tempfile::tempdir().unwrap();
    let (dir, mut store) = init_store(tmp.path());
    store.create_issue(&new_issue("first")).unwrap();
    store.create_issue(&new_issue("second")).unwrap();
    drop(store);

    // Truncate in place (same inode, smaller size): stored offset now
    // exceeds the file.
    let log_path = dir.join("issues.jsonl");
    let log = std::fs::read_to_string(&log_path).unwrap();
    let first_line = log.lines().next().unwrap().to_string() + "\n";
    std::fs::write(&log_path, &first_line).unwrap();

    let store = Store::open(&dir).unwrap();
    let issues = store.list_issues(&ListFilter::default()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "first");
}

#[test]
fn disjoint_writers_commute() {
    // The same two records, appended in opposite orders, produce the
    // same cache state.
    let rec_a = r#"{"type":"issue","id":"t-aaaaaaaa","rev":"01J0000000000000000000000A","title":"a","body":"","status":"open","priority":2,"tags":[],"created_at":1,"updated_at":1}"#;
    let rec_b = r#"{"type":"issue","id":"t-bbbbbbbb","rev":"01J0000000000000000000000B","title":"b","body":"","status":"open","priority":2,"tags":[],"created_at":2,"updated_at":2}"#;

    let snapshot = |lines: &[&str]| {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".tissue");
        let store = Store::init(&dir, Some("t")).unwrap();
        drop(store);
        std::fs::write(dir.join("issues.jsonl"), lines.join("\n") + "\n").unwrap();
        let store = Store::open(&dir).unwrap();
        let mut issues = store.list_issues(&ListFilter::default()).unwrap();
        issues.sort_by(|x, y| x.id.cmp(&y.id));
        issues
    };

    assert_eq!(snapshot(&[rec_a, rec_b]), snapshot(&[rec_b, rec_a]));
}

#[test]
fn same_id_conflict_resolution_commutes() {
    let older = r#"{"type":"issue","id":"t-cccccccc","rev":"01J0000000000000000000000A","title":"older","body":"","status":"open","priority":2,"tags":[],"created_at":1,"updated_at":1}"#;
    let newer = r#"{"type":"issue","id":"t-cccccccc","rev":"01J0000000000000000000000B","title":"newer","body":"","status":"in_progress","priority":1,"tags":["x"],"created_at":1,"updated_at":2}"#;

    let winner = |lines: &[&str]| {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".tissue");
        drop(Store::init(&dir, Some("t")).unwrap());
        std::fs::write(dir.join("issues.jsonl"), lines.join("\n") + "\n").unwrap();
        let store = Store::open(&dir).unwrap();
        store.get_issue("t-cccccccc").unwrap()
    };

    let forward = winner(&[older, newer]);
    let backward = winner(&[newer, older]);
    assert_eq!(forward, backward);
    assert_eq!(forward.title, "newer");
    assert_eq!(forward.status, Status::InProgress);
    assert_eq!(forward.tags, vec!["x"]);
}

#[test]
fn write_then_force_reimport_yields_identical_issue() {
    let tmp = tempfile::tempdir().unwrap();
    let (_dir, mut store) = init_store(tmp.path());

    let issue = store
        .create_issue(&NewIssue {
            title: "round trip".to_string(),
            body: "with body".to_string(),
            priority: Priority(4),
            tags: vec!["b".to_string(), "a".to_string()],
        })
        .unwrap();
    // Tags come back sorted.
    assert_eq!(issue.tags, vec!["a", "b"]);

    store.force_reimport().unwrap();
    assert_eq!(store.get_issue(&issue.id).unwrap(), issue);
}
