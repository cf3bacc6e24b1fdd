use std::fs;
use std::path::Path;

use review_bridge::sync::{ArchiveScanner, load_directory, load_files, plan_uploads, run_plan};
use review_bridge::test_support::{SAMPLE_PATCH, message, quote, series, to_rfc822};
use review_bridge::threading::{Message, MessageArena};

fn write_messages(dir: &Path, prefix: &str, messages: &[Message]) {
    for (n, message) in messages.iter().enumerate() {
        fs::write(dir.join(format!("{prefix}-{n:03}.txt")), to_rfc822(message)).expect("write message file");
    }
}

#[test]
fn load_directory_skips_bad_and_foreign_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_messages(dir.path(), "a", &series("<cover@example.com>", 1, 2));
    fs::write(dir.path().join("b-broken.eml"), "Subject: no id\r\n\r\nbody\r\n").unwrap();
    fs::write(dir.path().join("notes.json"), "{}").unwrap();

    let messages = load_directory(dir.path(), 2).unwrap();

    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "<cover@example.com>",
            "<patch-cover@example.com-1>",
            "<patch-cover@example.com-2>"
        ]
    );
    assert_eq!(messages[1].in_reply_to.as_deref(), Some("<cover@example.com>"));
    assert!(messages[1].body.lines().any(|line| line == "+\tint c;"));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_directory(&dir.path().join("absent"), 1).is_err());
}

#[test]
fn scanner_hands_out_each_file_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scanner = ArchiveScanner::new(dir.path());

    write_messages(dir.path(), "a", &series("<cover@example.com>", 1, 1));
    fs::write(dir.path().join("notes.json"), "{}").unwrap();
    assert_eq!(scanner.take_new_files().unwrap().len(), 2);
    assert!(scanner.take_new_files().unwrap().is_empty());

    let reply = message("<late@example.com>", "Re: [PATCH v1 1/1] part 1", Some("<patch-cover@example.com-1>"), "ok");
    write_messages(dir.path(), "b", &[reply]);
    let new_files = scanner.take_new_files().unwrap();
    assert_eq!(new_files, vec![dir.path().join("b-000.txt")]);

    let messages = load_files(&new_files, 1).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "<late@example.com>");
}

#[test]
fn new_series_then_late_review() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut arena = MessageArena::new();

    write_messages(dir.path(), "a", &series("<cover@example.com>", 1, 2));
    let new_ids = arena.insert_batch(load_directory(dir.path(), 2).unwrap());
    assert_eq!(new_ids.len(), 3);

    let plan = plan_uploads(&arena, &new_ids);
    assert_eq!(plan.threads_to_upload, vec!["<cover@example.com>"]);

    let outcome = run_plan(&arena, &plan, "tag");
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].patchset.series_indices(), vec![1, 2]);
    assert!(outcome.reports[0].unresolved.is_empty());

    let lines: Vec<&str> = SAMPLE_PATCH.lines().collect();
    let reply = message(
        "<review@example.com>",
        "Re: [PATCH v1 1/2] part 1",
        Some("<patch-cover@example.com-1>"),
        &format!("{}\nfoo() already exists in lib/bar.c", quote(&lines[..=18].join("\n"))),
    );
    write_messages(dir.path(), "b", &[reply]);

    let new_ids = arena.insert_batch(load_directory(dir.path(), 2).unwrap());
    assert_eq!(new_ids, vec!["<review@example.com>"]);

    let plan = plan_uploads(&arena, &new_ids);
    assert!(plan.threads_to_upload.is_empty());
    assert_eq!(plan.threads_with_new_comments, vec!["<patch-cover@example.com-1>"]);

    let outcome = run_plan(&arena, &plan, "tag");
    assert_eq!(outcome.reports.len(), 1);
    let review = &outcome.reports[0].reviews[0];
    assert_eq!(review.message_id, "<patch-cover@example.com-1>");
    assert_eq!(review.review.comments["lib/foo.c"][0].line, Some(7));
    assert_eq!(review.review.comments["lib/foo.c"][0].message, "foo() already exists in lib/bar.c");
}
