use review_bridge::assemble;
use review_bridge::models::NO_ANCHOR;
use review_bridge::patchset::AssembleError;
use review_bridge::review::{DEFAULT_REVIEW_TAG, ReviewInput};
use review_bridge::sync::process_thread;
use review_bridge::test_support::{SAMPLE_PATCH, arena_with, message, quote, series};

fn review_reply(parent_id: &str) -> review_bridge::threading::Message {
    let lines: Vec<&str> = SAMPLE_PATCH.lines().collect();
    let body = format!(
        "On Mon, Dev wrote:\n{}\n\nPlease drop c, nothing reads it.\n\n{}",
        quote(&lines[..=14].join("\n")),
        quote(&lines[15..=21].join("\n")),
    );
    message("<review@example.com>", "Re: [PATCH v2 2/4] part 2", Some(parent_id), &body)
}

#[test]
fn four_patch_series_is_ordered_and_commentless() {
    let mut messages = series("<cover@example.com>", 2, 4);
    messages.reverse();
    let arena = arena_with(messages);

    let root = arena.get("<cover@example.com>").expect("root stored");
    let patchset = assemble(&arena, root).expect("series assembles");

    assert_eq!(patchset.series_indices(), vec![1, 2, 3, 4]);
    assert_eq!(patchset.cover_letter.text, "Cover letter.");
    assert!(patchset.cover_letter.comments.is_empty());
    for patch in &patchset.patches {
        assert!(patch.comments.is_empty(), "{} has comments", patch.message_id);
        assert!(patch.text_with_headers.starts_with("From: Dev <dev@example.com>\nSubject: [PATCH v2 "));
    }
}

#[test]
fn single_patch_without_cover_letter_is_index_zero() {
    let arena = arena_with(vec![message("<only@example.com>", "[PATCH] lib: fix typo", None, SAMPLE_PATCH)]);

    let patchset = assemble(&arena, arena.get("<only@example.com>").unwrap()).unwrap();
    assert_eq!(patchset.series_indices(), vec![0]);
    assert_eq!(patchset.patches[0].text, SAMPLE_PATCH);
}

#[test]
fn missing_patch_fails_the_whole_thread() {
    let mut messages = series("<cover@example.com>", 1, 3);
    messages.pop();
    let arena = arena_with(messages);

    let err = assemble(&arena, arena.get("<cover@example.com>").unwrap()).unwrap_err();
    assert!(matches!(err, AssembleError::SeriesIndexMismatch { declared: 3, found: 2, .. }));
}

#[test]
fn inline_review_resolves_to_diff_position() {
    let mut messages = series("<cover@example.com>", 2, 4);
    let patch_two = messages[2].id.clone();
    messages.push(review_reply(&patch_two));
    let arena = arena_with(messages);

    let mut patchset = assemble(&arena, arena.get("<cover@example.com>").unwrap()).unwrap();
    let reviewed = &patchset.patches[1];
    assert_eq!(reviewed.message_id, patch_two);
    assert_eq!(reviewed.comments.len(), 2);
    assert_eq!(reviewed.comments[0].raw_line, NO_ANCHOR);
    assert_eq!(reviewed.comments[1].raw_line, 14);

    assert!(patchset.resolve_comments().is_empty());
    let reviewed = &patchset.patches[1];
    assert_eq!(reviewed.comments[1].file, "lib/foo.c");
    assert_eq!(reviewed.comments[1].line, 4);

    let review = ReviewInput::for_patch(reviewed, DEFAULT_REVIEW_TAG).unwrap();
    assert_eq!(review.message, "On Mon, Dev wrote:");
    assert_eq!(review.comments["lib/foo.c"][0].message, "Please drop c, nothing reads it.");
    assert_eq!(review.comments["lib/foo.c"][0].line, Some(4));
}

#[test]
fn process_thread_withholds_unparseable_patches() {
    let arena = arena_with(vec![
        message("<c@example.com>", "[PATCH 0/2] Series", None, "Cover."),
        message("<p1@example.com>", "[PATCH 1/2] good", Some("<c@example.com>"), SAMPLE_PATCH),
        message("<p2@example.com>", "[PATCH 2/2] bad", Some("<c@example.com>"), "not a diff"),
    ]);

    let report = process_thread(&arena, "<c@example.com>", "tag").unwrap();
    assert_eq!(report.unresolved, vec!["<p2@example.com>"]);
    assert_eq!(report.reviews.len(), 1);
    assert_eq!(report.reviews[0].message_id, "<p1@example.com>");
    assert_eq!(report.reviews[0].review.tag, "tag");
}

#[test]
fn resent_series_points_at_previous_revision() {
    let mut messages = series("<v1@example.com>", 1, 2);
    messages.extend(series("<v2@example.com>", 2, 2));
    let arena = arena_with(messages);

    let report = process_thread(&arena, "<v2@example.com>", "tag").unwrap();
    assert_eq!(report.previous_version.as_deref(), Some("<v1@example.com>"));

    let first = process_thread(&arena, "<v1@example.com>", "tag").unwrap();
    assert!(first.previous_version.is_none());
}
