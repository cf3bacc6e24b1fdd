pub mod config;
pub mod diffmap;
pub mod error;
pub mod models;
pub mod patchset;
pub mod quoting;
pub mod review;
pub mod sync;
pub mod threading;

pub use error::BridgeError;
pub use patchset::assemble;
pub use quoting::extract_comments;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::threading::{Message, MessageArena};

    pub const SENDER: &str = "Dev <dev@example.com>";

    /// A one-file `git format-patch` body.
    ///
    /// Raw layout (0-based):
    ///
    /// ```text
    ///  0 Add a helper and fix a typo.
    ///  3 ---
    ///  7 diff --git a/lib/foo.c b/lib/foo.c
    /// 11 @@ -2,7 +2,9 @@ struct foo {
    /// 12  	int a;       new 2
    /// 13  	int b;       new 3
    /// 14 +	int c;       new 4
    /// 15  };            new 5
    /// 16                new 6 (blank context)
    /// 17 -int fo(void)  old 6
    /// 18 +int foo(void) new 7
    /// 19  {             new 8
    /// 20 +	return 0;    new 9
    /// 21  }             new 10
    /// 22 --
    /// ```
    pub const SAMPLE_PATCH: &str = "Add a helper and fix a typo.

Signed-off-by: Dev <dev@example.com>
---
 lib/foo.c | 4 +++-
 1 file changed, 3 insertions(+), 1 deletion(-)

diff --git a/lib/foo.c b/lib/foo.c
index 1111111..2222222 100644
--- a/lib/foo.c
+++ b/lib/foo.c
@@ -2,7 +2,9 @@ struct foo {
 \tint a;
 \tint b;
+\tint c;
 };

-int fo(void)
+int foo(void)
 {
+\treturn 0;
 }
--
2.28.0
";

    /// A message with the default sender and no date.
    pub fn message(id: &str, subject: &str, in_reply_to: Option<&str>, body: &str) -> Message {
        Message::new(id, subject, SENDER, in_reply_to.map(str::to_string), body)
    }

    /// Quote every line of `body` the way most mail clients do.
    pub fn quote(body: &str) -> String {
        body.lines()
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A cover letter `[PATCH v<version> 0/<n>]` with patches `1/n..n/n`
    /// whose bodies are all [`SAMPLE_PATCH`].
    pub fn series(root_id: &str, version: u32, patch_count: u32) -> Vec<Message> {
        let tag = |index: u32| format!("[PATCH v{} {}/{}]", version, index, patch_count);
        let mut messages = vec![message(root_id, &format!("{} Series", tag(0)), None, "Cover letter.")];
        for index in 1..=patch_count {
            messages.push(message(
                &format!("<patch-{}-{}>", root_id.trim_matches(&['<', '>'][..]), index),
                &format!("{} part {}", tag(index), index),
                Some(root_id),
                SAMPLE_PATCH,
            ));
        }
        messages
    }

    pub fn arena_with(messages: Vec<Message>) -> MessageArena {
        let mut arena = MessageArena::new();
        arena.insert_batch(messages);
        arena
    }

    /// Render `message` as an RFC 5322 email for archive-directory tests.
    pub fn to_rfc822(message: &Message) -> String {
        let mut raw = format!(
            "From: {}\r\nSubject: {}\r\nDate: Mon, 6 Jul 2020 10:00:00 +0000\r\nMessage-ID: {}\r\n",
            message.from, message.subject, message.id
        );
        if let Some(parent) = &message.in_reply_to {
            raw.push_str(&format!("In-Reply-To: {}\r\n", parent));
        }
        raw.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        raw.push_str(&message.body.replace('\n', "\r\n"));
        raw.push_str("\r\n");
        raw
    }
}
