//! Message arena for reply trees
//!
//! Messages are owned by a single arena keyed by Message-ID; parent and child
//! links are stored as ids rather than references, so a reply tree can be
//! walked without ownership cycles between parents and children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::patch_series;
use super::subject_matching;

/// One archived email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message-ID header value
    pub id: String,

    pub subject: String,

    /// Raw `From:` header value
    pub from: String,

    /// In-Reply-To header value (None for thread roots)
    pub in_reply_to: Option<String>,

    pub body: String,

    pub date: Option<DateTime<Utc>>,

    /// Ids of linked replies, in the order they were linked
    pub children: Vec<String>,

    /// Review-system change identifier, once the patch has been pushed
    pub change_id: Option<String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        from: impl Into<String>,
        in_reply_to: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Message {
            id: id.into(),
            subject: subject.into(),
            from: from.into(),
            in_reply_to,
            body: body.into(),
            date: None,
            children: Vec::new(),
            change_id: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to.is_some()
    }

    pub fn is_patch(&self) -> bool {
        patch_series::is_patch(&self.subject)
    }

    pub fn is_coverletter(&self) -> bool {
        patch_series::is_coverletter(&self.subject)
    }

    pub fn patch_index(&self) -> Option<(u32, u32)> {
        patch_series::patch_index(&self.subject)
    }

    pub fn version(&self) -> u32 {
        patch_series::version(&self.subject)
    }

    pub fn normalized_subject(&self) -> String {
        subject_matching::normalized_subject(&self.subject)
    }

    /// Add a child to this message (avoiding duplicates)
    fn add_child(&mut self, child_id: String) {
        if !self.children.contains(&child_id) {
            self.children.push(child_id);
        }
    }
}

/// All known messages, keyed by Message-ID.
#[derive(Debug, Default, Clone)]
pub struct MessageArena {
    messages: HashMap<String, Message>,
}

impl MessageArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Every stored message, in no particular order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Linked replies of `message`, in link order.
    pub fn children<'a>(&'a self, message: &'a Message) -> impl Iterator<Item = &'a Message> + 'a {
        message.children.iter().filter_map(move |id| self.messages.get(id))
    }

    /// Record a review-system change id against a stored message.
    pub fn set_change_id(&mut self, id: &str, change_id: impl Into<String>) -> bool {
        match self.messages.get_mut(id) {
            Some(message) => {
                message.change_id = Some(change_id.into());
                true
            }
            None => false,
        }
    }

    /// Store a batch of messages and link replies to their parents.
    ///
    /// Messages whose id is already known are ignored. Replies are linked only
    /// when their parent is present after the whole batch has been stored; the
    /// rest stay unlinked.
    ///
    /// ## Returns
    ///
    /// Ids of the newly stored messages, in batch order.
    pub fn insert_batch(&mut self, batch: Vec<Message>) -> Vec<String> {
        let mut new_ids = Vec::with_capacity(batch.len());

        for mut message in batch {
            if self.messages.contains_key(&message.id) {
                log::debug!("skipping duplicate message {}", message.id);
                continue;
            }
            message.children.clear();
            new_ids.push(message.id.clone());
            self.messages.insert(message.id.clone(), message);
        }

        for id in &new_ids {
            let Some(parent_id) = self.messages.get(id).and_then(|m| m.in_reply_to.clone()) else {
                continue;
            };

            if !self.messages.contains_key(&parent_id) {
                log::info!("could not find parent {} for {}, leaving unlinked", parent_id, id);
                continue;
            }

            if self.is_ancestor_or_self(id, &parent_id) {
                log::warn!("refusing to link {} under {}: would create a cycle", id, parent_id);
                continue;
            }

            if let Some(parent) = self.messages.get_mut(&parent_id) {
                parent.add_child(id.clone());
            }
        }

        new_ids
    }

    /// Top of the linked reply chain containing `id`.
    pub fn thread_root(&self, id: &str) -> Option<&Message> {
        self.walk_up(id, |_| false)
    }

    /// Nearest cover letter at or above `id`, falling back to the top of the
    /// chain.
    ///
    /// A revised series is often sent in reply to the previous one; its cover
    /// letter heads its own series even though it is linked below the first.
    pub fn series_root(&self, id: &str) -> Option<&Message> {
        self.walk_up(id, Message::is_coverletter)
    }

    fn walk_up(&self, id: &str, stop_at: impl Fn(&Message) -> bool) -> Option<&Message> {
        let mut current = self.messages.get(id)?;
        let mut visited = HashSet::new();

        while visited.insert(current.id.as_str()) && !stop_at(current) {
            match current
                .in_reply_to
                .as_deref()
                .filter(|parent| self.is_linked(&current.id, parent))
                .and_then(|parent| self.messages.get(parent))
            {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Some(current)
    }

    /// Whether `candidate` is `start` or one of its linked ancestors.
    fn is_ancestor_or_self(&self, candidate: &str, start: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start.to_string());

        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            if !visited.insert(id.clone()) {
                return false;
            }
            current = self
                .messages
                .get(&id)
                .and_then(|m| m.in_reply_to.clone())
                .filter(|parent| self.is_linked(&id, parent));
        }

        false
    }

    fn is_linked(&self, child: &str, parent: &str) -> bool {
        self.messages
            .get(parent)
            .map(|p| p.children.iter().any(|c| c == child))
            .unwrap_or(false)
    }
}
