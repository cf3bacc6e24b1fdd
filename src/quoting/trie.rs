//! Quote-prefix inference
//!
//! Every parent line is inserted into a character trie back to front. Walking
//! a reversed child line through the trie finds the longest parent line that
//! the child line ends with; whatever is left in front of it is the marker the
//! mail client put there (`"> "`, `"| "`, `"foo> "`, or nothing).

use std::collections::HashMap;

use super::Line;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: HashMap<char, usize>,
    /// A complete inserted string ends here.
    terminal: bool,
}

/// Character trie stored as a node arena; node 0 is the root.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Default for Trie {
    fn default() -> Self {
        Trie {
            nodes: vec![TrieNode::default()],
        }
    }
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chars: impl IntoIterator<Item = char>) {
        let mut node = 0;
        for c in chars {
            node = match self.nodes[node].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(c, next);
                    next
                }
            };
        }
        self.nodes[node].terminal = true;
    }

    /// Length of the longest non-empty inserted string that prefixes `chars`.
    pub fn longest_match(&self, chars: impl IntoIterator<Item = char>) -> Option<usize> {
        let mut node = 0;
        let mut best = None;

        for (consumed, c) in chars.into_iter().enumerate() {
            match self.nodes[node].children.get(&c) {
                Some(&next) => node = next,
                None => break,
            }
            if self.nodes[node].terminal {
                best = Some(consumed + 1);
            }
        }

        best
    }
}

/// Guess the quote marker a reply uses for its parent's lines.
///
/// Each child line that ends with a whole parent line votes for the text in
/// front of it. The most voted marker wins; ties go to the marker seen first.
/// A reply that quotes nothing yields `""`.
pub fn infer_quote_prefix(parent_lines: &[Line], child_lines: &[Line]) -> String {
    let mut trie = Trie::new();
    for line in parent_lines {
        trie.insert(line.text.chars().rev());
    }

    // (candidate, votes) in first-seen order
    let mut tally: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for line in child_lines {
        let Some(matched) = trie.longest_match(line.text.chars().rev()) else {
            continue;
        };
        let kept = line.text.chars().count() - matched;
        let candidate: String = line.text.chars().take(kept).collect();

        match positions.get(&candidate) {
            Some(&position) => tally[position].1 += 1,
            None => {
                positions.insert(candidate.clone(), tally.len());
                tally.push((candidate, 1));
            }
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for entry in &tally {
        if best.map(|(_, votes)| entry.1 > *votes).unwrap_or(true) {
            best = Some(entry);
        }
    }

    let prefix = best.map(|(candidate, _)| candidate.clone()).unwrap_or_default();
    log::debug!("inferred quote prefix {:?} from {} candidates", prefix, tally.len());
    prefix
}
