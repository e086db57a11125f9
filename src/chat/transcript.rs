use crate::api::Message;

/// One visible line of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    /// Transient "assistant is typing" placeholder.
    Typing,
    /// Inline failure, styled like an assistant bubble.
    Error(String),
    /// Client-side note (tools used, chart problems).
    Notice(String),
}

/// The visible transcript of the bound conversation.
///
/// `revision` changes whenever the whole transcript is swapped out, so a
/// renderer that tracks how far it has printed knows to start over.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    revision: u64,
}

impl Transcript {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn is_typing(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Typing))
    }

    /// Remove the typing placeholder. Returns whether one was present.
    pub fn remove_typing(&mut self) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !matches!(e, Entry::Typing));
        self.entries.len() != before
    }

    /// Swap in a backend history wholesale.
    pub fn replace_with(&mut self, messages: Vec<Message>) {
        self.entries = messages.into_iter().map(Entry::Message).collect();
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.replace_with(Vec::new());
    }

    /// Messages only, skipping placeholders and notes.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Message(m) => Some(m),
            _ => None,
        })
    }
}
