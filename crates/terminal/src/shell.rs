//! Shell output buffering
//!
//! Output is released a line at a time: text after the last newline stays
//! pending until a later write completes it. Released text is also appended
//! to a history that new clients receive on login. History over its limit is
//! trimmed to the newest half.

#[derive(Debug, Default)]
pub struct ShellBuffer {
    history: String,
    pending: String,
    limit: usize,
}

impl ShellBuffer {
    /// Create a buffer keeping at most `limit` bytes of history
    pub fn new(limit: usize) -> Self {
        Self {
            history: String::new(),
            pending: String::new(),
            limit,
        }
    }

    /// Append text, returning the newly completed lines if any
    pub fn write(&mut self, text: &str) -> Option<String> {
        self.pending.push_str(text);

        let end = self.pending.rfind('\n')? + 1;
        let rest = self.pending.split_off(end);
        let completed = std::mem::replace(&mut self.pending, rest);

        self.history.push_str(&completed);
        self.trim();
        Some(completed)
    }

    /// Released output kept for replay
    #[inline]
    pub fn history(&self) -> &str {
        &self.history
    }

    fn trim(&mut self) {
        if self.history.len() <= self.limit {
            return;
        }

        let mut cut = self.history.len() - self.limit / 2;
        while !self.history.is_char_boundary(cut) {
            cut += 1;
        }
        self.history.drain(..cut);
    }
}
