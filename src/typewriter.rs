/// Typewriter reveal for a single dialogue node.
///
/// The reveal remembers which node it belongs to so the engine can refuse to
/// advance a timer that outlived a node switch.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Reveal {
    key: String,
    total: usize,
    revealed: usize,
    accum_ms: f32,
}

impl Reveal {
    pub(crate) fn new(key: &str, text: &str) -> Self {
        Self {
            key: key.to_string(),
            total: text.chars().count(),
            revealed: 0,
            accum_ms: 0.0,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn revealed(&self) -> usize {
        self.revealed
    }

    #[cfg(test)]
    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }

    pub(crate) fn complete(&mut self) {
        self.revealed = self.total;
        self.accum_ms = 0.0;
    }

    /// Adds elapsed time and reveals at most one character once the
    /// accumulator exceeds `ms_per_char`.
    pub(crate) fn advance(&mut self, elapsed_ms: f32, ms_per_char: f32) {
        if self.is_complete() {
            return;
        }
        self.accum_ms += elapsed_ms.max(0.0);
        if self.accum_ms > ms_per_char {
            self.revealed += 1;
            self.accum_ms = 0.0;
        }
    }
}

/// First `chars` characters of `text`, cut on a char boundary.
pub(crate) fn visible_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
