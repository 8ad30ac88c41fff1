//! Incremental rendering buffer for a reply that is still streaming.
//!
//! Text is appended as it is decoded; a cursor marks how much of it has
//! been shown. The cursor only moves forward and never passes the end of
//! the buffer, and [`TypingBuffer::catch_up`] always exposes the whole text
//! so a fast stream cannot leave trailing characters unrendered.

use std::time::Duration;

/// How streamed text is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    /// Show everything received after each read.
    #[default]
    Chunk,
    /// Reveal `chars_per_tick` characters every `interval`.
    Typewriter {
        interval: Duration,
        chars_per_tick: usize,
    },
}

impl RenderStrategy {
    /// One character every 15 ms.
    pub fn typewriter() -> Self {
        RenderStrategy::Typewriter {
            interval: Duration::from_millis(15),
            chars_per_tick: 1,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TypingBuffer {
    text: String,
    /// Byte offset of the render cursor; always on a char boundary.
    rendered: usize,
}

impl TypingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Move the cursor forward by up to `chars` characters.
    pub fn advance(&mut self, chars: usize) -> &str {
        let tail = &self.text[self.rendered..];
        let step = tail
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| offset)
            .unwrap_or(tail.len());
        self.rendered += step;
        self.visible()
    }

    /// Move the cursor to the end of the buffer.
    pub fn catch_up(&mut self) -> &str {
        self.rendered = self.text.len();
        self.visible()
    }

    /// The rendered prefix.
    pub fn visible(&self) -> &str {
        &self.text[..self.rendered]
    }

    pub fn is_drained(&self) -> bool {
        self.rendered == self.text.len()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
