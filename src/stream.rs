//! Character-by-character reveal of an already-received reply.
//!
//! The full response text is in memory before the reveal starts; this is a
//! presentation animation, not transport streaming. Every step re-renders
//! the whole accumulated prefix, because block structure can change
//! retroactively once a later character completes a delimiter (a closing
//! code fence turns literal backticks into a code block).

use crate::markup::{self, Markup};
use std::time::Duration;

/// Drives the progressive reveal of one reply.
pub struct StreamPresenter {
    chars: Vec<char>,
    revealed: usize,
    prefix: String,
    delay: Duration,
}

impl StreamPresenter {
    pub fn start(text: String, delay: Duration) -> Self {
        Self {
            chars: text.chars().collect(),
            revealed: 0,
            prefix: String::new(),
            delay,
        }
    }

    /// Reveal the next character and re-render the accumulated prefix.
    pub fn step(&mut self) -> Markup {
        if self.revealed < self.chars.len() {
            self.prefix.push(self.chars[self.revealed]);
            self.revealed += 1;
        }
        markup::render(&self.prefix)
    }

    /// Whether every character has been revealed.
    pub fn is_done(&self) -> bool {
        self.revealed == self.chars.len()
    }

    /// Delay between reveal steps.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The complete reply text, regardless of reveal progress.
    pub fn full_text(&self) -> String {
        self.chars.iter().collect()
    }
}
