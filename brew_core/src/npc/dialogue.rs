/// Timer steps of the typewriter dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStep {
    Reveal,
    NextLine,
    Finish,
}

/// Outcome of revealing one more character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reveal {
    /// Text now visible for the current line.
    Partial(String),
    /// Every character of the line is already visible.
    LineComplete { last_line: bool },
}

/// Position inside the dialogue: which line, and how many of its characters
/// are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueCursor {
    line: usize,
    revealed: usize,
}

impl DialogueCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn reveal_next(&mut self, lines: &[String]) -> Reveal {
        let last_line = self.line + 1 >= lines.len();
        let Some(line) = lines.get(self.line) else {
            return Reveal::LineComplete { last_line: true };
        };
        if self.revealed >= line.chars().count() {
            return Reveal::LineComplete { last_line };
        }
        self.revealed += 1;
        Reveal::Partial(line.chars().take(self.revealed).collect())
    }

    pub fn advance_line(&mut self) {
        self.line += 1;
        self.revealed = 0;
    }
}
