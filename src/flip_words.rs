use crate::config::HostHints;
use crate::renderer::Surface;
use crate::text::TextPainter;

pub const DEFAULT_INTERVAL_MS: f32 = 3000.0;
pub const DEFAULT_TRANSITION_MS: f32 = 400.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Animated,
    /// Reduced motion: words swap without a transition.
    Instant,
}

/// Cycles through a list of words, one every `interval_ms`.
pub struct FlipWords {
    words: Vec<String>,
    index: usize,
    previous: Option<usize>,
    elapsed_ms: f32,
    interval_ms: f32,
    transition_ms: f32,
    /// Time spent in the running transition, if any.
    transition: Option<f32>,
    motion: Motion,
}

impl FlipWords {
    pub fn new(words: Vec<String>, hints: HostHints) -> Self {
        let motion = if hints.prefers_reduced_motion {
            Motion::Instant
        } else {
            Motion::Animated
        };
        Self {
            words,
            index: 0,
            previous: None,
            elapsed_ms: 0.0,
            interval_ms: DEFAULT_INTERVAL_MS,
            transition_ms: DEFAULT_TRANSITION_MS,
            transition: None,
            motion,
        }
    }

    pub fn with_timing(mut self, interval_ms: f32, transition_ms: f32) -> Self {
        self.interval_ms = interval_ms.max(1.0);
        self.transition_ms = transition_ms.clamp(0.0, self.interval_ms);
        self
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn tick(&mut self, dt_ms: f32) {
        if let Some(t) = self.transition.as_mut() {
            *t += dt_ms;
            if *t >= self.transition_ms {
                self.transition = None;
                self.previous = None;
            }
        }

        if self.words.len() < 2 {
            return;
        }
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms < self.interval_ms {
            return;
        }
        self.elapsed_ms %= self.interval_ms;
        let next = (self.index + 1) % self.words.len();
        match self.motion {
            Motion::Animated if self.transition_ms > 0.0 => {
                self.previous = Some(self.index);
                self.transition = Some(0.0);
            }
            _ => {
                self.previous = None;
                self.transition = None;
            }
        }
        self.index = next;
    }

    pub fn current(&self) -> Option<&str> {
        self.words.get(self.index).map(String::as_str)
    }

    /// The word being flipped out, while a transition runs.
    pub fn outgoing(&self) -> Option<&str> {
        self.previous
            .and_then(|i| self.words.get(i))
            .map(String::as_str)
    }

    /// Transition progress in `[0, 1]`; `1` when settled.
    pub fn progress(&self) -> f32 {
        match self.transition {
            Some(t) => (t / self.transition_ms).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    /// Letters of the incoming word reveal one after another.
    pub fn letter_opacity(&self, letter: usize) -> f32 {
        let len = self.current().map(|w| w.chars().count()).unwrap_or(0);
        if len == 0 {
            return 0.0;
        }
        (self.progress() * len as f32 - letter as f32).clamp(0.0, 1.0)
    }

    pub fn draw(
        &self,
        surface: &mut Surface,
        painter: &TextPainter,
        x: f32,
        y: f32,
        px: f32,
        color: [u8; 4],
    ) {
        let rise = (1.0 - self.progress()) * px * 0.5;
        if let Some(word) = self.outgoing() {
            let mut faded = color;
            faded[3] = ((1.0 - self.progress()) * color[3] as f32) as u8;
            painter.draw_text(surface, word, x, y - px * 0.5 * self.progress(), px, faded);
        }
        let Some(word) = self.current() else {
            return;
        };
        let mut cursor = x;
        for (i, c) in word.chars().enumerate() {
            let mut letter = color;
            letter[3] = (self.letter_opacity(i) * color[3] as f32) as u8;
            cursor += painter.draw_char(surface, c, cursor, y + rise, px, letter);
        }
    }
}
