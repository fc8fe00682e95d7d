pub(crate) const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Braille "typing" indicator shown while a reply is pending.
#[derive(Debug, Default)]
pub(crate) struct Spinner {
    frame: usize,
}

impl Spinner {
    pub(crate) fn tick(&mut self) {
        self.frame = (self.frame + 1) % BRAILLE_FRAMES.len();
    }

    pub(crate) fn reset(&mut self) {
        self.frame = 0;
    }

    pub(crate) fn glyph(&self) -> &'static str {
        BRAILLE_FRAMES[self.frame]
    }
}
