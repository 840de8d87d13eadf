use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::debug;

use crate::collab::{CollabError, Renderer};
use crate::session::result::SessionResults;
use crate::word::{DisplayMode, Word, WordId};

/// Plain line-oriented renderer for the terminal host.
pub struct TerminalRenderer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalRenderer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn line(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{text}")?;
        out.flush()
    }

    fn line_or_log(&self, text: &str) {
        if let Err(err) = self.line(text) {
            debug!("terminal write failed: {err}");
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render_option(&self, slot: usize, word: &Word, display_mode: DisplayMode) -> Result<(), CollabError> {
        let card = match (display_mode, &word.image) {
            (DisplayMode::Image, Some(image)) => format!("  [{}] {} <{image}>", slot + 1, word.label()),
            _ => format!("  [{}] {}", slot + 1, word.label()),
        };
        self.line(&card)?;
        Ok(())
    }

    fn render_introduction(&self, word: &Word, repetition: usize) -> Result<(), CollabError> {
        let text = if repetition == 0 {
            format!("New word: {} = {}", word.title, word.label())
        } else {
            format!("  ... {}", word.title)
        };
        self.line(&text)?;
        Ok(())
    }

    fn set_category_label(&self, category: &str) {
        self.line_or_log(&format!("-- {category} --"));
    }

    fn show_loading(&self) {
        debug!("loading");
    }

    fn hide_loading(&self) {
        debug!("loaded");
    }

    fn set_repeat_enabled(&self, enabled: bool) {
        debug!(enabled, "repeat button");
    }

    fn remove_cards_except(&self, _word_id: WordId) {
        self.line_or_log("  (only the answer is left)");
    }

    fn clear_cards(&self) {}

    fn show_results(&self, results: &SessionResults) {
        self.line_or_log(&format!(
            "Finished {} session: {} of {} rounds right first time ({:.0}%), {} word(s) to review",
            results.mode,
            results.correct_on_first_try,
            results.rounds_played,
            results.accuracy(),
            results.incorrect.len(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn test_cards_are_numbered_from_one() {
        let buffer = SharedBuffer::default();
        let renderer = TerminalRenderer::new(Box::new(buffer.clone()));
        let mut word = Word::new(1, "perro");
        word.translation = Some("dog".to_string());
        renderer.render_option(0, &word, DisplayMode::Text).unwrap();
        renderer.render_option(1, &Word::new(2, "gato"), DisplayMode::Text).unwrap();
        assert_eq!(buffer.text(), "  [1] dog\n  [2] gato\n");
    }

    #[test]
    fn test_image_mode_shows_image_reference() {
        let buffer = SharedBuffer::default();
        let renderer = TerminalRenderer::new(Box::new(buffer.clone()));
        let mut word = Word::new(1, "perro");
        word.image = Some("img/perro.png".to_string());
        renderer.render_option(2, &word, DisplayMode::Image).unwrap();
        assert_eq!(buffer.text(), "  [3] perro <img/perro.png>\n");
    }

    #[test]
    fn test_results_summary() {
        let buffer = SharedBuffer::default();
        let renderer = TerminalRenderer::new(Box::new(buffer.clone()));
        let mut results = SessionResults::empty("quiz");
        results.rounds_played = 4;
        results.correct_on_first_try = 3;
        results.incorrect = vec![9];
        renderer.show_results(&results);
        assert!(buffer.text().contains("3 of 4 rounds right first time (75%)"));
    }
}
