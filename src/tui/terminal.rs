//! Terminal access for the wizard: key input and full-screen drawing

use anyhow::{Context, Result};
use console::{Key, Term};
use crossbeam::channel::{Receiver, Sender, bounded, unbounded};
use std::io;
use std::thread;

/// Keys the wizard reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Up,
    Down,
    Tab,
    Escape,
    CtrlC,
    Other,
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        match key {
            Key::Char('\u{3}') | Key::CtrlC => KeyInput::CtrlC,
            Key::Char('\t') | Key::Tab => KeyInput::Tab,
            Key::Char(c) if !c.is_control() => KeyInput::Char(c),
            Key::Enter => KeyInput::Enter,
            Key::Backspace => KeyInput::Backspace,
            Key::ArrowUp => KeyInput::Up,
            Key::ArrowDown => KeyInput::Down,
            Key::Escape => KeyInput::Escape,
            _ => KeyInput::Other,
        }
    }
}

/// Keys read on a dedicated thread, one at a time
///
/// `read_key` switches the terminal to raw mode only while it waits. After
/// each key the thread parks until [`KeyReader::resume`]; dropping the reader
/// ends the thread without another read, so the terminal is left in its
/// normal mode once the wizard quits.
pub struct KeyReader {
    keys: Receiver<KeyInput>,
    resume: Sender<()>,
}

impl KeyReader {
    pub fn spawn(term: Term) -> Result<Self> {
        Self::spawn_with(move || term.read_key())
    }

    fn spawn_with<F>(mut read_key: F) -> Result<Self>
    where
        F: FnMut() -> io::Result<Key> + Send + 'static,
    {
        let (keys_tx, keys) = unbounded();
        let (resume, resume_rx) = bounded(1);

        thread::Builder::new()
            .name("key-reader".to_string())
            .spawn(move || {
                loop {
                    let key = match read_key() {
                        Ok(key) => KeyInput::from(key),
                        Err(e) => {
                            tracing::warn!("Failed to read key: {}", e);
                            break;
                        }
                    };
                    if keys_tx.send(key).is_err() || resume_rx.recv().is_err() {
                        break;
                    }
                }
            })
            .context("Failed to start key reader")?;

        Ok(Self { keys, resume })
    }

    pub fn keys(&self) -> &Receiver<KeyInput> {
        &self.keys
    }

    /// Let the thread wait for the next key
    pub fn resume(&self) {
        let _ = self.resume.try_send(());
    }
}

/// Full-screen drawing surface; restores the cursor when dropped
pub struct Screen {
    term: Term,
    last_frame: String,
}

impl Screen {
    pub fn open(term: Term) -> Result<Self> {
        if !term.is_term() {
            anyhow::bail!("The wizard needs an interactive terminal");
        }
        term.hide_cursor().context("Failed to hide cursor")?;
        term.clear_screen().context("Failed to clear screen")?;
        Ok(Self {
            term,
            last_frame: String::new(),
        })
    }

    pub fn width(&self) -> usize {
        usize::from(self.term.size().1)
    }

    /// Redraw from the top-left corner, skipping unchanged frames
    pub fn draw(&mut self, frame: &str) -> Result<()> {
        if frame == self.last_frame {
            return Ok(());
        }

        self.term.move_cursor_to(0, 0)?;
        for line in frame.lines() {
            self.term.clear_line()?;
            self.term.write_line(line)?;
        }
        self.term.clear_to_end_of_screen()?;
        self.term.flush()?;

        self.last_frame = frame.to_string();
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = self.term.clear_screen();
        let _ = self.term.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_reader() -> (KeyReader, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let reader = KeyReader::spawn_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Key::Char('j'))
        })
        .unwrap();
        (reader, reads)
    }

    #[test]
    fn test_reader_waits_for_resume_between_keys() {
        let (reader, reads) = counting_reader();
        let wait = Duration::from_millis(100);

        assert_eq!(reader.keys().recv_timeout(wait), Ok(KeyInput::Char('j')));
        assert!(reader.keys().recv_timeout(wait).is_err());
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        reader.resume();
        assert_eq!(reader.keys().recv_timeout(wait), Ok(KeyInput::Char('j')));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropped_reader_stops_reading() {
        let (reader, reads) = counting_reader();
        let first = reader.keys().recv_timeout(Duration::from_millis(100));
        assert_eq!(first, Ok(KeyInput::Char('j')));

        drop(reader);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_error_ends_the_reader() {
        let reader = KeyReader::spawn_with(|| Err(io::Error::other("not a terminal"))).unwrap();
        assert!(reader.keys().recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyInput::from(Key::Char('q')), KeyInput::Char('q'));
        assert_eq!(KeyInput::from(Key::Char('\u{3}')), KeyInput::CtrlC);
        assert_eq!(KeyInput::from(Key::CtrlC), KeyInput::CtrlC);
        assert_eq!(KeyInput::from(Key::Char('\t')), KeyInput::Tab);
        assert_eq!(KeyInput::from(Key::ArrowUp), KeyInput::Up);
        assert_eq!(KeyInput::from(Key::Escape), KeyInput::Escape);
        assert_eq!(KeyInput::from(Key::Home), KeyInput::Other);
    }
}
