//! Clipboard seam.
//!
//! The engine never touches a system clipboard. Hosts implement
//! [`Clipboard`] over whatever they have (browser, OS, file); tests use
//! [`MemoryClipboard`].

pub trait Clipboard {
    fn read_text(&self) -> Option<String>;
    fn write_text(&mut self, text: String);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&self) -> Option<String> {
        self.text.clone()
    }

    fn write_text(&mut self, text: String) {
        self.text = Some(text);
    }
}
