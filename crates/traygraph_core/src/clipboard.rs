//! Text clipboard port.
//!
//! # Responsibility
//! - Abstract the host clipboard used by copy and paste operations.
//! - Provide an in-memory clipboard for headless hosts and tests.

use async_trait::async_trait;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Clipboard access failure reported by the host.
#[derive(Debug)]
pub enum ClipboardError {
    Unavailable(String),
    ReadFailed(String),
    WriteFailed(String),
}

impl Display for ClipboardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "clipboard unavailable: {reason}"),
            Self::ReadFailed(reason) => write!(f, "clipboard read failed: {reason}"),
            Self::WriteFailed(reason) => write!(f, "clipboard write failed: {reason}"),
        }
    }
}

impl Error for ClipboardError {}

pub type ClipboardResult<T> = Result<T, ClipboardError>;

#[async_trait(?Send)]
pub trait Clipboard {
    async fn read_text(&self) -> ClipboardResult<String>;
    async fn write_text(&self, text: &str) -> ClipboardResult<()>;
}

#[async_trait(?Send)]
impl<C: Clipboard + ?Sized> Clipboard for &C {
    async fn read_text(&self) -> ClipboardResult<String> {
        (**self).read_text().await
    }

    async fn write_text(&self, text: &str) -> ClipboardResult<()> {
        (**self).write_text(text).await
    }
}

/// Process-local clipboard holding the last written text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: RefCell<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: RefCell::new(text.into()),
        }
    }

    /// Synchronous snapshot of the current contents.
    pub fn contents(&self) -> String {
        self.text.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Clipboard for MemoryClipboard {
    async fn read_text(&self) -> ClipboardResult<String> {
        Ok(self.contents())
    }

    async fn write_text(&self, text: &str) -> ClipboardResult<()> {
        *self.text.borrow_mut() = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clipboard, MemoryClipboard};
    use futures::executor::block_on;

    #[test]
    fn memory_clipboard_keeps_last_write() {
        let clipboard = MemoryClipboard::with_text("old");
        block_on(clipboard.write_text("new")).unwrap();
        assert_eq!(block_on(clipboard.read_text()).unwrap(), "new");
        assert_eq!(clipboard.contents(), "new");
    }
}
