//! Chat session state: the current context blob and when it was built.

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    context: String,
    last_sync: Option<DateTime<Local>>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
    }

    pub fn last_sync(&self) -> Option<DateTime<Local>> {
        self.last_sync
    }

    /// Replace the context wholesale and stamp the sync time.
    pub fn replace(&mut self, context: String, at: DateTime<Local>) {
        self.context = context;
        self.last_sync = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = ChatSession::new();
        assert!(!session.has_context());
        assert!(session.last_sync().is_none());
    }

    #[test]
    fn test_replace_overwrites() {
        let mut session = ChatSession::new();
        let t1 = Local::now();
        session.replace("first".to_string(), t1);
        session.replace("second".to_string(), t1);
        assert_eq!(session.context(), "second");
        assert_eq!(session.last_sync(), Some(t1));
    }
}
