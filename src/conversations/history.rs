use super::message::{Message, Role};

/// Chronological turns of one conversation. The system message is not
/// stored here; it is prepended when a request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Removes the newest turn if it was written by the user.
    pub fn pop_user_turn(&mut self) -> Option<Message> {
        if self.last_role() == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Drops everything and keeps a single assistant turn holding `summary`.
    pub fn replace_with_summary(&mut self, summary: impl Into<String>) {
        self.messages.clear();
        self.push_assistant(summary);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|message| message.role)
    }

    /// Renders every turn as `"<role>: <content>\n"`.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|message| format!("{}: {}\n", message.role, message.content))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(history: &History) -> Vec<Role> {
        history.iter().map(|m| m.role).collect()
    }

    #[test]
    fn test_user_then_assistant_grows_by_two_in_order() {
        let mut history = History::new();
        history.push_user("first question");
        history.push_assistant("first answer");
        let before = history.len();

        history.push_user("second question");
        history.push_assistant("second answer");

        assert_eq!(history.len(), before + 2);
        assert_eq!(
            roles(&history),
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(history.messages()[2].content, "second question");
    }

    #[test]
    fn test_replace_with_summary_leaves_single_assistant_turn() {
        let mut history = History::new();
        history.push_user("hello");
        history.push_assistant("hi");
        history.push_user("how are you");

        history.replace_with_summary("User greeted the assistant.");

        assert_eq!(history.len(), 1);
        assert_eq!(
            history.messages()[0],
            Message::assistant("User greeted the assistant.")
        );
    }

    #[test]
    fn test_transcript_format() {
        let mut history = History::new();
        history.push_user("hello");
        history.push_assistant("hi there");

        assert_eq!(history.transcript(), "user: hello\nassistant: hi there\n");
        assert_eq!(History::new().transcript(), "");
    }

    #[test]
    fn test_pop_user_turn_only_takes_user_messages() {
        let mut history = History::new();
        history.push_user("hello");
        history.push_assistant("hi");

        assert_eq!(history.pop_user_turn(), None);
        assert_eq!(history.len(), 2);

        history.push_user("again");
        assert_eq!(history.pop_user_turn(), Some(Message::user("again")));
        assert_eq!(history.last_role(), Some(Role::Assistant));
    }
}
