//! Suggested follow-up handling
//!
//! Clicking a suggestion prefills the input; sending stays a user action.

use serde::Serialize;

/// The session's not-yet-sent input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputBuffer {
    pub text: String,
    pub focus_requested: bool,
}

impl InputBuffer {
    /// Take the pending text, e.g. once the user actually submits it
    pub fn take(&mut self) -> String {
        self.focus_requested = false;
        std::mem::take(&mut self.text)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SuggestionRouter;

impl SuggestionRouter {
    /// Copy the suggestion verbatim into the input buffer and ask for focus
    pub fn on_suggestion_clicked(self, action_text: &str, input: &mut InputBuffer) {
        action_text.clone_into(&mut input.text);
        input.focus_requested = true;
    }
}
