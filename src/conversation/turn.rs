//! Turn and citation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Progressive-disclosure state of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
    /// Received but the animation has not started
    Pending,
    /// Text is being typed out
    Revealing,
    /// Fully visible, metadata unlocked
    #[default]
    Complete,
}

/// Category of evidence a citation points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationSource {
    Project,
    Skill,
    SkillGap,
    Competency,
    Role,
    #[serde(other)]
    Other,
}

/// Structured evidence reference attached to an assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: CitationSource,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl Citation {
    pub fn new(source: CitationSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            details: None,
        }
    }
}

/// Where a turn came from. Fallback turns never go back to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrigin {
    User,
    Greeting,
    Backend,
    Fallback,
}

/// One message unit in a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    citations: Vec<Citation>,
    suggested_actions: Vec<String>,
    pub intent: Option<String>,
    pub reveal_state: RevealState,
    pub origin: TurnOrigin,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            citations: Vec::new(),
            suggested_actions: Vec::new(),
            intent: None,
            reveal_state: RevealState::Complete,
            origin: TurnOrigin::User,
        }
    }

    /// Locally synthesized opening message; starts pending and is revealed on mount
    pub fn greeting(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            citations: Vec::new(),
            suggested_actions: Vec::new(),
            intent: None,
            reveal_state: RevealState::Pending,
            origin: TurnOrigin::Greeting,
        }
    }

    /// Assistant reply from the backend, metadata withheld until revealed
    pub fn reply(
        content: impl Into<String>,
        citations: Vec<Citation>,
        suggested_actions: Vec<String>,
        intent: Option<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            citations,
            suggested_actions,
            intent,
            reveal_state: RevealState::Pending,
            origin: TurnOrigin::Backend,
        }
    }

    /// Fixed apology shown in place of a failed dispatch; never animated
    pub fn fallback(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            citations: Vec::new(),
            suggested_actions: Vec::new(),
            intent: None,
            reveal_state: RevealState::Complete,
            origin: TurnOrigin::Fallback,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.reveal_state == RevealState::Complete
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == TurnOrigin::Fallback
    }

    /// Citations as a renderer may see them: empty until the reveal completes
    pub fn visible_citations(&self) -> &[Citation] {
        if self.is_complete() {
            &self.citations
        } else {
            &[]
        }
    }

    /// Suggested follow-ups as a renderer may see them
    pub fn visible_suggestions(&self) -> &[String] {
        if self.is_complete() {
            &self.suggested_actions
        } else {
            &[]
        }
    }

    pub fn display_timestamp(&self) -> Option<DateTime<Utc>> {
        self.is_complete().then_some(self.created_at)
    }

    /// Gated, serializable view of this turn for rendering
    pub fn view(&self) -> TurnView {
        let complete = self.is_complete();
        TurnView {
            role: self.role,
            content: if complete {
                self.content.clone()
            } else {
                String::new()
            },
            reveal_state: self.reveal_state,
            intent: self.intent.clone(),
            citations: self.visible_citations().to_vec(),
            suggested_actions: self.visible_suggestions().to_vec(),
            created_at: self.display_timestamp(),
        }
    }
}

/// What the front end is allowed to render for a turn.
///
/// While the turn is not complete the text arrives through reveal frames,
/// so `content` is empty and the metadata fields are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnView {
    pub role: Role,
    pub content: String,
    pub reveal_state: RevealState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub citations: Vec<Citation>,
    pub suggested_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
