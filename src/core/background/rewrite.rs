use std::fmt;
use std::str::FromStr;

/// Context-menu rewrites of the selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteAction {
    FixGrammar,
    MoreProfessional,
    MoreFriendly,
    Shorter,
}

impl RewriteAction {
    pub const ALL: [RewriteAction; 4] = [
        RewriteAction::FixGrammar,
        RewriteAction::MoreProfessional,
        RewriteAction::MoreFriendly,
        RewriteAction::Shorter,
    ];

    /// Menu item id.
    pub fn id(&self) -> &'static str {
        match self {
            RewriteAction::FixGrammar => "fix-grammar",
            RewriteAction::MoreProfessional => "more-professional",
            RewriteAction::MoreFriendly => "more-friendly",
            RewriteAction::Shorter => "shorter",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RewriteAction::FixGrammar => "Fix grammar",
            RewriteAction::MoreProfessional => "Make it more professional",
            RewriteAction::MoreFriendly => "Make it more friendly",
            RewriteAction::Shorter => "Make it shorter",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            RewriteAction::FixGrammar => {
                "Correct the grammar and spelling of the user's text. Keep its meaning and language. Reply with the corrected text only."
            }
            RewriteAction::MoreProfessional => {
                "Rewrite the user's text in a more professional tone. Keep its meaning and language. Reply with the rewritten text only."
            }
            RewriteAction::MoreFriendly => {
                "Rewrite the user's text in a warmer, friendlier tone. Keep its meaning and language. Reply with the rewritten text only."
            }
            RewriteAction::Shorter => {
                "Shorten the user's text while keeping its meaning and language. Reply with the shortened text only."
            }
        }
    }
}

impl fmt::Display for RewriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RewriteAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RewriteAction::ALL
            .into_iter()
            .find(|action| action.id() == value)
            .ok_or_else(|| format!("Unknown rewrite action '{value}'"))
    }
}
