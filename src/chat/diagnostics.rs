//! Canned replies used when the chat provider cannot answer

use crate::telemetry::ranges::{self, OperatingRange};
use regex::Regex;
use std::sync::OnceLock;

pub const UNCONFIGURED_REPLY: &str =
    "I apologize, but I'm not properly configured. Please check the server logs for more details.";

pub const CONNECTION_REPLY: &str = "I apologize, but I'm having trouble connecting to my knowledge base right now. This might be due to an API configuration issue. Please check the server logs for more details.";

pub const CONFIGURATION_ISSUE_REPLY: &str =
    "I apologize, but I'm having configuration issues. Please try again later.";

pub const EMPTY_REPLY: &str = "I apologize, but I was unable to generate a meaningful response. Please try rephrasing your question.";

pub const UNEXPECTED_FORMAT_REPLY: &str = "I apologize, but I received an unexpected response format from my knowledge base. Please check the server logs for more details.";

pub const INVALID_RESPONSE_REPLY: &str = "I apologize, but I received an invalid response from my knowledge base. Please check the server logs for more details.";

pub const LOW_PH_PROTOCOL: &str = "1. Add crushed coral\n2. Check pH every 12hrs\n3. Monitor ammonia (<0.5ppm)\n4. If pH stays low >48hrs:\n   - Do 20% water change\n   - Check fish health";

pub fn api_error_reply(message: &str) -> String {
    format!("I apologize, but I encountered an error: {}", message)
}

/// Water-quality parameters a chat message can mention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Ph,
    Ec,
    Ammonia,
    Temperature,
}

impl Keyword {
    pub const ALL: [Keyword; 4] = [
        Keyword::Ph,
        Keyword::Ec,
        Keyword::Ammonia,
        Keyword::Temperature,
    ];

    pub fn range(&self) -> OperatingRange {
        match self {
            Keyword::Ph => ranges::PH,
            Keyword::Ec => ranges::EC,
            Keyword::Ammonia => ranges::AMMONIA,
            Keyword::Temperature => ranges::TEMPERATURE,
        }
    }

    fn pattern(&self) -> &'static Regex {
        static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            // Readings are often written glued to the value, e.g. "pH6.8"
            [
                r"(?i)\bph(?:\b|\d)",
                r"(?i)\bec(?:\b|\d)",
                r"(?i)\bammonia\b",
                r"(?i)\btemp(?:erature)?s?\b",
            ]
            .map(|p| Regex::new(p).expect("valid regex"))
        });

        match self {
            Keyword::Ph => &patterns[0],
            Keyword::Ec => &patterns[1],
            Keyword::Ammonia => &patterns[2],
            Keyword::Temperature => &patterns[3],
        }
    }

    pub fn is_mentioned(&self, message: &str) -> bool {
        self.pattern().is_match(message)
    }
}

/// Keywords present in `message`, in a fixed order
pub fn mentioned(message: &str) -> Vec<Keyword> {
    Keyword::ALL
        .into_iter()
        .filter(|k| k.is_mentioned(message))
        .collect()
}

/// Reply for a rate-limited turn: the ranges the user asked about, or
/// `None` when the message names no parameter
pub fn rate_limit_diagnostic(message: &str) -> Option<String> {
    let keywords = mentioned(message);
    if keywords.is_empty() {
        return None;
    }

    let mut reply = String::from("ERROR: Parameter outside optimal range:\n");
    for keyword in keywords {
        let range = keyword.range();
        reply.push_str(&format!("- {} must be {}\n", range.label, range.limit));
    }
    reply.push_str("\nPlease adjust parameters to within these ranges.");
    Some(reply)
}

/// Reply when the provider returned a blank message
pub fn empty_content_reply(message: &str) -> &'static str {
    if Keyword::Ph.is_mentioned(message) {
        LOW_PH_PROTOCOL
    } else {
        EMPTY_REPLY
    }
}
