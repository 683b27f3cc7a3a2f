//! Domain types shared across the dispatch engine
//!
//! These types are used by the engine service and its stores. Everything here
//! is serializable with serde; session phases are persisted as tagged JSON and
//! ticket statuses as bare tag strings so the store can compare on them in a
//! single conditional write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Identities
// ============================================================================

/// Stable endpoint address of one actor (client or provider) on the message
/// transport. Group and broadcast addresses are never valid identities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActorIdentity(pub String);

impl ActorIdentity {
    /// Accept only a single bare addressable identity. Group addresses carry
    /// a `-` marker on the transport; empty or whitespace senders are noise.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains('-') || raw.contains(char::is_whitespace) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned ticket identifier.
pub type JobId = i64;

// ============================================================================
// Service categories
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Electrical,
    Plumbing,
    Carpentry,
}

impl Category {
    /// Menu code as presented in the category prompt.
    pub fn from_menu_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Electrical),
            "2" => Some(Self::Plumbing),
            "3" => Some(Self::Carpentry),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "Electrical",
            Self::Plumbing => "Plumbing",
            Self::Carpentry => "Carpentry",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electrical" => Ok(Self::Electrical),
            "Plumbing" => Ok(Self::Plumbing),
            "Carpentry" => Ok(Self::Carpentry),
            other => Err(ParseError::Category(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Session state machine
// ============================================================================

/// Where one actor is in the dialogue. Persisted as tagged JSON, one row per
/// identity. Parameters the dialogue has already captured ride along as typed
/// fields rather than being spliced into a delimiter-joined status string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "phase")]
pub enum SessionPhase {
    /// First-ever contact; promoted to the intake menu on the next message.
    New,
    Idle,
    AwaitingIntakeType,
    AwaitingCategory,
    AwaitingLocation {
        category: Category,
    },
    AwaitingDesc {
        category: Category,
        location: String,
    },
    EnquiryMode,
    /// Client side: a provider has claimed `job_id`, awaiting the yes/no.
    AwaitingApproval {
        job_id: JobId,
    },
    /// Client side: the provider reported an outcome, awaiting confirmation.
    VerifyingJob {
        job_id: JobId,
        reported: ReportedOutcome,
    },
    /// Provider side: matched to `job_id`, expected to report its outcome.
    ActiveJob {
        job_id: JobId,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub identity: ActorIdentity,
    pub phase: SessionPhase,
    pub last_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Providers
// ============================================================================

/// One provider profile. An identity may carry several profiles (one per
/// category); display lookups take the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub identity: ActorIdentity,
    pub name: String,
    pub category: Category,
    pub rating: f64,
    pub is_available: bool,
}

// ============================================================================
// Job tickets
// ============================================================================

/// Outcome a provider reports when closing out a job, pending client
/// verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportedOutcome {
    Completed,
    Cancelled,
}

impl ReportedOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// The terminal ticket status this outcome maps to once verified.
    pub fn terminal_status(&self) -> TicketStatus {
        match self {
            Self::Completed => TicketStatus::Completed,
            Self::Cancelled => TicketStatus::Cancelled,
        }
    }
}

impl std::str::FromStr for ReportedOutcome {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseError::Outcome(other.to_string())),
        }
    }
}

/// Lifecycle of a job ticket. Persisted as the tag string so the conditional
/// transition primitive can compare on the column directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketStatus {
    Searching,
    Broadcasted,
    PendingClientApproval,
    Matched,
    /// A reported outcome is recorded on the ticket alongside this status.
    PendingVerification,
    Completed,
    Cancelled,
    Disputed,
    FailedNoArtisans,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "SEARCHING",
            Self::Broadcasted => "BROADCASTED",
            Self::PendingClientApproval => "PENDING_CLIENT_APPROVAL",
            Self::Matched => "MATCHED",
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Disputed => "DISPUTED",
            Self::FailedNoArtisans => "FAILED_NO_ARTISANS",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Disputed | Self::FailedNoArtisans
        )
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEARCHING" => Ok(Self::Searching),
            "BROADCASTED" => Ok(Self::Broadcasted),
            "PENDING_CLIENT_APPROVAL" => Ok(Self::PendingClientApproval),
            "MATCHED" => Ok(Self::Matched),
            "PENDING_VERIFICATION" => Ok(Self::PendingVerification),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "DISPUTED" => Ok(Self::Disputed),
            "FAILED_NO_ARTISANS" => Ok(Self::FailedNoArtisans),
            other => Err(ParseError::Status(other.to_string())),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted record of one service request. Client, category, location
/// and description are immutable after creation; the rest is driven by the
/// ticket state machine.
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub job_id: JobId,
    pub client_identity: ActorIdentity,
    pub category: Category,
    pub location: String,
    pub description: String,
    pub status: TicketStatus,
    pub reported_outcome: Option<ReportedOutcome>,
    pub notified_providers: Vec<ActorIdentity>,
    pub awarded_provider: Option<ActorIdentity>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Inbound events and command grammar
// ============================================================================

/// One event as delivered by the message transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub body: String,
    pub is_group_or_status: bool,
}

/// Strip the markdown emphasis the transport may wrap around commands and
/// trim surrounding whitespace. Free-text fields (location, description,
/// enquiry) are captured from the raw body, not from this.
pub fn normalize(body: &str) -> String {
    body.trim().replace(['*', '_'], "")
}

/// Commands recognized from any session phase, checked before phase dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `menu` or `cancel`: reset to the intake menu.
    Menu,
    /// `ACCEPT <job_id>`: provider claim attempt. `job_id` is `None` when the
    /// argument is missing or not a number; the claim handler rejects it as
    /// an invalid job rather than falling through to the funnel.
    Accept { job_id: Option<JobId> },
}

impl Command {
    pub fn parse(body: &str) -> Option<Self> {
        let text = normalize(body);
        let lower = text.to_lowercase();
        if lower == "menu" || lower == "cancel" {
            return Some(Self::Menu);
        }
        let upper = text.to_uppercase();
        if let Some(rest) = upper.strip_prefix("ACCEPT ") {
            let job_id = rest.split_whitespace().next().and_then(|t| t.parse().ok());
            return Some(Self::Accept { job_id });
        }
        None
    }
}

/// Affirmative reply where the prompt offered numbered codes alongside
/// yes/no (the verification dialogue). The approval dialogue offers YES/NO
/// only and matches `yes` literally.
pub fn is_affirmative(body: &str) -> bool {
    let text = normalize(body).to_lowercase();
    text == "yes" || text == "1"
}

/// Negative counterpart of [`is_affirmative`].
pub fn is_negative(body: &str) -> bool {
    let text = normalize(body).to_lowercase();
    text == "no" || text == "2"
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown category '{0}'")]
    Category(String),
    #[error("unknown ticket status '{0}'")]
    Status(String),
    #[error("unknown reported outcome '{0}'")]
    Outcome(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_groups_and_noise() {
        assert!(ActorIdentity::parse("23480001@c.us").is_some());
        assert!(ActorIdentity::parse("").is_none());
        assert!(ActorIdentity::parse("   ").is_none());
        assert!(ActorIdentity::parse("123-456@g.us").is_none());
        assert!(ActorIdentity::parse("two words").is_none());
    }

    #[test]
    fn accept_command_survives_markdown_and_case() {
        assert_eq!(
            Command::parse("*accept 42*"),
            Some(Command::Accept { job_id: Some(42) })
        );
        assert_eq!(
            Command::parse("ACCEPT forty-two"),
            Some(Command::Accept { job_id: None })
        );
        assert_eq!(Command::parse("ACCEPTANCE"), None);
        assert_eq!(Command::parse("  MENU "), Some(Command::Menu));
        assert_eq!(Command::parse("Cancel"), Some(Command::Menu));
    }

    #[test]
    fn phase_round_trips_free_text_with_delimiters() {
        // The original encoded phase params into one underscore-joined string,
        // which broke on locations containing the delimiter. Typed fields
        // must not.
        let phase = SessionPhase::AwaitingDesc {
            category: Category::Plumbing,
            location: "Block_A, Hostel 3".to_string(),
        };
        let json = serde_json::to_string(&phase).unwrap();
        let back: SessionPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phase);
    }

    #[test]
    fn status_tags_round_trip() {
        let all = [
            TicketStatus::Searching,
            TicketStatus::Broadcasted,
            TicketStatus::PendingClientApproval,
            TicketStatus::Matched,
            TicketStatus::PendingVerification,
            TicketStatus::Completed,
            TicketStatus::Cancelled,
            TicketStatus::Disputed,
            TicketStatus::FailedNoArtisans,
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert!("HALF_DONE".parse::<TicketStatus>().is_err());
    }
}
