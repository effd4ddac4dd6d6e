use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Points credited to both participants when a swap completes.
pub const SWAP_REWARD_POINTS: i32 = 10;
/// Welcome bonus credited at registration.
pub const WELCOME_BONUS_POINTS: i32 = 50;
/// Default point value for a new listing when the uploader does not set one.
pub const DEFAULT_ITEM_POINTS: i32 = 20;

/// Availability status of a listed item. Driven exclusively by swap-request
/// transitions and admin moderation; there is no other mutation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Available,
    InNegotiation,
    Swapped,
    Removed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Available => "available",
            ItemStatus::InNegotiation => "in_negotiation",
            ItemStatus::Swapped => "swapped",
            ItemStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "available" => Ok(ItemStatus::Available),
            "in_negotiation" => Ok(ItemStatus::InNegotiation),
            "swapped" => Ok(ItemStatus::Swapped),
            "removed" => Ok(ItemStatus::Removed),
            other => Err(format!("unknown item status: {other}")),
        }
    }
}

/// Lifecycle status of a swap request.
///
/// `pending -> {accepted, rejected, cancelled}`, `accepted -> {completed, cancelled}`.
/// `rejected`, `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Completed => "completed",
            SwapStatus::Cancelled => "cancelled",
        }
    }

    /// An active request holds both referenced items in negotiation.
    pub fn is_active(&self) -> bool {
        matches!(self, SwapStatus::Pending | SwapStatus::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Rejected | SwapStatus::Completed | SwapStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        matches!(
            (self, next),
            (
                SwapStatus::Pending,
                SwapStatus::Accepted | SwapStatus::Rejected | SwapStatus::Cancelled
            ) | (
                SwapStatus::Accepted,
                SwapStatus::Completed | SwapStatus::Cancelled
            )
        )
    }

    /// Item status implied by this request status for the items it references.
    /// Item status is a projection of request status; every transition handler
    /// writes both sides in the same transaction to keep them consistent.
    pub fn implied_item_status(&self) -> ItemStatus {
        match self {
            SwapStatus::Pending | SwapStatus::Accepted => ItemStatus::InNegotiation,
            SwapStatus::Rejected | SwapStatus::Cancelled => ItemStatus::Available,
            SwapStatus::Completed => ItemStatus::Swapped,
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "accepted" => Ok(SwapStatus::Accepted),
            "rejected" => Ok(SwapStatus::Rejected),
            "completed" => Ok(SwapStatus::Completed),
            "cancelled" => Ok(SwapStatus::Cancelled),
            other => Err(format!("unknown swap status: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub points: i32,
    pub swap_history: i32,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClothingItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub size: String,
    pub condition: String,
    pub points: i32,
    pub tags: Vec<String>,
    pub uploader_id: Uuid,
    pub uploader_name: String,
    pub status: ItemStatus,
    pub views: i32,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A swap request carries denormalized user names, item titles and first
/// images so lists render without re-fetching either side.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwapRequest {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_user_name: String,
    pub from_item_id: Uuid,
    pub from_item_title: String,
    pub from_item_image: String,
    pub to_user_id: Uuid,
    pub to_user_name: String,
    pub to_item_id: Uuid,
    pub to_item_title: String,
    pub to_item_image: String,
    pub status: SwapStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_accepts_rejects_and_cancels() {
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::Accepted));
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::Rejected));
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::Cancelled));
        assert!(!SwapStatus::Pending.can_transition_to(SwapStatus::Completed));
    }

    #[test]
    fn accepted_completes_or_cancels() {
        assert!(SwapStatus::Accepted.can_transition_to(SwapStatus::Completed));
        assert!(SwapStatus::Accepted.can_transition_to(SwapStatus::Cancelled));
        assert!(!SwapStatus::Accepted.can_transition_to(SwapStatus::Rejected));
        assert!(!SwapStatus::Accepted.can_transition_to(SwapStatus::Pending));
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let all = [
            SwapStatus::Pending,
            SwapStatus::Accepted,
            SwapStatus::Rejected,
            SwapStatus::Completed,
            SwapStatus::Cancelled,
        ];
        for terminal in [
            SwapStatus::Rejected,
            SwapStatus::Completed,
            SwapStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.is_active());
            for next in all {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} must not transition to {next}"
                );
            }
        }
    }

    #[test]
    fn active_statuses_hold_items_in_negotiation() {
        assert_eq!(
            SwapStatus::Pending.implied_item_status(),
            ItemStatus::InNegotiation
        );
        assert_eq!(
            SwapStatus::Accepted.implied_item_status(),
            ItemStatus::InNegotiation
        );
        assert_eq!(
            SwapStatus::Rejected.implied_item_status(),
            ItemStatus::Available
        );
        assert_eq!(
            SwapStatus::Cancelled.implied_item_status(),
            ItemStatus::Available
        );
        assert_eq!(
            SwapStatus::Completed.implied_item_status(),
            ItemStatus::Swapped
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in ["pending", "accepted", "rejected", "completed", "cancelled"] {
            assert_eq!(status.parse::<SwapStatus>().unwrap().as_str(), status);
        }
        for status in ["pending", "available", "in_negotiation", "swapped", "removed"] {
            assert_eq!(status.parse::<ItemStatus>().unwrap().as_str(), status);
        }
        assert!("paid".parse::<SwapStatus>().is_err());
    }
}
