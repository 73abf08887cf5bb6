use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Deal outcome classification, orthogonal to pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    New,
    InProgress,
    Won,
    Lost,
}

/// Ordered pipeline position. The declaration order is the pipeline
/// order; `index()` defines progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Qualification,
    Proposal,
    Negotiation,
    Closed,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown deal status: {0}")]
pub struct InvalidDealStatus(pub String);

#[derive(Debug, thiserror::Error)]
#[error("unknown deal stage: {0}")]
pub struct InvalidDealStage(pub String);

impl DealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::New => "new",
            DealStatus::InProgress => "in_progress",
            DealStatus::Won => "won",
            DealStatus::Lost => "lost",
        }
    }
}

impl FromStr for DealStatus {
    type Err = InvalidDealStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(DealStatus::New),
            "in_progress" => Ok(DealStatus::InProgress),
            "won" => Ok(DealStatus::Won),
            "lost" => Ok(DealStatus::Lost),
            other => Err(InvalidDealStatus(other.to_string())),
        }
    }
}

impl DealStage {
    pub const PIPELINE: [DealStage; 4] = [
        DealStage::Qualification,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::Closed,
    ];

    pub fn index(self) -> usize {
        match self {
            DealStage::Qualification => 0,
            DealStage::Proposal => 1,
            DealStage::Negotiation => 2,
            DealStage::Closed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealStage::Qualification => "qualification",
            DealStage::Proposal => "proposal",
            DealStage::Negotiation => "negotiation",
            DealStage::Closed => "closed",
        }
    }
}

impl FromStr for DealStage {
    type Err = InvalidDealStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qualification" => Ok(DealStage::Qualification),
            "proposal" => Ok(DealStage::Proposal),
            "negotiation" => Ok(DealStage::Negotiation),
            "closed" => Ok(DealStage::Closed),
            other => Err(InvalidDealStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub organization_id: i64,
    pub contact_id: i64,
    pub owner_id: i64,
    pub title: String,
    /// Fixed-point amount with scale 2, stored as integer cents.
    pub amount_cents: i64,
    pub currency: String,
    pub status: DealStatus,
    pub stage: DealStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_indices_follow_declaration_order() {
        for (i, stage) in DealStage::PIPELINE.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn status_and_stage_reject_unknown_strings() {
        assert!("WON".parse::<DealStatus>().is_err());
        assert!("pending".parse::<DealStage>().is_err());
        assert_eq!("won".parse::<DealStatus>().unwrap(), DealStatus::Won);
        assert_eq!(
            "negotiation".parse::<DealStage>().unwrap(),
            DealStage::Negotiation
        );
    }
}
