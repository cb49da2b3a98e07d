// SPDX-License-Identifier: MIT

//! Club and budget models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A campus club.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Members; a user id appears at most once.
    pub member_ids: Vec<Uuid>,
    /// Organizers managing the club.
    pub organizer_ids: Vec<Uuid>,
    pub budget: ClubBudget,
}

/// Club budget with line items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubBudget {
    pub allocated: u64,
    /// Sum of approved item costs.
    pub spent: u64,
    pub items: Vec<BudgetItem>,
}

/// A single budget line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: u64,
    pub name: String,
    pub cost: u64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Pending,
    Approved,
}
