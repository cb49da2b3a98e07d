// SPDX-License-Identifier: MIT

//! Event model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A club event students can register for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Event date (ISO 8601 date)
    pub date: String,
    /// Human-readable time range, e.g. "3:00 PM - 7:00 PM"
    pub time: String,
    pub location: String,
    pub club_id: u64,
    pub club_name: String,
    /// Registered students; no duplicate ids.
    pub registered_user_ids: Vec<Uuid>,
    pub organizer_ids: Vec<Uuid>,
}
