// SPDX-License-Identifier: MIT

//! In-memory store with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (supplementary per-user records)
//! - Clubs (membership, budgets)
//! - Events (registrations)
//!
//! Backed by concurrent maps; per-entity mutations go through `alter` so
//! concurrent writers to the same key cannot interleave.

use crate::error::AppError;
use crate::models::{BudgetItem, BudgetStatus, Club, ClubBudget, Event, Profile};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Input for adding or editing a club budget item.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BudgetItemInput {
    /// Present when editing an existing item; absent to add a new one.
    pub id: Option<u64>,
    pub name: String,
    pub cost: u64,
}

/// Application data store.
#[derive(Clone, Default)]
pub struct Database {
    profiles: std::sync::Arc<DashMap<Uuid, Profile>>,
    clubs: std::sync::Arc<DashMap<u64, Club>>,
    events: std::sync::Arc<DashMap<u64, Event>>,
    next_event_id: std::sync::Arc<AtomicU64>,
}

impl Database {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the demo clubs and events.
    pub fn with_seed_data() -> Self {
        let db = Self::new();
        for club in seed_clubs() {
            db.clubs.insert(club.id, club);
        }
        let mut max_id = 0;
        for event in seed_events() {
            max_id = max_id.max(event.id);
            db.events.insert(event.id, event);
        }
        db.next_event_id.store(max_id + 1, Ordering::Relaxed);
        db
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Point lookup of a profile by identity id.
    pub fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.profiles.get(&id).map(|p| p.clone())
    }

    /// Create or update a profile record.
    pub fn upsert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    // ─── Club Operations ─────────────────────────────────────────

    /// All clubs, ordered by id.
    pub fn list_clubs(&self) -> Vec<Club> {
        let mut clubs: Vec<Club> = self.clubs.iter().map(|c| c.clone()).collect();
        clubs.sort_by_key(|c| c.id);
        clubs
    }

    pub fn get_club(&self, id: u64) -> Option<Club> {
        self.clubs.get(&id).map(|c| c.clone())
    }

    /// Clubs where the user is a member.
    pub fn clubs_by_member(&self, user_id: Uuid) -> Vec<Club> {
        let mut clubs: Vec<Club> = self
            .clubs
            .iter()
            .filter(|c| c.member_ids.contains(&user_id))
            .map(|c| c.clone())
            .collect();
        clubs.sort_by_key(|c| c.id);
        clubs
    }

    /// Clubs managed by the organizer.
    pub fn clubs_by_organizer(&self, organizer_id: Uuid) -> Vec<Club> {
        let mut clubs: Vec<Club> = self
            .clubs
            .iter()
            .filter(|c| c.organizer_ids.contains(&organizer_id))
            .map(|c| c.clone())
            .collect();
        clubs.sort_by_key(|c| c.id);
        clubs
    }

    /// Add a member to a club. A user id appears in the member list at most
    /// once; joining twice is an error.
    pub fn join_club(&self, club_id: u64, user_id: Uuid) -> Result<Club, AppError> {
        let mut entry = self
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        if entry.member_ids.contains(&user_id) {
            return Err(AppError::Validation(
                "Already a member of this club".to_string(),
            ));
        }

        entry.member_ids.push(user_id);
        Ok(entry.clone())
    }

    /// Remove a member from a club.
    pub fn leave_club(&self, club_id: u64, user_id: Uuid) -> Result<Club, AppError> {
        let mut entry = self
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        let before = entry.member_ids.len();
        entry.member_ids.retain(|id| *id != user_id);
        if entry.member_ids.len() == before {
            return Err(AppError::Validation(
                "Not a member of this club".to_string(),
            ));
        }

        Ok(entry.clone())
    }

    /// Grant a user organizer rights over a club. Idempotent.
    pub fn add_organizer(&self, club_id: u64, user_id: Uuid) -> Result<Club, AppError> {
        let mut entry = self
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        if !entry.organizer_ids.contains(&user_id) {
            entry.organizer_ids.push(user_id);
        }
        Ok(entry.clone())
    }

    /// Add a budget item (starts `pending`) or edit an existing one.
    pub fn update_club_budget(
        &self,
        club_id: u64,
        input: BudgetItemInput,
    ) -> Result<ClubBudget, AppError> {
        let mut entry = self
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        match input.id {
            Some(item_id) => {
                let item = entry
                    .budget
                    .items
                    .iter_mut()
                    .find(|i| i.id == item_id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Budget item {} not found", item_id))
                    })?;
                item.name = input.name;
                item.cost = input.cost;
            }
            None => {
                let new_id = entry.budget.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
                entry.budget.items.push(BudgetItem {
                    id: new_id,
                    name: input.name,
                    cost: input.cost,
                    status: BudgetStatus::Pending,
                });
            }
        }

        Ok(entry.budget.clone())
    }

    /// Approve a pending budget item and count its cost as spent.
    pub fn approve_budget_item(&self, club_id: u64, item_id: u64) -> Result<ClubBudget, AppError> {
        let mut entry = self
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        let budget = &mut entry.budget;
        let item = budget
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Budget item {} not found", item_id)))?;

        if item.status == BudgetStatus::Approved {
            return Err(AppError::Validation(
                "Budget item is already approved".to_string(),
            ));
        }

        item.status = BudgetStatus::Approved;
        let cost = item.cost;
        budget.spent += cost;

        Ok(budget.clone())
    }

    // ─── Event Operations ────────────────────────────────────────

    /// All events, ordered by id.
    pub fn list_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.iter().map(|e| e.clone()).collect();
        events.sort_by_key(|e| e.id);
        events
    }

    pub fn get_event(&self, id: u64) -> Option<Event> {
        self.events.get(&id).map(|e| e.clone())
    }

    pub fn events_by_club(&self, club_id: u64) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.club_id == club_id)
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Events the student is registered for.
    pub fn events_by_student(&self, user_id: Uuid) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.registered_user_ids.contains(&user_id))
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    pub fn events_by_organizer(&self, organizer_id: Uuid) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.organizer_ids.contains(&organizer_id))
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Register a student for an event. Registration ids are unique; a user
    /// can register only if not already registered.
    pub fn register_for_event(&self, event_id: u64, user_id: Uuid) -> Result<Event, AppError> {
        let mut entry = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        if entry.registered_user_ids.contains(&user_id) {
            return Err(AppError::Validation(
                "Already registered for this event".to_string(),
            ));
        }

        entry.registered_user_ids.push(user_id);
        Ok(entry.clone())
    }

    pub fn unregister_from_event(&self, event_id: u64, user_id: Uuid) -> Result<Event, AppError> {
        let mut entry = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        let before = entry.registered_user_ids.len();
        entry.registered_user_ids.retain(|id| *id != user_id);
        if entry.registered_user_ids.len() == before {
            return Err(AppError::Validation(
                "Not registered for this event".to_string(),
            ));
        }

        Ok(entry.clone())
    }

    /// Create an event with the caller as organizer.
    pub fn create_event(
        &self,
        title: String,
        description: String,
        date: String,
        time: String,
        location: String,
        club_id: u64,
        organizer_id: Uuid,
    ) -> Result<Event, AppError> {
        let club = self
            .get_club(club_id)
            .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;

        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            title,
            description,
            date,
            time,
            location,
            club_id,
            club_name: club.name,
            registered_user_ids: Vec::new(),
            organizer_ids: vec![organizer_id],
        };
        self.events.insert(id, event.clone());
        Ok(event)
    }

    /// Update mutable event fields.
    pub fn update_event(
        &self,
        event_id: u64,
        title: Option<String>,
        description: Option<String>,
        date: Option<String>,
        time: Option<String>,
        location: Option<String>,
    ) -> Result<Event, AppError> {
        let mut entry = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        if let Some(title) = title {
            entry.title = title;
        }
        if let Some(description) = description {
            entry.description = description;
        }
        if let Some(date) = date {
            entry.date = date;
        }
        if let Some(time) = time {
            entry.time = time;
        }
        if let Some(location) = location {
            entry.location = location;
        }

        Ok(entry.clone())
    }
}

// ─── Seed Data ──────────────────────────────────────────────────

fn seed_clubs() -> Vec<Club> {
    let budget = |allocated, spent, items: Vec<(u64, &str, u64, BudgetStatus)>| ClubBudget {
        allocated,
        spent,
        items: items
            .into_iter()
            .map(|(id, name, cost, status)| BudgetItem {
                id,
                name: name.to_string(),
                cost,
                status,
            })
            .collect(),
    };

    let club = |id, name: &str, description: &str, category: &str, budget| Club {
        id,
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        member_ids: Vec::new(),
        organizer_ids: Vec::new(),
        budget,
    };

    use BudgetStatus::{Approved, Pending};

    vec![
        club(
            1,
            "Photography Club",
            "Capturing moments and memories around the campus.",
            "Cultural",
            budget(
                15000,
                7500,
                vec![
                    (1, "Camera Equipment", 5000, Approved),
                    (2, "Exhibition Supplies", 2500, Approved),
                    (3, "Workshop Materials", 3500, Pending),
                ],
            ),
        ),
        club(
            2,
            "Coding Club",
            "Enhance your programming skills and participate in hackathons.",
            "Technical",
            budget(
                20000,
                12000,
                vec![
                    (1, "Workshop Refreshments", 5000, Approved),
                    (2, "Hackathon Prizes", 7000, Approved),
                    (3, "Server Hosting", 8000, Pending),
                ],
            ),
        ),
        club(
            3,
            "Dance Club",
            "Express yourself through various dance forms.",
            "Cultural",
            budget(
                12000,
                6000,
                vec![
                    (1, "Costumes", 4000, Approved),
                    (2, "Props", 2000, Approved),
                    (3, "Audio Equipment", 6000, Pending),
                ],
            ),
        ),
        club(
            4,
            "Sports Club",
            "Stay fit and participate in sports activities and tournaments.",
            "Sports",
            budget(
                25000,
                18000,
                vec![
                    (1, "Equipment", 10000, Approved),
                    (2, "Tournament Organization", 8000, Approved),
                    (3, "Training Kits", 7000, Pending),
                ],
            ),
        ),
    ]
}

fn seed_events() -> Vec<Event> {
    let event = |id, title: &str, description: &str, date: &str, time: &str, location: &str, club_id, club_name: &str| {
        Event {
            id,
            title: title.to_string(),
            description: description.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            location: location.to_string(),
            club_id,
            club_name: club_name.to_string(),
            registered_user_ids: Vec::new(),
            organizer_ids: Vec::new(),
        }
    };

    vec![
        event(
            1,
            "Photography Exhibition",
            "Annual exhibition showcasing the best member photographs.",
            "2026-11-15",
            "3:00 PM - 7:00 PM",
            "Student Activity Center",
            1,
            "Photography Club",
        ),
        event(
            2,
            "Hackathon",
            "A 24-hour coding competition building solutions to real problems.",
            "2026-10-22",
            "9:00 AM - 9:00 AM (Next day)",
            "Computer Center",
            2,
            "Coding Club",
        ),
        event(
            3,
            "Dance Competition",
            "Annual dance competition from classical to contemporary.",
            "2026-11-25",
            "5:00 PM - 8:00 PM",
            "Auditorium",
            3,
            "Dance Club",
        ),
        event(
            4,
            "Inter-College Sports Tournament",
            "Annual tournament featuring cricket, football, badminton and more.",
            "2026-12-10",
            "9:00 AM - 6:00 PM",
            "Sports Complex",
            4,
            "Sports Club",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_club_is_unique() {
        let db = Database::with_seed_data();
        let user = Uuid::new_v4();

        let club = db.join_club(1, user).unwrap();
        assert!(club.member_ids.contains(&user));

        let err = db.join_club(1, user).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Still exactly one entry
        let club = db.get_club(1).unwrap();
        assert_eq!(club.member_ids.iter().filter(|id| **id == user).count(), 1);
    }

    #[test]
    fn test_register_requires_not_registered() {
        let db = Database::with_seed_data();
        let user = Uuid::new_v4();

        db.register_for_event(2, user).unwrap();
        let err = db.register_for_event(2, user).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        db.unregister_from_event(2, user).unwrap();
        let err = db.unregister_from_event(2, user).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_approve_budget_item_moves_cost_to_spent() {
        let db = Database::with_seed_data();

        let before = db.get_club(1).unwrap().budget;
        let after = db.approve_budget_item(1, 3).unwrap();
        assert_eq!(after.spent, before.spent + 3500);

        // Double-approval is rejected and does not double-count
        let err = db.approve_budget_item(1, 3).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(db.get_club(1).unwrap().budget.spent, after.spent);
    }

    #[test]
    fn test_budget_item_add_starts_pending() {
        let db = Database::with_seed_data();
        let budget = db
            .update_club_budget(
                2,
                BudgetItemInput {
                    id: None,
                    name: "Conference Travel".to_string(),
                    cost: 4000,
                },
            )
            .unwrap();

        let item = budget.items.last().unwrap();
        assert_eq!(item.status, BudgetStatus::Pending);
        assert_eq!(item.id, 4);
    }
}
