// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod club;
pub mod event;
pub mod user;

pub use club::{BudgetItem, BudgetStatus, Club, ClubBudget};
pub use event::Event;
pub use user::{AccountMetadata, Profile, Role, UserIdentity};
