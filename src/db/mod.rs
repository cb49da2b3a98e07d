// SPDX-License-Identifier: MIT

//! Data access layer (in-memory store).

pub mod memory;

pub use memory::{BudgetItemInput, Database};
