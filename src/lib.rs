// Campaign entity model and identifiers
pub mod entity;

// Identifier assignment (ephemeral / persistent)
pub mod identity;

// In-memory entity registry with secondary indexes
pub mod registry;

// Activity log: events, storage, view model
pub mod activity;

// Configuration
pub mod config;
