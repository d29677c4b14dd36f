//! PRAVAH core — per-pincode risk-zone scoring and privacy suppression.
//!
//! RULES:
//!   - Only store.rs talks to the database.
//!   - All randomness flows through a JitterRng seeded from the run seed.
//!   - Suppression is decided by privacy::PrivacyPolicy alone: once at
//!     computation time, and again on every read path.

pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod privacy;
pub mod read;
pub mod rng;
pub mod score;
pub mod store;
pub mod types;
