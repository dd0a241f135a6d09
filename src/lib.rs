//! # Identigo (identity management core)
//!
//! `identigo` registers user accounts and seeds a baseline identity state at
//! process startup.
//!
//! ## Registration
//!
//! `POST /register` validates the payload, normalizes the email (trimmed,
//! lowercased), hashes the password with Argon2id, and creates the account.
//! Email uniqueness is enforced by the store's constraint layer, so
//! concurrent registrations for the same address yield exactly one account;
//! the loser of the race receives the same conflict answer as a plain
//! duplicate.
//!
//! ## Seeding
//!
//! Before the listener binds, the configured role set and (optionally) an
//! administrator account with role memberships are provisioned. Seeding is
//! idempotent and tolerates concurrent runs from multiple replicas; a seed
//! failure aborts startup rather than serving traffic in an unseeded state.

pub mod cli;
pub mod identigo;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
