//! Genius harvest - search the Genius API for many terms and export the hits
//!
//! This library queries the Genius search endpoint once per term, flattens the
//! nested `stats` and `primary_artist` records of every hit into prefixed
//! columns, and gathers the rows of all terms into a single CSV table.

/// Client modules for interacting with the Genius API
pub mod clients;
/// Batch runner fanning searches out over many terms
pub mod harvester;
/// Hit flattening and CSV tables
pub mod table;
