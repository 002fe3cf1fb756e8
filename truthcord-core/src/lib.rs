#![doc = "truthcord-core: post-to-message transformation pipeline for truthcord."]

//! This crate holds everything that decides what a relayed message looks like:
//! the post data model, HTML normalisation, attachment handling, message
//! composition and length governance, plus the orchestration of one polling cycle.
//! Transport (HTTP clients, webhook delivery) lives in the `truthcord` crate and
//! plugs in through the traits in [`contract`].
//!
//! # Usage
//! Build a [`relay::Relay`] from concrete collaborators, or call
//! [`compose::build_message`] directly for a single post.

pub mod attachments;
pub mod compose;
pub mod contract;
pub mod governor;
pub mod markup;
pub mod normalize;
pub mod post;
pub mod relay;
