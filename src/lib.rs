//! Resolve streaming-service links into locally stored, tagged audio files.
//!
//! The pipeline classifies a raw URL, resolves canonical track metadata from
//! Spotify, finds the best-matching audio on YouTube, hands the chosen asset
//! to an external fetcher, and embeds the metadata into the resulting file.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod locator;
pub mod matcher;
pub mod pipeline;
pub mod protocol;
pub mod spotify;
pub mod tag;
pub mod tracker;
pub mod youtube;
