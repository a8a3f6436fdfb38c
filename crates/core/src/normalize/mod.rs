//! Normalization helpers shared by source adapters and the result builder.
//!
//! Everything here is pure: sizes, info hashes, magnet links, dates and HTML
//! entities are turned into canonical values without touching the network.

mod date;
mod hash;
mod html;
mod size;

pub use date::{parse_compact_date, parse_iso_date, parse_relative_age, parse_torrent_date};
pub use hash::{build_magnet_uri, info_hash_from_magnet, normalize_info_hash, DEFAULT_TRACKERS};
pub use html::decode_html_entities;
pub use size::{parse_size, unit_multiplier, UNKNOWN_SIZE};
