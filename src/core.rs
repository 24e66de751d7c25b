//! # Core Utilities
//!
//! Small shared helpers with no protocol knowledge: random identifier
//! generation, HTML entity encoding, and URL encoding.

pub mod generate;
pub mod html;
pub mod urlencode;
