//! Binary layout of an MBXM payload.
//!
//! ```text
//! ┌─────────────────┐
//! │  Header         │ ← header::parse() / header::write()
//! ├─────────────────┤
//! │  String Pool    │ ← StringPool::parse() / StringPool::write()
//! ├─────────────────┤
//! │  Node Table     │ ← nodes::parse() / nodes::write()
//! └─────────────────┘
//! ```

pub mod header;
pub mod nodes;
pub mod strings;
