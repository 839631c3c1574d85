//! # Game Rules
//!
//! The rule book crate - identifiers, character snapshots, mechanics, the game
//! clock, world snapshots and the dice/skill resolver. It holds no engine logic:
//! everything here is plain data plus the arithmetic of the rules.

pub mod dice;
pub mod entities;
pub mod ids;
pub mod mechanics;
pub mod snapshot;

pub use dice::*;
pub use entities::*;
pub use ids::*;
pub use mechanics::*;
pub use snapshot::*;
