// Record module - the canonical ledger data model
// Identifiers, quark facets, particle variants, and atoms

mod amount;
mod atom;
mod euid;
mod particle;
mod quark;

pub use amount::*;
pub use atom::*;
pub use euid::*;
pub use particle::*;
pub use quark::*;
