/// Month-by-month task board logic
///
/// Everything in here is pure: no database access, no clock reads. Callers
/// pass in the current date so behaviour is deterministic under test.
///
/// # Modules
///
/// - [`month`]: Calendar months as the board's columns
/// - [`status`]: Date-driven task status derivation
/// - [`transfer`]: JSON import validation and export records

pub mod month;
pub mod status;
pub mod transfer;

pub use month::Month;
pub use status::{derive_status, StatusDerivation, TaskStatus};
