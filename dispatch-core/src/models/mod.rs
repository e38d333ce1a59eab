//! Typed records for the entities in spec §3: inputs (`Dispatch`,
//! `Technician`, `CalendarEntry`, `HistoricalDispatch`) and the engine's
//! sole output (`Assignment`/`DispatchOutcome`).

mod assignment;
mod calendar;
mod dispatch;
mod history;
mod technician;

pub use assignment::{Assignment, DispatchOutcome, FallbackLevel, UnassignedReason};
pub use calendar::CalendarEntry;
pub use dispatch::{Dispatch, Priority};
pub use history::HistoricalDispatch;
pub use technician::Technician;
