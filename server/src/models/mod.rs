pub mod attendee;
pub mod event;

pub use attendee::{Attendee, NewAttendee};
pub use event::{Event, EventSummary, EventView, NewEvent};
