pub mod calendar;
pub mod interaction;
pub mod lead;
pub mod pipeline;
