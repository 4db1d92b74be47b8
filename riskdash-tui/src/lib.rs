//! Terminal front end: the transaction form, result presentation and the
//! actor that ties them to the verification workflow.
pub mod feeders;
pub mod form;
pub mod present;
mod styles;
mod tui;
pub mod view;

pub use feeders::spawn_tui_feeders;
pub use tui::{TuiActor, TuiMsg, restore_terminal};
