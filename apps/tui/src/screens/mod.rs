//! TUI screen definitions.
//!
//! The app has a single screen: the question form with its answer panel.

mod ask;

pub(crate) use ask::AskScreen;
