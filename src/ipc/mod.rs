//! Operation transports.
//!
//! Scripts and other processes drive the layout by writing
//! newline-delimited JSON [`LayoutOperation`](crate::operation::LayoutOperation)s,
//! one per line, to a stream the engine reads on a background thread.

pub mod reader;
