//! XML Reader Module
//!
//! Pull parsing over a decoded input slice:
//! - SliceReader: turns tokenizer output into events, borrowing the input
//! - Events: XML event types consumed by the document builder

pub mod events;
pub mod slice;
