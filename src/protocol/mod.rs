//! Wire protocol: line framing and the command codec
//!
//! Every protocol unit is one `\n`-terminated ASCII line:
//!
//! ```text
//! Client                                  Server
//!   |<------------- HELLO 1 ---------------|   greeting on accept
//!   |-------------- NICK bob ------------->|
//!   |<---------------- OK -----------------|   (or ERROR <reason>, close)
//!   |                                      |
//!   |-------------- MSG hi --------------->|
//!   |                                      |--» MSG bob hi     (to others)
//!   |<------------- JOIN eve --------------|   a peer arrived
//!   |<------------ EXIT alice -------------|   a peer left
//!   |--------------- EXIT ---------------->|   leaving
//! ```
//!
//! [`framer`] rebuilds lines from the unframed byte stream; [`command`]
//! maps lines to typed values and back.

pub mod command;
pub mod constants;
pub mod framer;

pub use command::{is_valid_nickname, Command, Frame};
pub use framer::{LineFramer, LineReader};
