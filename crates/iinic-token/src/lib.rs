//! Escape-framed token codec for the iinic serial protocol.
//!
//! The serial stream is plain radio data except for the escape byte `0x5A`,
//! which starts a token:
//! - 1 escape byte
//! - 1 tag byte selecting the token kind
//! - a fixed-size little-endian payload determined by the tag
//!
//! A literal `0x5A` in the data travels as the [`Token::Unescape`] token.

pub mod codec;
pub mod error;
pub mod token;

pub use codec::{decode_token, encode_token, escape_payload};
pub use error::{Result, TokenError};
pub use token::{Token, TokenKind, ESCAPE};
