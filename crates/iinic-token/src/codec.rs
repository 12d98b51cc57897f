use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TokenError};
use crate::token::{Token, TokenKind, ESCAPE, TAG_TABLE};

const UNESCAPE_TAG: u8 = match TokenKind::Unescape.tag() {
    Some(tag) => tag,
    None => unreachable!(),
};

/// Append the wire form of a token.
pub fn encode_token(token: &Token, dst: &mut BytesMut) {
    token.encode(dst);
}

/// Decode a token from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete token yet;
/// nothing is consumed in that case. On success, consumes the token bytes
/// from the buffer.
pub fn decode_token(src: &mut BytesMut) -> Result<Option<Token>> {
    let Some(token) = peek_token(src)? else {
        return Ok(None); // Need more data
    };
    src.advance(token.wire_len());
    Ok(Some(token))
}

/// Decode the token at the front of `src` without consuming it.
pub fn peek_token(src: &[u8]) -> Result<Option<Token>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != ESCAPE {
        return Ok(Some(Token::PlainByte(first)));
    }

    let Some(&tag) = src.get(1) else {
        return Ok(None);
    };
    let entry = TAG_TABLE[tag as usize].ok_or(TokenError::UnknownTag(tag))?;

    let len = entry.kind.wire_len();
    if src.len() < len {
        return Ok(None);
    }
    Ok(Some((entry.decode)(&src[2..len])))
}

/// Byte-stuff radio data so it can share the stream with tokens.
///
/// Every literal [`ESCAPE`] becomes `ESCAPE, 0xA5`; all other bytes pass
/// through unchanged.
pub fn escape_payload(payload: &[u8], dst: &mut BytesMut) {
    let escapes = payload.iter().filter(|&&b| b == ESCAPE).count();
    dst.reserve(payload.len() + escapes);
    for &byte in payload {
        dst.put_u8(byte);
        if byte == ESCAPE {
            dst.put_u8(UNESCAPE_TAG);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<Token> {
        vec![
            Token::Unescape,
            Token::ResetRequest,
            Token::ResetAck {
                version_high: 1,
                version_low: 2,
                uniq_id: 0xBEEF,
            },
            Token::SetRxKnobs {
                frequency: 0x0680,
                deviation: 3,
                rx_knobs: 0xDA,
            },
            Token::SetPower { power: 7 },
            Token::SetBitrate { bitrate: 0x80 | 71 },
            Token::Timing {
                timing_lo: 0x5A5A,
                timing_hi: 0xDEAD_BEEF,
            },
            Token::Ping { seq: 0x5A },
            Token::Tx,
            Token::Rx {
                timing_lo: 1,
                timing_hi: 2,
                rssi: 3,
            },
            Token::SetPos { x: -1200, y: 77 },
            Token::PlainByte(0x00),
            Token::PlainByte(0xA5),
        ]
    }

    #[test]
    fn decode_inverts_encode_for_every_kind() {
        for token in all_kinds() {
            let mut buf = BytesMut::new();
            encode_token(&token, &mut buf);
            assert_eq!(buf.len(), token.wire_len(), "{token:?}");

            let decoded = decode_token(&mut buf).unwrap().unwrap();
            assert_eq!(decoded, token);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn decode_reset_ack_scenario() {
        let mut buf = BytesMut::from(&[0x5A, 0x5A, 0x01, 0x02, 0x00, 0x00][..]);
        let token = decode_token(&mut buf).unwrap().unwrap();
        assert_eq!(
            token,
            Token::ResetAck {
                version_high: 1,
                version_low: 2,
                uniq_id: 0,
            }
        );
    }

    #[test]
    fn incomplete_token_consumes_nothing() {
        let mut empty = BytesMut::new();
        assert_eq!(decode_token(&mut empty).unwrap(), None);

        let mut lone_escape = BytesMut::from(&[ESCAPE][..]);
        assert_eq!(decode_token(&mut lone_escape).unwrap(), None);
        assert_eq!(lone_escape.len(), 1);

        let mut partial_rx = BytesMut::from(&[ESCAPE, 0x08, 0x01, 0x00, 0x00][..]);
        assert_eq!(decode_token(&mut partial_rx).unwrap(), None);
        assert_eq!(partial_rx.len(), 5);
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut buf = BytesMut::from(&[ESCAPE, 0x42, 0x00][..]);
        assert_eq!(decode_token(&mut buf), Err(TokenError::UnknownTag(0x42)));
    }

    #[test]
    fn plain_bytes_decode_one_at_a_time() {
        let mut buf = BytesMut::from(&b"AB"[..]);
        assert_eq!(decode_token(&mut buf).unwrap(), Some(Token::PlainByte(b'A')));
        assert_eq!(decode_token(&mut buf).unwrap(), Some(Token::PlainByte(b'B')));
        assert_eq!(decode_token(&mut buf).unwrap(), None);
    }

    #[test]
    fn peek_does_not_consume() {
        let buf = [ESCAPE, 0x06, 0x09];
        assert_eq!(peek_token(&buf).unwrap(), Some(Token::Ping { seq: 9 }));
        assert_eq!(peek_token(&buf).unwrap(), Some(Token::Ping { seq: 9 }));
    }

    #[test]
    fn stuffing_roundtrips_with_interleaved_tokens() {
        let payload: &[u8] = &[0x5A, 0x01, 0x5A, 0x5A, 0xA5, 0x06, 0x5A];

        let mut wire = BytesMut::new();
        escape_payload(&payload[..3], &mut wire);
        Token::Ping { seq: 4 }.encode(&mut wire);
        escape_payload(&payload[3..], &mut wire);
        Token::Rx {
            timing_lo: 0,
            timing_hi: 0,
            rssi: 0,
        }
        .encode(&mut wire);

        let mut data = Vec::new();
        let mut control = Vec::new();
        while let Some(token) = decode_token(&mut wire).unwrap() {
            match token {
                Token::Unescape => data.push(ESCAPE),
                Token::PlainByte(b) => data.push(b),
                other => control.push(other),
            }
        }

        assert_eq!(data, payload);
        assert_eq!(control.len(), 2);
        assert_eq!(control[0], Token::Ping { seq: 4 });
    }

    #[test]
    fn escape_payload_without_escapes_is_identity() {
        let mut wire = BytesMut::new();
        escape_payload(b"hello", &mut wire);
        assert_eq!(wire.as_ref(), b"hello");
    }
}
