//! Git smart-HTTP pkt-line framing and sideband-64k demultiplexing.
//!
//! `gix` drives the actual clone/fetch/push network conversations inside
//! [`crate::repo::GitRepoCore`]; this module is the shared low-level wire
//! format both that client path and the in-process mock server
//! (`svfs-testkit`) speak, so tests can assert on raw bytes without
//! depending on `gix`'s internal transport types.

use bytes::{Bytes, BytesMut};

/// The pkt-line flush packet: four ASCII `"0000"` bytes, meaning "end of
/// section" in the smart-HTTP protocol.
pub const FLUSH_PKT: &[u8] = b"0000";

/// Encode `payload` as one pkt-line: a 4-hex-digit length prefix (including
/// itself) followed by the payload.
#[must_use]
pub fn encode_pkt_line(payload: &[u8]) -> Bytes {
    let len = payload.len() + 4;
    let mut out = BytesMut::with_capacity(len);
    out.extend_from_slice(format!("{len:04x}").as_bytes());
    out.extend_from_slice(payload);
    out.freeze()
}

/// Encode a line of text as a pkt-line, appending `\n` (the convention Git
/// uses for ref-advertisement and capability lines).
#[must_use]
pub fn encode_pkt_line_text(line: &str) -> Bytes {
    encode_pkt_line(format!("{line}\n").as_bytes())
}

/// One parsed pkt-line: either `Flush` (the `"0000"` marker) or `Data` with
/// the payload past the length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    Flush,
    Data(Bytes),
}

/// Parse every pkt-line out of a complete buffer (suitable for the small,
/// fully-buffered responses this core deals with — no true streaming).
///
/// # Errors
/// If a length prefix is not 4 valid hex digits, or claims more bytes than
/// remain in `buf`.
pub fn parse_pkt_lines(mut buf: &[u8]) -> Result<Vec<PktLine>, String> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        if buf.len() < 4 {
            return Err("truncated pkt-line length prefix".to_owned());
        }
        let len_hex = std::str::from_utf8(&buf[..4]).map_err(|e| e.to_string())?;
        let len = usize::from_str_radix(len_hex, 16).map_err(|e| e.to_string())?;
        if len == 0 {
            out.push(PktLine::Flush);
            buf = &buf[4..];
            continue;
        }
        if len < 4 || len - 4 > buf.len() - 4 {
            return Err("pkt-line length out of range".to_owned());
        }
        out.push(PktLine::Data(Bytes::copy_from_slice(&buf[4..len])));
        buf = &buf[len..];
    }
    Ok(out)
}

/// Sideband-64k channel discriminator: byte 1 is pack data, byte 2 is
/// progress text, byte 3 is a fatal error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebandChannel {
    PackData,
    Progress,
    Error,
}

/// Wrap `payload` on `channel` as one sideband-64k pkt-line (max 65519 bytes
/// of payload per packet — this core never needs to chunk beyond a single
/// call since it deals with small, fully-buffered packs).
#[must_use]
pub fn encode_sideband(channel: SidebandChannel, payload: &[u8]) -> Bytes {
    let marker: u8 = match channel {
        SidebandChannel::PackData => 1,
        SidebandChannel::Progress => 2,
        SidebandChannel::Error => 3,
    };
    let mut framed = Vec::with_capacity(payload.len() + 1);
    framed.push(marker);
    framed.extend_from_slice(payload);
    encode_pkt_line(&framed)
}

/// Demultiplex a sideband-64k payload (the bytes of one already-parsed
/// pkt-line's [`PktLine::Data`]) into its channel and inner payload.
///
/// # Errors
/// If `payload` is empty (no channel marker byte).
pub fn decode_sideband(payload: &Bytes) -> Result<(SidebandChannel, Bytes), String> {
    let Some((&marker, rest)) = payload.split_first() else {
        return Err("empty sideband packet".to_owned());
    };
    let channel = match marker {
        1 => SidebandChannel::PackData,
        2 => SidebandChannel::Progress,
        3 => SidebandChannel::Error,
        other => return Err(format!("unknown sideband channel {other}")),
    };
    Ok((channel, Bytes::copy_from_slice(rest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkt_line_round_trip() {
        let encoded = encode_pkt_line_text("want deadbeef");
        let parsed = parse_pkt_lines(&encoded).unwrap();
        assert_eq!(parsed.len(), 1);
        match &parsed[0] {
            PktLine::Data(d) => assert_eq!(&d[..], b"want deadbeef\n"),
            PktLine::Flush => panic!("expected data"),
        }
    }

    #[test]
    fn flush_pkt_parses_as_flush() {
        let parsed = parse_pkt_lines(FLUSH_PKT).unwrap();
        assert_eq!(parsed, vec![PktLine::Flush]);
    }

    #[test]
    fn sideband_round_trip() {
        let encoded = encode_sideband(SidebandChannel::PackData, b"PACK...");
        let parsed = parse_pkt_lines(&encoded).unwrap();
        let PktLine::Data(payload) = &parsed[0] else { panic!("expected data") };
        let (channel, inner) = decode_sideband(payload).unwrap();
        assert_eq!(channel, SidebandChannel::PackData);
        assert_eq!(&inner[..], b"PACK...");
    }

    #[test]
    fn multiple_lines_and_flush() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_pkt_line_text("first"));
        buf.extend_from_slice(&encode_pkt_line_text("second"));
        buf.extend_from_slice(FLUSH_PKT);
        let parsed = parse_pkt_lines(&buf).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2], PktLine::Flush);
    }
}
