//! ESC/POS byte encoding for receipt printers.

use super::ticket::{Justification, PrintMode, Segment, Ticket};

const ESC: u8 = 0x1b;

const MODE_DOUBLE_HEIGHT: u8 = 0x10;
const MODE_DOUBLE_WIDTH: u8 = 0x20;

/// Encode a ticket, starting with a printer reset so leftover modes from a
/// previous job never leak into this one.
pub fn encode(ticket: &Ticket) -> Vec<u8> {
    let mut out = vec![ESC, b'@'];
    for segment in &ticket.segments {
        match segment {
            Segment::Justify(j) => {
                let n = match j {
                    Justification::Left => 0,
                    Justification::Center => 1,
                };
                out.extend_from_slice(&[ESC, b'a', n]);
            }
            Segment::Mode(mode) => {
                let n = match mode {
                    PrintMode::Normal => 0,
                    PrintMode::Emphasized => MODE_DOUBLE_HEIGHT | MODE_DOUBLE_WIDTH,
                };
                out.extend_from_slice(&[ESC, b'!', n]);
            }
            Segment::Text(text) => out.extend_from_slice(text.as_bytes()),
            Segment::Feed(lines) => out.extend_from_slice(&[ESC, b'd', *lines]),
        }
    }
    out
}
