use crate::core::retcode::{ProtocolResult, ResultCode};

/// Length of the ASCII packet header: 4 hex digits size, 4 hex digits number, 1 flag digit
pub const HEADER_LEN: usize = 9;

/// Largest body a single packet can carry
pub const MAX_BODY_LEN: usize = 0xFFFF;

/// Packet numbers wrap back to zero past this value
pub const MAX_PACKET_NUMBER: u16 = 0x3FFF;

/// Header preceding every packet body on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub size: u16,
    pub number: u16,
    /// Set when further packets of the same response follow
    pub more: bool,
}

impl PacketHeader {
    pub fn for_body(body: &[u8], number: u16, more: bool) -> ProtocolResult<Self> {
        let size = u16::try_from(body.len()).map_err(|_| ResultCode::ErrParams)?;
        Ok(Self { size, number, more })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let more = u8::from(self.more);
        let text = format!("{:04x}{:04x}{}", self.size, self.number, more);
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(text.as_bytes());
        out
    }

    pub fn decode(raw: &[u8; HEADER_LEN]) -> ProtocolResult<Self> {
        let (digits, flag) = raw.split_at(8);
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return Err(ResultCode::ErrData);
        }
        let more = match flag {
            [b'0'] => false,
            [b'1'] => true,
            _ => return Err(ResultCode::ErrData),
        };
        Ok(Self {
            size: parse_hex(&digits[0..4])?,
            number: parse_hex(&digits[4..8])?,
            more,
        })
    }
}

fn parse_hex(digits: &[u8]) -> ProtocolResult<u16> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|text| u16::from_str_radix(text, 16).ok())
        .ok_or(ResultCode::ErrData)
}

/// Next packet number after `current`, wrapping at `MAX_PACKET_NUMBER`
pub const fn next_packet_number(current: u16) -> u16 {
    if current >= MAX_PACKET_NUMBER {
        0
    } else {
        current + 1
    }
}
