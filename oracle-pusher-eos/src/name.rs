use anyhow::{anyhow, Result};
use std::{fmt, str::FromStr};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// An EOSIO account/action/permission name packed into 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(u64);

impl Name {
    pub fn value(self) -> u64 {
        self.0
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > 13 {
            anyhow::bail!("Name is longer than 13 characters: {:?}", s);
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let symbol = char_to_symbol(c).ok_or_else(|| anyhow!("Invalid character {:?} in name {:?}", c as char, s))?;
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    anyhow::bail!("13th character of name {:?} must be one of .1-5a-j", s);
                }
                value |= symbol;
            }
        }

        let name = Name(value);
        // Trailing dots encode to the same value as the shorter name.
        if name.to_string() != s {
            anyhow::bail!("Name {:?} is not in normalized form", s);
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is ASCII.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}
