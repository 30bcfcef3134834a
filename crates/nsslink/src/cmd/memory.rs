use nsslink_icd::{memory, QFormat};
use serde::Serialize;

use crate::cmd::{open_session, parse_u32, LinkArgs, PeekArgs, PokeArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
struct MemoryWord {
    addr: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    value: u32,
    /// Engineering value for registers with a known encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    scaled: Option<f64>,
}

impl MemoryWord {
    fn new(addr: u8, value: u32) -> Self {
        let scaled = match addr {
            memory::OVERSPEED_FAULT_THRESHOLD => Some(QFormat::UQ24_8.decode(value)),
            _ => None,
        };
        Self {
            addr,
            name: memory::name(addr),
            value,
            scaled,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("addr", format!("0x{:02X}", self.addr)),
            ("name", self.name.unwrap_or("-").to_string()),
            ("value", format!("0x{:08X} ({})", self.value, self.value)),
        ];
        if let Some(scaled) = self.scaled {
            rows.push(("scaled", format!("{scaled:.3} RPM")));
        }
        rows
    }
}

/// Resolve a register name or numeric address.
fn resolve_addr(input: &str) -> CliResult<u8> {
    if let Some(addr) = memory::from_name(input) {
        return Ok(addr);
    }
    let value = parse_u32(input).map_err(CliError::usage)?;
    u8::try_from(value).map_err(|_| CliError::usage(format!("address {input} is above 0xFF")))
}

pub fn peek(args: PeekArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let addr = resolve_addr(&args.addr)?;
    let mut session = open_session(link)?;
    let value = session
        .peek(addr)
        .map_err(|err| session_error("peek failed", err))?;

    let word = MemoryWord::new(addr, value);
    emit(&word, &word.rows(), format);
    Ok(SUCCESS)
}

pub fn poke(args: PokeArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let addr = resolve_addr(&args.addr)?;
    let mut session = open_session(link)?;
    session
        .poke(addr, args.value)
        .map_err(|err| session_error("poke failed", err))?;

    let word = MemoryWord::new(addr, args.value);
    emit(&word, &word.rows(), format);
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_resolve_by_name_or_number() {
        assert_eq!(resolve_addr("OVERSPEED_FAULT_THRESHOLD").unwrap(), 0x06);
        assert_eq!(resolve_addr("0x07").unwrap(), 0x07);
        assert_eq!(resolve_addr("300").unwrap_err().code, crate::exit::USAGE);
    }

    #[test]
    fn threshold_word_is_scaled() {
        let word = MemoryWord::new(memory::OVERSPEED_FAULT_THRESHOLD, 0x1900);
        assert_eq!(word.scaled, Some(25.0));
        assert_eq!(word.rows().len(), 4);
        assert!(MemoryWord::new(0x00, 1).scaled.is_none());
    }
}
