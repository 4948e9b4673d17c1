//! Function helpers and column references.

use super::raw::Raw;
use super::value::{Operand, Value};
use crate::error::{Error, Result};

/// `CURRENT_TIMESTAMP`, optionally with a fractional-second precision.
pub fn now(precision: Option<u32>) -> Raw {
    match precision {
        Some(p) => Raw::new(format!("CURRENT_TIMESTAMP({})", p)),
        None => Raw::new("CURRENT_TIMESTAMP"),
    }
}

fn parse_hex_uuid(uuid: &str) -> Result<[u8; 16]> {
    let hex: String = uuid.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return Err(Error::validation(format!("Invalid uuid: {}", uuid)));
    }
    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| Error::validation(format!("Invalid uuid: {}", uuid)))?;
    }
    Ok(bytes)
}

/// Pack a textual uuid into 16 bytes.
///
/// `ordered` moves the time fields to the front so that time-based uuids
/// sort by creation time.
pub fn uuid_to_bin(uuid: &str, ordered: bool) -> Result<Value> {
    let raw = parse_hex_uuid(uuid)?;
    if !ordered {
        return Ok(Value::Bytes(raw.to_vec()));
    }
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&raw[6..8]);
    out.extend_from_slice(&raw[4..6]);
    out.extend_from_slice(&raw[0..4]);
    out.extend_from_slice(&raw[8..16]);
    Ok(Value::Bytes(out))
}

/// Inverse of [`uuid_to_bin`].
pub fn bin_to_uuid(bytes: &[u8], ordered: bool) -> Result<String> {
    if bytes.len() != 16 {
        return Err(Error::validation(format!(
            "Expected 16 bytes for a uuid, got {}",
            bytes.len()
        )));
    }
    let mut raw = [0u8; 16];
    if ordered {
        raw[6..8].copy_from_slice(&bytes[0..2]);
        raw[4..6].copy_from_slice(&bytes[2..4]);
        raw[0..4].copy_from_slice(&bytes[4..8]);
        raw[8..16].copy_from_slice(&bytes[8..16]);
    } else {
        raw.copy_from_slice(bytes);
    }
    let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// A column reference usable in value position: `where_("a", Ref::new("b"))`
/// compares two columns.
#[derive(Debug, Clone)]
pub struct Ref {
    name: String,
    schema: Option<String>,
    alias: Option<String>,
}

impl Ref {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

impl From<Ref> for Raw {
    fn from(r: Ref) -> Self {
        let name = r.qualified();
        match r.alias {
            Some(alias) => Raw::with_bindings("?? as ??", [name, alias]),
            None => Raw::with_bindings("??", [name]),
        }
    }
}

impl From<Ref> for Operand {
    fn from(r: Ref) -> Self {
        Operand::Raw(r.into())
    }
}
