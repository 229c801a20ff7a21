use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{LoadError, MalformedRecord};
use crate::models::{CatalogRecord, ETF_SENTINEL, SPAC_SENTINEL};

/// Records that survived decoding plus how many entries were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCatalog {
    pub records: Vec<CatalogRecord>,
    pub dropped: usize,
}

/// Outer object of the list response. The web client reads `result`; the
/// reference server emits `code_list` next to a `count`. When both are
/// present `result` wins.
#[derive(Deserialize)]
struct CatalogEnvelope {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    code_list: Option<Vec<Value>>,
}

/// Decode a catalog response body. Only a body that is not JSON, or that has
/// no record array, fails the whole load; bad entries are skipped one by one
/// so a few broken rows do not hide the rest of the catalog.
pub fn parse_catalog(body: &str) -> Result<ParsedCatalog, LoadError> {
    let envelope: CatalogEnvelope =
        serde_json::from_str(body).map_err(|err| LoadError::payload(err.to_string()))?;
    let entries = envelope
        .result
        .or(envelope.code_list)
        .ok_or_else(|| LoadError::payload("response has no `result` array"))?;

    let mut parsed = ParsedCatalog {
        records: Vec::with_capacity(entries.len()),
        dropped: 0,
    };
    let mut seen = HashSet::with_capacity(entries.len());

    for (index, value) in entries.iter().enumerate() {
        match decode_record(index, value) {
            Ok(record) => {
                if seen.insert(record.code.clone()) {
                    parsed.records.push(record);
                } else {
                    let reason = MalformedRecord::DuplicateCode {
                        index,
                        code: record.code,
                    };
                    warn!(%reason, "dropping catalog entry");
                    parsed.dropped += 1;
                }
            }
            Err(reason) => {
                warn!(%reason, "dropping catalog entry");
                parsed.dropped += 1;
            }
        }
    }

    Ok(parsed)
}

fn decode_record(index: usize, value: &Value) -> Result<CatalogRecord, MalformedRecord> {
    let object = value
        .as_object()
        .ok_or(MalformedRecord::NotAnObject { index })?;

    Ok(CatalogRecord {
        code: required_text(object, index, "code")?,
        name: required_text(object, index, "name")?,
        market: object.get("market").and_then(text_of).unwrap_or_default(),
        is_etf: decode_flag(object.get("is_etf"), ETF_SENTINEL),
        is_spac: decode_flag(object.get("is_spac"), SPAC_SENTINEL),
    })
}

fn required_text(
    object: &Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, MalformedRecord> {
    object
        .get(field)
        .and_then(text_of)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(MalformedRecord::MissingField { index, field })
}

/// Flags arrive as strings in practice, but the server has no schema for
/// them. Strings and numbers are compared by their text; anything else
/// (missing, null, bool, nested) is not a member.
pub(crate) fn decode_flag(value: Option<&Value>, sentinel: &str) -> bool {
    value
        .and_then(text_of)
        .is_some_and(|text| text.trim() == sentinel)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
