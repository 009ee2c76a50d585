//! Receipt log decoding driven by runtime ABI JSON.
//!
//! Unlike bindings generated with `sol!`, the ABI here is whatever the
//! caller's contract toolchain produced, so events are resolved at runtime.
//!
//! A log topic is looked up in an [`EventTable`] keyed by
//! `keccak256("Name(type1,type2,...)")`, the same hash the EVM writes as the
//! first topic of a non-anonymous event. On a hit, the log data is decoded
//! against the event's non-indexed parameters.

use std::collections::{BTreeMap, HashMap};

use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::{keccak256, B256};
use tracing::{debug, warn};

use crate::error::{AbiParseError, LogDecodeError};
use crate::types::{LogData, RawLog};

/// One event declared by the ABI.
#[derive(Clone, Debug, PartialEq)]
pub struct EventEntry {
    /// Event name.
    pub name: String,
    /// Canonical signature, e.g. `Transfer(address,uint256)`.
    pub signature: String,
    /// Names of the non-indexed parameters, in data order.
    data_names: Vec<String>,
    /// Resolved types of the non-indexed parameters, in data order.
    data_types: Vec<DynSolType>,
}

/// Topic hash → event lookup for one ABI.
#[derive(Clone, Debug, Default)]
pub struct EventTable {
    entries: HashMap<B256, EventEntry>,
}

impl EventTable {
    /// Looks up a topic hash.
    pub fn get(&self, topic: &B256) -> Option<&EventEntry> {
        self.entries.get(topic)
    }

    /// Number of distinct event signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the ABI declares no events.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All topic hashes in the table.
    pub fn topics(&self) -> impl Iterator<Item = &B256> {
        self.entries.keys()
    }
}

/// Canonical signature of an event: name plus comma-joined parameter types,
/// no spaces, tuple parameters expanded to their component types.
pub fn event_signature(event: &Event) -> String {
    let types: Vec<String> = event
        .inputs
        .iter()
        .map(|input| input.selector_type().into_owned())
        .collect();
    format!("{}({})", event.name, types.join(","))
}

/// Parses ABI JSON and builds the topic table for every declared event.
///
/// Accepts a bare ABI array or a compiler artifact object with an `abi` array.
///
/// # Errors
///
/// [`AbiParseError`] if the text is not JSON, is not an ABI, or declares an
/// event parameter whose type cannot be resolved.
pub fn build_event_table(abi_json: &str) -> Result<EventTable, AbiParseError> {
    let abi = parse_abi(abi_json)?;
    let mut entries = HashMap::new();

    for event in abi.events() {
        let signature = event_signature(event);

        let mut data_names = Vec::new();
        let mut data_types = Vec::new();
        for (position, input) in event.inputs.iter().enumerate() {
            if input.indexed {
                continue;
            }
            let ty = input
                .resolve()
                .map_err(|error| AbiParseError::UnsupportedType {
                    event: event.name.clone(),
                    ty: input.ty.clone(),
                    reason: error.to_string(),
                })?;
            let name = if input.name.is_empty() {
                format!("param{position}")
            } else {
                input.name.clone()
            };
            data_names.push(name);
            data_types.push(ty);
        }

        entries.insert(
            keccak256(signature.as_bytes()),
            EventEntry {
                name: event.name.clone(),
                signature,
                data_names,
                data_types,
            },
        );
    }

    debug!(events = entries.len(), "built event table");
    Ok(EventTable { entries })
}

fn parse_abi(abi_json: &str) -> Result<JsonAbi, AbiParseError> {
    let value: serde_json::Value = serde_json::from_str(abi_json)?;

    let items = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut artifact) => match artifact.remove("abi") {
            Some(abi @ serde_json::Value::Array(_)) => abi,
            _ => {
                return Err(AbiParseError::NotAnInterface(
                    "object without an `abi` array".to_string(),
                ))
            }
        },
        other => {
            return Err(AbiParseError::NotAnInterface(format!(
                "expected an array of ABI items, found {other}"
            )))
        }
    };

    serde_json::from_value(items).map_err(|error| AbiParseError::NotAnInterface(error.to_string()))
}

/// Result of decoding a receipt's logs.
///
/// Decoding skips and continues past malformed payloads so one bad log does
/// not hide the others; the failures are kept here.
#[derive(Debug, Default)]
pub struct DecodedLogs {
    /// Decoded events, in log order then topic order.
    pub logs: Vec<LogData>,
    /// Topics that matched the table but whose data did not decode.
    pub failures: Vec<LogDecodeError>,
}

impl DecodedLogs {
    /// Strict view: the decoded events, or the first failure.
    pub fn into_result(self) -> Result<Vec<LogData>, LogDecodeError> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(self.logs),
        }
    }
}

/// Decodes every log topic that names an event in `table`.
///
/// Topics without a match are skipped silently: receipts routinely carry
/// logs of contracts outside the tracked ABI.
pub fn decode_logs(table: &EventTable, raw_logs: &[RawLog]) -> DecodedLogs {
    let mut decoded = DecodedLogs::default();

    for (log_index, log) in raw_logs.iter().enumerate() {
        for topic in &log.topics {
            let Some(entry) = table.get(topic) else {
                continue;
            };

            match decode_data(entry, &log.data) {
                Ok(fields) => decoded.logs.push(LogData {
                    event_name: entry.name.clone(),
                    fields,
                }),
                Err(reason) => {
                    let failure = LogDecodeError {
                        event: entry.name.clone(),
                        topic: *topic,
                        log_index,
                        reason,
                    };
                    warn!(%failure, "skipping undecodable log");
                    decoded.failures.push(failure);
                }
            }
        }
    }

    decoded
}

fn decode_data(entry: &EventEntry, data: &[u8]) -> Result<BTreeMap<String, DynSolValue>, String> {
    let layout = DynSolType::Tuple(entry.data_types.clone());
    let values = match layout
        .abi_decode_sequence(data)
        .map_err(|error| error.to_string())?
    {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };

    if values.len() != entry.data_names.len() {
        return Err(format!(
            "expected {} values, decoded {}",
            entry.data_names.len(),
            values.len()
        ));
    }

    Ok(entry.data_names.iter().cloned().zip(values).collect())
}
