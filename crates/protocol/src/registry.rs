//! Packet id table and per-packet dispatch.

use std::collections::{BTreeMap, HashMap};

use hyproto_codec::{
    Codec, CodecOptions, ProtocolError, Record, SchemaError, SchemaSet, ValidationError, Writer,
    PROTOCOL_MAX_PAYLOAD,
};
use thiserror::Error;
use tracing::{trace, warn};

use crate::packets::{CHAT_MESSAGE, CONNECT, DISCONNECT, NOTIFICATION, PING, PONG, SERVER_MESSAGE};

/// Static metadata for one packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketInfo {
    pub id: u32,
    pub name: String,
    /// Record the payload is encoded as.
    pub record: String,
    /// Largest payload accepted for this packet.
    pub max_size: usize,
    /// Whether the framing layer compresses this packet. Carried as
    /// metadata only.
    pub compressed: bool,
}

impl PacketInfo {
    /// A packet whose payload record shares its name. `max_size` starts at
    /// the record's declared maximum, or the protocol maximum when it
    /// declares none.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            record: name.clone(),
            name,
            max_size: 0,
            compressed: false,
        }
    }

    pub fn record(mut self, record: impl Into<String>) -> Self {
        self.record = record.into();
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate packet ID {id}: '{name}' conflicts with '{existing}'")]
    DuplicateId {
        id: u32,
        name: String,
        existing: String,
    },
    #[error("duplicate packet name '{0}'")]
    DuplicateName(String),
    #[error("packets '{first}' and '{second}' share payload record {record}")]
    DuplicateRecord {
        record: String,
        first: String,
        second: String,
    },
    #[error("packet '{packet}' uses unknown record {record}")]
    UnknownRecord { packet: String, record: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Collects packet registrations against a schema set.
#[derive(Debug, Clone)]
pub struct PacketRegistryBuilder {
    schema: SchemaSet,
    options: CodecOptions,
    packets: Vec<PacketInfo>,
}

impl PacketRegistryBuilder {
    pub fn options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn register(mut self, info: PacketInfo) -> Self {
        self.packets.push(info);
        self
    }

    pub fn build(self) -> Result<PacketRegistry, RegistryError> {
        let mut by_id: BTreeMap<u32, PacketInfo> = BTreeMap::new();
        let mut by_name = HashMap::with_capacity(self.packets.len());
        let mut by_record: HashMap<String, u32> = HashMap::with_capacity(self.packets.len());

        for mut info in self.packets {
            if let Some(existing) = by_id.get(&info.id) {
                return Err(RegistryError::DuplicateId {
                    id: info.id,
                    name: info.name,
                    existing: existing.name.clone(),
                });
            }
            if by_name.contains_key(&info.name) {
                return Err(RegistryError::DuplicateName(info.name));
            }
            let layout = self
                .schema
                .record(&info.record)
                .map_err(|_| RegistryError::UnknownRecord {
                    packet: info.name.clone(),
                    record: info.record.clone(),
                })?;
            if let Some(first) = by_record.get(&info.record).and_then(|id| by_id.get(id)) {
                return Err(RegistryError::DuplicateRecord {
                    record: info.record,
                    first: first.name.clone(),
                    second: info.name,
                });
            }
            if info.max_size == 0 {
                info.max_size = layout.max_size.unwrap_or(PROTOCOL_MAX_PAYLOAD);
            }
            by_name.insert(info.name.clone(), info.id);
            by_record.insert(info.record.clone(), info.id);
            by_id.insert(info.id, info);
        }

        Ok(PacketRegistry {
            codec: Codec::with_options(self.schema, self.options),
            by_id,
            by_name,
            by_record,
        })
    }
}

/// Maps packet ids to payload records and runs the codec on whole payloads.
///
/// Framing and compression happen outside; every method here takes or
/// returns the bare payload of a single packet.
#[derive(Debug, Clone)]
pub struct PacketRegistry {
    codec: Codec,
    by_id: BTreeMap<u32, PacketInfo>,
    by_name: HashMap<String, u32>,
    by_record: HashMap<String, u32>,
}

impl PacketRegistry {
    pub fn builder(schema: SchemaSet) -> PacketRegistryBuilder {
        PacketRegistryBuilder {
            schema,
            options: CodecOptions::default(),
            packets: Vec::new(),
        }
    }

    /// The connection and interface packets of the game protocol.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::standard_with_options(CodecOptions::default())
    }

    pub fn standard_with_options(options: CodecOptions) -> Result<Self, RegistryError> {
        Self::builder(crate::schema()?)
            .options(options)
            .register(PacketInfo::new(0, CONNECT))
            .register(PacketInfo::new(1, DISCONNECT))
            .register(PacketInfo::new(2, PING))
            .register(PacketInfo::new(3, PONG))
            .register(PacketInfo::new(210, SERVER_MESSAGE))
            .register(PacketInfo::new(211, CHAT_MESSAGE))
            .register(PacketInfo::new(212, NOTIFICATION))
            .build()
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn lookup_by_id(&self, id: u32) -> Option<&PacketInfo> {
        self.by_id.get(&id)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&PacketInfo> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Registered packets in id order.
    pub fn packets(&self) -> impl Iterator<Item = &PacketInfo> {
        self.by_id.values()
    }

    /// Fixed block size of the packet's payload record.
    pub fn fixed_block_size(&self, id: u32) -> Option<usize> {
        let info = self.lookup_by_id(id)?;
        self.codec
            .schema()
            .record(&info.record)
            .ok()
            .map(|l| l.fixed_block_size)
    }

    /// Structurally validates a payload without decoding it.
    pub fn validate_packet(&self, id: u32, payload: &[u8]) -> Result<(), ValidationError> {
        let info = self.dispatch(id, payload)?;
        self.codec.validate(payload, 0, &info.record)
    }

    pub fn decode_packet(&self, id: u32, payload: &[u8]) -> Result<Record, ProtocolError> {
        let info = self.dispatch(id, payload)?;
        self.codec.decode(payload, 0, &info.record)
    }

    /// Encodes `record` as the payload of the packet registered for it and
    /// returns the packet id with the bytes. The record is sized once for the
    /// limit check and that size preallocates the payload.
    pub fn encode_packet(&self, record: &Record) -> Result<(u32, Vec<u8>), ProtocolError> {
        let info = self
            .by_record
            .get(&record.name)
            .and_then(|id| self.by_id.get(id))
            .ok_or_else(|| ProtocolError::UnknownPacket {
                packet: record.name.clone(),
            })?;
        let size = self.codec.compute_size(record)?;
        let limit = self.limit(info);
        if size > limit {
            warn!(id = info.id, name = %info.name, size, limit, "packet exceeds max size");
            return Err(ProtocolError::PacketTooLarge {
                name: info.name.clone(),
                size,
                max: limit,
            });
        }
        trace!(id = info.id, name = %info.name, size, "encoding packet");
        let mut writer = Writer::with_capacity(size);
        self.codec.encode(&mut writer, record)?;
        Ok((info.id, writer.flush()))
    }

    fn limit(&self, info: &PacketInfo) -> usize {
        info.max_size.min(self.codec.options().max_packet_size)
    }

    fn dispatch(&self, id: u32, payload: &[u8]) -> Result<&PacketInfo, ProtocolError> {
        let info = self.by_id.get(&id).ok_or_else(|| ProtocolError::UnknownPacket {
            packet: id.to_string(),
        })?;
        let limit = self.limit(info);
        if payload.len() > limit {
            return Err(ProtocolError::PacketTooLarge {
                name: info.name.clone(),
                size: payload.len(),
                max: limit,
            });
        }
        trace!(id, name = %info.name, len = payload.len(), "dispatching packet");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use hyproto_codec::{FieldType, RecordDef, Value};
    use tracing_test::traced_test;

    use super::*;

    fn schema() -> SchemaSet {
        SchemaSet::builder()
            .record(
                RecordDef::new("Hello")
                    .required("n", FieldType::Int)
                    .max_size(5),
            )
            .record(RecordDef::new("Bye").optional("why", FieldType::string(64)))
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_duplicate_ids_and_names() {
        let err = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .register(PacketInfo::new(1, "Bye"))
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate packet ID 1: 'Bye' conflicts with 'Hello'"
        );

        let err = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .register(PacketInfo::new(2, "Hello"))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Hello".into()));

        let err = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .register(PacketInfo::new(2, "Greeting").record("Hello"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRecord { .. }));

        let err = PacketRegistry::builder(schema())
            .register(PacketInfo::new(3, "Missing"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownRecord {
                packet: "Missing".into(),
                record: "Missing".into(),
            }
        );
    }

    #[test]
    fn max_size_defaults_from_record() {
        let registry = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .register(PacketInfo::new(2, "Bye").compressed(true))
            .build()
            .unwrap();
        assert_eq!(registry.lookup_by_id(1).unwrap().max_size, 5);
        let bye = registry.lookup_by_name("Bye").unwrap();
        assert_eq!(bye.max_size, PROTOCOL_MAX_PAYLOAD);
        assert!(bye.compressed);
    }

    #[test]
    #[traced_test]
    fn oversized_encode_is_rejected_and_logged() {
        let registry = PacketRegistry::builder(schema())
            .options(CodecOptions {
                max_packet_size: 8,
                ..CodecOptions::default()
            })
            .register(PacketInfo::new(2, "Bye"))
            .build()
            .unwrap();
        let bye = Record::new("Bye").with("why", "a reason that is long");
        assert_eq!(
            registry.encode_packet(&bye).unwrap_err(),
            ProtocolError::PacketTooLarge {
                name: "Bye".into(),
                size: 27,
                max: 8,
            }
        );
        assert!(logs_contain("packet exceeds max size"));

        let short = Record::new("Bye").with("why", "ok");
        let (id, bytes) = registry.encode_packet(&short).unwrap();
        assert_eq!(id, 2);
        assert_eq!(registry.decode_packet(id, &bytes).unwrap(), short);
    }

    #[test]
    fn payload_length_matches_predicted_size() {
        let registry = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .register(PacketInfo::new(2, "Bye"))
            .build()
            .unwrap();
        let cases = [
            Record::new("Hello").with("n", Value::Int(-7)),
            Record::new("Bye"),
            Record::new("Bye").with("why", "because"),
        ];
        for record in cases {
            let predicted = registry.codec().compute_size(&record).unwrap();
            let (id, bytes) = registry.encode_packet(&record).unwrap();
            assert_eq!(bytes.len(), predicted, "{}", record.name);
            assert_eq!(registry.decode_packet(id, &bytes).unwrap(), record);
        }
    }

    #[test]
    fn unknown_packets_are_reported() {
        let registry = PacketRegistry::builder(schema())
            .register(PacketInfo::new(1, "Hello"))
            .build()
            .unwrap();
        assert_eq!(
            registry.decode_packet(9, &[]).unwrap_err(),
            ProtocolError::UnknownPacket { packet: "9".into() }
        );
        assert_eq!(
            registry.encode_packet(&Record::new("Bye")).unwrap_err(),
            ProtocolError::UnknownPacket {
                packet: "Bye".into(),
            }
        );
        let hello = Record::new("Hello").with("n", Value::Int(1));
        let (_, bytes) = registry.encode_packet(&hello).unwrap();
        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(
            registry.validate_packet(1, &padded).unwrap_err().cause(),
            &ProtocolError::PacketTooLarge {
                name: "Hello".into(),
                size: 6,
                max: 5,
            }
        );
    }
}
