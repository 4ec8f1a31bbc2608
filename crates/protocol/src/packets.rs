//! Connection and interface packets.
//!
//! Records with a single variable-length field (`HostAddress`, `Disconnect`,
//! `ChatMessage`, `ServerMessage`) still carry a 4-byte offset slot for it,
//! so their payloads are 4 bytes longer than a layout that writes a lone
//! variable field inline right after the fixed block.

use hyproto_codec::{FieldType, RecordDef, SchemaBuilder, DEFAULT_MAX_LENGTH, PROTOCOL_MAX_PAYLOAD};

use crate::enums::{ChatType, ClientType, DisconnectType, NotificationStyle, PongType};
use crate::messages::FORMATTED_MESSAGE;

pub const CONNECT: &str = "Connect";
pub const DISCONNECT: &str = "Disconnect";
pub const PING: &str = "Ping";
pub const PONG: &str = "Pong";
pub const SERVER_MESSAGE: &str = "ServerMessage";
pub const CHAT_MESSAGE: &str = "ChatMessage";
pub const NOTIFICATION: &str = "Notification";

pub const HOST_ADDRESS: &str = "HostAddress";
pub const INSTANT_DATA: &str = "InstantData";
pub const ITEM_WITH_ALL_METADATA: &str = "ItemWithAllMetadata";

/// Width of the zero-padded protocol hash in `Connect`.
pub const PROTOCOL_HASH_LENGTH: usize = 64;

pub(crate) fn declare(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .record(
            RecordDef::new(HOST_ADDRESS)
                .required("port", FieldType::Short)
                .required("host", FieldType::string(256)),
        )
        .record(
            RecordDef::new(INSTANT_DATA)
                .required("seconds", FieldType::Long)
                .required("nanos", FieldType::Int),
        )
        .record(
            RecordDef::new(ITEM_WITH_ALL_METADATA)
                .required("itemId", FieldType::string(DEFAULT_MAX_LENGTH))
                .required("quantity", FieldType::Int)
                .required("durability", FieldType::Double)
                .required("maxDurability", FieldType::Double)
                .required("overrideDroppedItemAnimation", FieldType::Bool)
                .optional("metadata", FieldType::string(DEFAULT_MAX_LENGTH))
                .max_size(32_768_040),
        )
        .record(
            RecordDef::new(CONNECT)
                .required("protocolHash", FieldType::FixedAscii(PROTOCOL_HASH_LENGTH))
                .required("clientType", FieldType::enumeration(ClientType::NAME))
                .optional("language", FieldType::ascii(128))
                .optional("identityToken", FieldType::string(8192))
                .required("uuid", FieldType::Uuid)
                .required("username", FieldType::ascii(16))
                .optional("referralData", FieldType::bytes(4096))
                .optional("referralSource", FieldType::record(HOST_ADDRESS))
                .max_size(38_161),
        )
        .record(
            RecordDef::new(DISCONNECT)
                .optional("reason", FieldType::string(DEFAULT_MAX_LENGTH))
                .required("type", FieldType::enumeration(DisconnectType::NAME))
                .max_size(16_384_007),
        )
        .record(
            RecordDef::new(PING)
                .required("id", FieldType::Int)
                .optional("time", FieldType::inline(INSTANT_DATA))
                .required("lastPingValueRaw", FieldType::Int)
                .required("lastPingValueDirect", FieldType::Int)
                .required("lastPingValueTick", FieldType::Int)
                .max_size(29),
        )
        .record(
            RecordDef::new(PONG)
                .required("id", FieldType::Int)
                .optional("time", FieldType::inline(INSTANT_DATA))
                .required("type", FieldType::enumeration(PongType::NAME))
                .required("packetQueueSize", FieldType::Short)
                .max_size(20),
        )
        .record(
            RecordDef::new(SERVER_MESSAGE)
                .required("type", FieldType::enumeration(ChatType::NAME))
                .optional("message", FieldType::record(FORMATTED_MESSAGE))
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
        .record(
            RecordDef::new(CHAT_MESSAGE)
                .optional("message", FieldType::string(DEFAULT_MAX_LENGTH))
                .max_size(16_384_006),
        )
        .record(
            RecordDef::new(NOTIFICATION)
                .optional("message", FieldType::record(FORMATTED_MESSAGE))
                .optional("secondaryMessage", FieldType::record(FORMATTED_MESSAGE))
                .optional("icon", FieldType::string(DEFAULT_MAX_LENGTH))
                .optional("item", FieldType::record(ITEM_WITH_ALL_METADATA))
                .required("style", FieldType::enumeration(NotificationStyle::NAME))
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
}
