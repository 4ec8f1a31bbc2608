//! Game protocol definitions on top of `hyproto-codec`.
//!
//! [`schema`] declares every enum, record and polymorphic family the
//! packets use; [`PacketRegistry::standard`] maps packet ids onto those
//! records.
//!
//! ```
//! use hyproto_protocol::{messages, PacketRegistry};
//! use hyproto_codec::Record;
//! use hyproto_protocol::enums::ChatType;
//!
//! let registry = PacketRegistry::standard().unwrap();
//! let packet = Record::new("ServerMessage")
//!     .with("type", ChatType::Chat)
//!     .with("message", messages::text("Welcome!"));
//! let (id, payload) = registry.encode_packet(&packet).unwrap();
//! assert_eq!(id, 210);
//! assert_eq!(registry.decode_packet(id, &payload).unwrap(), packet);
//! ```

pub mod enums;
pub mod interactions;
pub mod messages;
pub mod packets;
pub mod registry;

use hyproto_codec::{Codec, SchemaError, SchemaSet};

pub use messages::ParamValue;
pub use registry::{PacketInfo, PacketRegistry, PacketRegistryBuilder, RegistryError};

/// Builds the schema set for the whole protocol.
pub fn schema() -> Result<SchemaSet, SchemaError> {
    let builder = enums::declare(SchemaSet::builder());
    let builder = messages::declare(builder);
    let builder = interactions::declare(builder);
    packets::declare(builder).build()
}

/// A codec over [`schema`] with default limits.
pub fn codec() -> Result<Codec, SchemaError> {
    schema().map(Codec::new)
}
