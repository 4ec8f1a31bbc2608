//! Wire enums. Each is a single byte holding the member index.

use hyproto_codec::{MapKey, SchemaBuilder, Value};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Schema name of the enum.
            pub const NAME: &'static str = stringify!($name);
            /// Members in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const COUNT: u8 = Self::ALL.len() as u8;

            pub fn from_wire(value: u8) -> Option<Self> {
                Self::ALL.get(value as usize).copied()
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::Enum(value as u8)
            }
        }

        impl From<$name> for MapKey {
            fn from(value: $name) -> Self {
                MapKey::Enum(value as u8)
            }
        }
    };
}

wire_enum! {
    /// Tri-state flag; `Null` inherits from the enclosing message.
    MaybeBool { Null, False, True }
}

wire_enum! { WaitForDataFrom { Client, Server, None } }

wire_enum! {
    InteractionType {
        Primary,
        Secondary,
        Ability1,
        Ability2,
        Ability3,
        Use,
        Pick,
        Pickup,
        CollisionEnter,
        CollisionLeave,
        Collision,
        EntityStatEffect,
        SwapTo,
        SwapFrom,
        Death,
        Wielding,
        ProjectileSpawn,
        ProjectileHit,
        ProjectileMiss,
        ProjectileBounce,
        Held,
        HeldOffhand,
        Equipped,
        Dodge,
        GameModeSwap,
    }
}

wire_enum! { FailOnType { Never, Block, Entity, Either } }

wire_enum! { GameMode { Adventure, Creative } }

wire_enum! { ClientType { Game, Editor } }

wire_enum! { NotificationStyle { Default, Danger, Warning, Success } }

wire_enum! { DisconnectType { Disconnect, Crash } }

wire_enum! { PongType { Raw, Direct, Tick } }

wire_enum! { ChatType { Chat } }

wire_enum! { AccumulationMode { Set, Sum, Average } }

wire_enum! { HorizontalSelectorDirection { ToLeft, ToRight } }

/// Declares every wire enum on `builder`.
pub(crate) fn declare(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .enumeration(MaybeBool::NAME, MaybeBool::COUNT)
        .enumeration(WaitForDataFrom::NAME, WaitForDataFrom::COUNT)
        .enumeration(InteractionType::NAME, InteractionType::COUNT)
        .enumeration(FailOnType::NAME, FailOnType::COUNT)
        .enumeration(GameMode::NAME, GameMode::COUNT)
        .enumeration(ClientType::NAME, ClientType::COUNT)
        .enumeration(NotificationStyle::NAME, NotificationStyle::COUNT)
        .enumeration(DisconnectType::NAME, DisconnectType::COUNT)
        .enumeration(PongType::NAME, PongType::COUNT)
        .enumeration(ChatType::NAME, ChatType::COUNT)
        .enumeration(AccumulationMode::NAME, AccumulationMode::COUNT)
        .enumeration(
            HorizontalSelectorDirection::NAME,
            HorizontalSelectorDirection::COUNT,
        )
}
