//! Interaction definitions and the selectors they use.
//!
//! Interactions compose by embedding: `SimpleInteraction` starts with every
//! field of `Interaction`, and `SelectInteraction` starts with every field of
//! `SimpleInteraction`. Which concrete kind sits on the wire is decided only
//! by the `Interaction` family tag.

use hyproto_codec::{
    FamilyDef, FieldType, KeyType, RecordDef, SchemaBuilder, DEFAULT_MAX_LENGTH,
    PROTOCOL_MAX_PAYLOAD,
};

use crate::enums::{
    AccumulationMode, FailOnType, GameMode, HorizontalSelectorDirection, InteractionType,
    WaitForDataFrom,
};

pub const INTERACTION_FAMILY: &str = "Interaction";
pub const SELECTOR_FAMILY: &str = "Selector";

pub const INTERACTION: &str = "Interaction";
pub const SIMPLE_INTERACTION: &str = "SimpleInteraction";
pub const CHARGING_INTERACTION: &str = "ChargingInteraction";
pub const SELECT_INTERACTION: &str = "SelectInteraction";

pub const AOE_CIRCLE_SELECTOR: &str = "AOECircleSelector";
pub const AOE_CYLINDER_SELECTOR: &str = "AOECylinderSelector";
pub const RAYCAST_SELECTOR: &str = "RaycastSelector";
pub const HORIZONTAL_SELECTOR: &str = "HorizontalSelector";
pub const STAB_SELECTOR: &str = "StabSelector";

pub const VECTOR3F: &str = "Vector3f";
pub const CHARGING_DELAY: &str = "ChargingDelay";
pub const INTERACTION_SETTINGS: &str = "InteractionSettings";
pub const INTERACTION_RULES: &str = "InteractionRules";
pub const INTERACTION_EFFECTS: &str = "InteractionEffects";
pub const INTERACTION_CAMERA_SETTINGS: &str = "InteractionCameraSettings";
pub const CAMERA_SHAKE_EFFECT: &str = "CameraShakeEffect";
pub const MOVEMENT_EFFECTS: &str = "MovementEffects";
pub const MODEL_PARTICLE: &str = "ModelParticle";
pub const MODEL_TRAIL: &str = "ModelTrail";
pub const HIT_ENTITY: &str = "HitEntity";

fn floats(mut def: RecordDef, names: &[&str]) -> RecordDef {
    for name in names {
        def = def.required(*name, FieldType::Float);
    }
    def
}

fn bools(mut def: RecordDef, names: &[&str]) -> RecordDef {
    for name in names {
        def = def.required(*name, FieldType::Bool);
    }
    def
}

fn string() -> FieldType {
    FieldType::string(DEFAULT_MAX_LENGTH)
}

fn list(element: FieldType) -> FieldType {
    FieldType::array(element, DEFAULT_MAX_LENGTH)
}

fn dictionary(key: KeyType, value: FieldType) -> FieldType {
    FieldType::map(key, value, DEFAULT_MAX_LENGTH)
}

pub(crate) fn declare(builder: SchemaBuilder) -> SchemaBuilder {
    let builder = declare_selectors(declare_effects(builder));
    let interaction_types = || list(FieldType::enumeration(InteractionType::NAME));
    let wait_for = FieldType::enumeration(WaitForDataFrom::NAME);
    let settings = dictionary(
        KeyType::enumeration(GameMode::NAME),
        FieldType::inline(INTERACTION_SETTINGS),
    );
    let forks = dictionary(KeyType::enumeration(InteractionType::NAME), FieldType::Int);

    builder
        .record(RecordDef::new(INTERACTION_SETTINGS).required("allowSkipOnClick", FieldType::Bool))
        .record(
            RecordDef::new(INTERACTION_RULES)
                .optional("blockedBy", interaction_types())
                .optional("blocking", interaction_types())
                .optional("interruptedBy", interaction_types())
                .optional("interrupting", interaction_types())
                .required("blockedByBypassIndex", FieldType::Int)
                .required("blockingBypassIndex", FieldType::Int)
                .required("interruptedByBypassIndex", FieldType::Int)
                .required("interruptingBypassIndex", FieldType::Int)
                .max_size(16_384_053),
        )
        .record(
            RecordDef::new(INTERACTION_CAMERA_SETTINGS)
                .required("distance", FieldType::Float)
                .required("allowPitch", FieldType::Bool)
                .optional("cameraId", string()),
        )
        .record(floats(
            RecordDef::new(CHARGING_DELAY),
            &[
                "minDelay",
                "maxDelay",
                "maxTotalDelay",
                "minHealth",
                "maxHealth",
            ],
        ))
        .record(
            RecordDef::new(HIT_ENTITY)
                .required("next", FieldType::Int)
                .optional("matchers", list(FieldType::Int)),
        )
        .record(
            RecordDef::new(INTERACTION)
                .required("waitForDataFrom", wait_for)
                .optional("effects", FieldType::record(INTERACTION_EFFECTS))
                .required("horizontalSpeedMultiplier", FieldType::Float)
                .required("runTime", FieldType::Float)
                .required("cancelOnItemChange", FieldType::Bool)
                .optional("settings", settings)
                .optional("rules", FieldType::record(INTERACTION_RULES))
                .optional("tags", list(FieldType::Int))
                .optional("camera", FieldType::record(INTERACTION_CAMERA_SETTINGS)),
        )
        .record(
            RecordDef::new(SIMPLE_INTERACTION)
                .extends(INTERACTION)
                .required("next", FieldType::Int)
                .required("failed", FieldType::Int)
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
        .record(
            bools(
                RecordDef::new(CHARGING_INTERACTION)
                    .extends(INTERACTION)
                    .required("failed", FieldType::Int),
                &[
                    "allowIndefiniteHold",
                    "displayProgress",
                    "cancelOnOtherClick",
                    "failOnDamage",
                ],
            )
            .required("mouseSensitivityAdjustmentTarget", FieldType::Float)
            .required("mouseSensitivityAdjustmentDuration", FieldType::Float)
            .optional("chargedNext", dictionary(KeyType::Float, FieldType::Int))
            .optional("forks", forks)
            // Last nullable, so it takes bit 7 after the variable fields.
            .optional("chargingDelay", FieldType::inline(CHARGING_DELAY))
            .max_size(PROTOCOL_MAX_PAYLOAD),
        )
        .record(
            RecordDef::new(SELECT_INTERACTION)
                .extends(SIMPLE_INTERACTION)
                .optional("selector", FieldType::variant(SELECTOR_FAMILY))
                .required("ignoreOwner", FieldType::Bool)
                .required("hitEntity", FieldType::Int)
                .required("failOn", FieldType::enumeration(FailOnType::NAME))
                .optional("hitEntityRules", list(FieldType::record(HIT_ENTITY)))
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
        .family(
            FamilyDef::new(INTERACTION_FAMILY)
                .variant(1, SIMPLE_INTERACTION)
                .variant(9, CHARGING_INTERACTION)
                .variant(20, SELECT_INTERACTION),
        )
}

fn declare_effects(builder: SchemaBuilder) -> SchemaBuilder {
    let particles = || list(FieldType::record(MODEL_PARTICLE));
    builder
        .record(
            RecordDef::new(CAMERA_SHAKE_EFFECT)
                .required("cameraShakeId", FieldType::Int)
                .required("intensity", FieldType::Float)
                .required("mode", FieldType::enumeration(AccumulationMode::NAME)),
        )
        .record(bools(
            RecordDef::new(MOVEMENT_EFFECTS),
            &[
                "disableForward",
                "disableBackward",
                "disableLeft",
                "disableRight",
                "disableSprint",
                "disableJump",
                "disableCrouch",
            ],
        ))
        .record(
            RecordDef::new(MODEL_PARTICLE)
                .optional("systemId", string())
                .required("scale", FieldType::Float)
                .required("targetNodeIndex", FieldType::Int)
                .required("detachedFromModel", FieldType::Bool),
        )
        .record(
            RecordDef::new(MODEL_TRAIL)
                .optional("trailId", string())
                .required("targetNodeIndex", FieldType::Int)
                .required("fixedRotation", FieldType::Bool),
        )
        // Fixed fields first, then the variable nullables, so the two inline
        // nullables land on bits 5 and 6.
        .record(
            RecordDef::new(INTERACTION_EFFECTS)
                .required("worldSoundEventIndex", FieldType::Int)
                .required("localSoundEventIndex", FieldType::Int)
                .required("waitForAnimationToFinish", FieldType::Bool)
                .required("clearAnimationOnFinish", FieldType::Bool)
                .required("clearSoundEventOnFinish", FieldType::Bool)
                .optional("particles", particles())
                .optional("firstPersonParticles", particles())
                .optional("trails", list(FieldType::record(MODEL_TRAIL)))
                .optional("itemPlayerAnimationsId", string())
                .optional("itemAnimationId", string())
                .optional("cameraShake", FieldType::inline(CAMERA_SHAKE_EFFECT))
                .optional("movementEffects", FieldType::inline(MOVEMENT_EFFECTS))
                .required("startDelay", FieldType::Float)
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
}

fn declare_selectors(builder: SchemaBuilder) -> SchemaBuilder {
    let direction = FieldType::enumeration(HorizontalSelectorDirection::NAME);
    builder
        .record(floats(RecordDef::new(VECTOR3F), &["x", "y", "z"]))
        .record(
            RecordDef::new(AOE_CIRCLE_SELECTOR)
                .required("range", FieldType::Float)
                .required("offset", FieldType::inline(VECTOR3F)),
        )
        .record(
            RecordDef::new(AOE_CYLINDER_SELECTOR)
                .required("range", FieldType::Float)
                .required("height", FieldType::Float)
                .required("offset", FieldType::inline(VECTOR3F)),
        )
        .record(
            RecordDef::new(RAYCAST_SELECTOR)
                .required("offset", FieldType::inline(VECTOR3F))
                .required("distance", FieldType::Float)
                .required("blockTagIndex", FieldType::Int)
                .required("ignoreFluids", FieldType::Bool),
        )
        .record(
            floats(
                RecordDef::new(HORIZONTAL_SELECTOR),
                &[
                    "extendTop",
                    "extendBottom",
                    "yawLength",
                    "yawStartOffset",
                    "pitchOffset",
                    "rollOffset",
                    "startDistance",
                    "endDistance",
                ],
            )
            .required("direction", direction)
            .required("testLineOfSight", FieldType::Bool),
        )
        .record(
            floats(
                RecordDef::new(STAB_SELECTOR),
                &[
                    "extendTop",
                    "extendBottom",
                    "extendLeft",
                    "extendRight",
                    "yawOffset",
                    "pitchOffset",
                    "rollOffset",
                    "startDistance",
                    "endDistance",
                ],
            )
            .required("testLineOfSight", FieldType::Bool)
            .max_size(37),
        )
        .family(
            FamilyDef::new(SELECTOR_FAMILY)
                .variant(0, AOE_CIRCLE_SELECTOR)
                .variant(1, AOE_CYLINDER_SELECTOR)
                .variant(2, RAYCAST_SELECTOR)
                .variant(3, HORIZONTAL_SELECTOR)
                .variant(4, STAB_SELECTOR),
        )
}
