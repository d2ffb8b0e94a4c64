//! Property channels tracked on every element
//!
//! A channel is one named slice of an element's properties (fills, layout,
//! typography, ...). Each element carries an optional fingerprint per channel
//! in [`ChannelHashes`] and, optionally, the raw payload it was computed from
//! in [`ChannelValues`] so that changes can be shown to a reviewer.
//!
//! Channels are a closed enum rather than string keys: adding one means
//! adding a variant, and every `match` over [`Channel`] then has to handle it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One fingerprinted slice of an element's properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Fill paints
    Fills,
    /// Stroke paints
    Strokes,
    /// Shadows and blurs
    Effects,
    /// Auto-layout rules
    Layout,
    /// Size, position and corner radius
    Geometry,
    /// Opacity, blend mode and visibility
    Appearance,
    /// Stroke weight and alignment
    Border,
    /// Font and text settings
    Typography,
    /// Folded hash of the child tree
    Structure,
    /// Component property definitions
    ComponentProperties,
    /// Instance overrides
    Overrides,
    /// Exposed nested instance properties
    ExposedProperties,
    /// Variables bound to properties
    VariableUsage,
    /// Variable values per mode
    VariableDefinition,
    /// Prototype interactions
    Interactions,
}

impl Channel {
    /// Every channel, in the order changes are reported
    pub const ALL: [Channel; 15] = [
        Channel::Fills,
        Channel::Strokes,
        Channel::Effects,
        Channel::Layout,
        Channel::Geometry,
        Channel::Appearance,
        Channel::Border,
        Channel::Typography,
        Channel::Structure,
        Channel::ComponentProperties,
        Channel::Overrides,
        Channel::ExposedProperties,
        Channel::VariableUsage,
        Channel::VariableDefinition,
        Channel::Interactions,
    ];

    /// Property key used in [`PropertyChange`](crate::types::PropertyChange)
    pub fn key(self) -> &'static str {
        match self {
            Channel::Fills => "fills",
            Channel::Strokes => "strokes",
            Channel::Effects => "effects",
            Channel::Layout => "layout",
            Channel::Geometry => "geometry",
            Channel::Appearance => "appearance",
            Channel::Border => "border",
            Channel::Typography => "typography",
            Channel::Structure => "structure",
            Channel::ComponentProperties => "componentProperties",
            Channel::Overrides => "overrides",
            Channel::ExposedProperties => "exposedProperties",
            Channel::VariableUsage => "variableUsage",
            Channel::VariableDefinition => "variableDefinition",
            Channel::Interactions => "interactions",
        }
    }

    /// Name of the hash field on a serialized element
    pub fn hash_field(self) -> &'static str {
        match self {
            Channel::Fills => "fillsHash",
            Channel::Strokes => "strokesHash",
            Channel::Effects => "effectsHash",
            Channel::Layout => "layoutHash",
            Channel::Geometry => "geometryHash",
            Channel::Appearance => "appearanceHash",
            Channel::Border => "borderHash",
            Channel::Typography => "typographyHash",
            Channel::Structure => "structureHash",
            Channel::ComponentProperties => "componentPropertiesHash",
            Channel::Overrides => "overridesHash",
            Channel::ExposedProperties => "exposedPropertiesHash",
            Channel::VariableUsage => "variableUsageHash",
            Channel::VariableDefinition => "variableDefinitionHash",
            Channel::Interactions => "interactionsHash",
        }
    }

    /// Human label shown in change lists
    pub fn label(self) -> &'static str {
        match self {
            Channel::Fills => "Fill",
            Channel::Strokes => "Stroke",
            Channel::Effects => "Effects",
            Channel::Layout => "Auto layout",
            Channel::Geometry => "Size",
            Channel::Appearance => "Appearance",
            Channel::Border => "Border",
            Channel::Typography => "Typography",
            Channel::Structure => "Structure",
            Channel::ComponentProperties => "Component properties",
            Channel::Overrides => "Instance overrides",
            Channel::ExposedProperties => "Exposed properties",
            Channel::VariableUsage => "Variable bindings",
            Channel::VariableDefinition => "Variable values",
            Channel::Interactions => "Interactions",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-channel fingerprints of one element
///
/// `None` means the feature does not exist on the element (no typography on
/// a frame, no variable definition on a component). Absent and present never
/// compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelHashes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fills_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strokes_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_properties_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_properties_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_usage_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_definition_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions_hash: Option<String>,
}

impl ChannelHashes {
    /// Fingerprint for `channel`, if the feature is present
    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.slot(channel).as_deref()
    }

    /// Set or clear the fingerprint for `channel`
    pub fn set(&mut self, channel: Channel, hash: Option<String>) {
        *self.slot_mut(channel) = hash;
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, channel: Channel, hash: impl Into<String>) -> Self {
        self.set(channel, Some(hash.into()));
        self
    }

    /// Channels whose fingerprints differ between `self` and `other`
    pub fn differing(&self, other: &ChannelHashes) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|&c| self.get(c) != other.get(c))
            .collect()
    }

    fn slot(&self, channel: Channel) -> &Option<String> {
        match channel {
            Channel::Fills => &self.fills_hash,
            Channel::Strokes => &self.strokes_hash,
            Channel::Effects => &self.effects_hash,
            Channel::Layout => &self.layout_hash,
            Channel::Geometry => &self.geometry_hash,
            Channel::Appearance => &self.appearance_hash,
            Channel::Border => &self.border_hash,
            Channel::Typography => &self.typography_hash,
            Channel::Structure => &self.structure_hash,
            Channel::ComponentProperties => &self.component_properties_hash,
            Channel::Overrides => &self.overrides_hash,
            Channel::ExposedProperties => &self.exposed_properties_hash,
            Channel::VariableUsage => &self.variable_usage_hash,
            Channel::VariableDefinition => &self.variable_definition_hash,
            Channel::Interactions => &self.interactions_hash,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<String> {
        match channel {
            Channel::Fills => &mut self.fills_hash,
            Channel::Strokes => &mut self.strokes_hash,
            Channel::Effects => &mut self.effects_hash,
            Channel::Layout => &mut self.layout_hash,
            Channel::Geometry => &mut self.geometry_hash,
            Channel::Appearance => &mut self.appearance_hash,
            Channel::Border => &mut self.border_hash,
            Channel::Typography => &mut self.typography_hash,
            Channel::Structure => &mut self.structure_hash,
            Channel::ComponentProperties => &mut self.component_properties_hash,
            Channel::Overrides => &mut self.overrides_hash,
            Channel::ExposedProperties => &mut self.exposed_properties_hash,
            Channel::VariableUsage => &mut self.variable_usage_hash,
            Channel::VariableDefinition => &mut self.variable_definition_hash,
            Channel::Interactions => &mut self.interactions_hash,
        }
    }
}

/// Raw payloads behind the channel fingerprints, kept for display only
///
/// These never take part in change detection. The differ reads them to
/// render before/after values through the display table in
/// [`display`](crate::display).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fills: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strokes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_definition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<Value>,
}

impl ChannelValues {
    /// Payload for `channel`, if one was recorded
    pub fn get(&self, channel: Channel) -> Option<&Value> {
        match channel {
            Channel::Fills => self.fills.as_ref(),
            Channel::Strokes => self.strokes.as_ref(),
            Channel::Effects => self.effects.as_ref(),
            Channel::Layout => self.layout.as_ref(),
            Channel::Geometry => self.geometry.as_ref(),
            Channel::Appearance => self.appearance.as_ref(),
            Channel::Border => self.border.as_ref(),
            Channel::Typography => self.typography.as_ref(),
            Channel::Structure => self.structure.as_ref(),
            Channel::ComponentProperties => self.component_properties.as_ref(),
            Channel::Overrides => self.overrides.as_ref(),
            Channel::ExposedProperties => self.exposed_properties.as_ref(),
            Channel::VariableUsage => self.variable_usage.as_ref(),
            Channel::VariableDefinition => self.variable_definition.as_ref(),
            Channel::Interactions => self.interactions.as_ref(),
        }
    }

    /// Record the payload for `channel`
    pub fn set(&mut self, channel: Channel, value: Option<Value>) {
        let slot = match channel {
            Channel::Fills => &mut self.fills,
            Channel::Strokes => &mut self.strokes,
            Channel::Effects => &mut self.effects,
            Channel::Layout => &mut self.layout,
            Channel::Geometry => &mut self.geometry,
            Channel::Appearance => &mut self.appearance,
            Channel::Border => &mut self.border,
            Channel::Typography => &mut self.typography,
            Channel::Structure => &mut self.structure,
            Channel::ComponentProperties => &mut self.component_properties,
            Channel::Overrides => &mut self.overrides,
            Channel::ExposedProperties => &mut self.exposed_properties,
            Channel::VariableUsage => &mut self.variable_usage,
            Channel::VariableDefinition => &mut self.variable_definition,
            Channel::Interactions => &mut self.interactions,
        };
        *slot = value;
    }

    /// True when no channel has a recorded payload
    pub fn is_empty(&self) -> bool {
        Channel::ALL.into_iter().all(|c| self.get(c).is_none())
    }
}
