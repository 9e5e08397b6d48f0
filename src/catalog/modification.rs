//! Modification - one DOM change a variant applies

use serde::{Deserialize, Serialize};

/// How a modification changes its matched elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModificationKind {
    /// Set an inline style property.
    #[serde(rename = "style")]
    StyleProperty,
    /// Replace the rendered text content.
    #[serde(rename = "text")]
    TextContent,
    /// Set an attribute.
    #[serde(rename = "attribute")]
    Attribute,
    /// Add or remove a class token (`property` holds the action).
    #[serde(rename = "class")]
    ClassToggle,
}

/// Action token carried in `property` by class-toggle modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassAction {
    /// `"add"`
    Add,
    /// `"remove"`
    Remove,
}

impl ClassAction {
    /// Parse an action token. Anything but `add`/`remove` is `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    /// Token as stored in the catalog.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

/// A single DOM modification.
///
/// `selector` may match zero or more elements; the change applies to all of
/// them. The meaning of `property` depends on [`ModificationKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    selector: String,
    property: String,
    value: String,
    #[serde(rename = "type")]
    kind: ModificationKind,
}

impl Modification {
    /// Create a modification of any kind.
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        kind: ModificationKind,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
            value: value.into(),
            kind,
        }
    }

    /// Inline style change, e.g. `("#hero-cta-primary", "backgroundColor", "#059669")`.
    #[must_use]
    pub fn style(
        selector: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(selector, ModificationKind::StyleProperty, property, value)
    }

    /// Text content replacement.
    #[must_use]
    pub fn text(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(selector, ModificationKind::TextContent, "textContent", value)
    }

    /// Attribute assignment.
    #[must_use]
    pub fn attribute(
        selector: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(selector, ModificationKind::Attribute, name, value)
    }

    /// Class toggle.
    #[must_use]
    pub fn class(selector: impl Into<String>, action: ClassAction, class: impl Into<String>) -> Self {
        Self::new(selector, ModificationKind::ClassToggle, action.as_str(), class)
    }

    /// Target selector.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Property, attribute name, or class action depending on kind.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Value to apply.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Modification kind.
    #[must_use]
    pub const fn kind(&self) -> ModificationKind {
        self.kind
    }

    /// Class action for class-toggle modifications; `None` for other kinds or
    /// unrecognised tokens.
    #[must_use]
    pub fn class_action(&self) -> Option<ClassAction> {
        match self.kind {
            ModificationKind::ClassToggle => ClassAction::parse(&self.property),
            _ => None,
        }
    }
}
