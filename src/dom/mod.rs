//! DOM abstraction
//!
//! The engine never touches a concrete document. Anything implementing
//! [`Document`] can host experiments: the in-memory [`MemoryDocument`] (tests,
//! server-side prerender) or, on wasm, the live browser document.

mod memory;
pub mod selector;

pub use memory::{ElementSpec, MemoryDocument, NodeId};
pub use selector::{IdHint, SelectorList};

use crate::Result;

/// Attribute stamped on modified elements listing the owning experiment IDs
/// (space separated).
pub const EXPERIMENTS_ATTRIBUTE: &str = "data-ab-experiments";

/// Host document the engine queries and mutates.
///
/// Element handles are cheap clones. Mutating methods take `&mut self` so
/// in-memory documents need no interior mutability.
pub trait Document {
    /// Element handle
    type Element: Clone;

    /// Every element matching a selector, in document order.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedSelector` if the selector cannot be parsed
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Element id (`None` when absent or empty).
    fn element_id(&self, element: &Self::Element) -> Option<String>;

    /// Attribute value.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Set an inline style property (CSS name, e.g. `background-color`).
    ///
    /// # Errors
    /// Returns `Error::Dom` if the host rejects the property
    fn set_style_property(&mut self, element: &Self::Element, name: &str, value: &str)
        -> Result<()>;

    /// Replace the element's text content.
    fn set_text_content(&mut self, element: &Self::Element, text: &str);

    /// Set an attribute.
    ///
    /// # Errors
    /// Returns `Error::Dom` for names the host rejects
    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str) -> Result<()>;

    /// Add a class token.
    ///
    /// # Errors
    /// Returns `Error::Dom` for tokens the host rejects
    fn add_class(&mut self, element: &Self::Element, class: &str) -> Result<()>;

    /// Remove a class token.
    ///
    /// # Errors
    /// Returns `Error::Dom` for tokens the host rejects
    fn remove_class(&mut self, element: &Self::Element, class: &str) -> Result<()>;
}

/// Experiment IDs stamped on an element.
pub fn stamped_experiments<D: Document + ?Sized>(doc: &D, element: &D::Element) -> Vec<String> {
    doc.attribute(element, EXPERIMENTS_ATTRIBUTE)
        .map(|raw| raw.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}

/// Add an experiment ID to an element's stamp (no duplicates).
///
/// # Errors
/// Returns `Error::Dom` if the attribute cannot be written
pub fn stamp_experiment<D: Document + ?Sized>(
    doc: &mut D,
    element: &D::Element,
    experiment_id: &str,
) -> Result<()> {
    let mut owners = stamped_experiments(doc, element);
    if owners.iter().any(|owner| owner == experiment_id) {
        return Ok(());
    }
    owners.push(experiment_id.to_string());
    doc.set_attribute(element, EXPERIMENTS_ATTRIBUTE, &owners.join(" "))
}
