//! Modification Applier
//!
//! Applies [`Modification`]s to every element their selector matches. A
//! selector matching nothing is a normal outcome (the experiment is not on
//! this page).

use crate::catalog::{ClassAction, Modification, ModificationKind};
use crate::dom::Document;
use crate::Result;

/// Normalise a style property name to CSS form: `backgroundColor` →
/// `background-color`. Names already containing `-` pass through.
#[must_use]
pub fn css_property_name(property: &str) -> String {
    if property.contains('-') {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for ch in property.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Apply one modification to one element.
///
/// Class-toggle modifications with an action other than `add`/`remove` do
/// nothing.
///
/// # Errors
/// Returns `Error::Dom` if the host document rejects the change
pub fn apply_to_element<D: Document + ?Sized>(
    doc: &mut D,
    element: &D::Element,
    modification: &Modification,
) -> Result<()> {
    match modification.kind() {
        ModificationKind::StyleProperty => doc.set_style_property(
            element,
            &css_property_name(modification.property()),
            modification.value(),
        ),
        ModificationKind::TextContent => {
            doc.set_text_content(element, modification.value());
            Ok(())
        }
        ModificationKind::Attribute => {
            doc.set_attribute(element, modification.property(), modification.value())
        }
        ModificationKind::ClassToggle => match modification.class_action() {
            Some(ClassAction::Add) => doc.add_class(element, modification.value()),
            Some(ClassAction::Remove) => doc.remove_class(element, modification.value()),
            None => Ok(()),
        },
    }
}

/// Apply a modification to every element its selector matches.
///
/// Returns the matched elements (possibly none).
///
/// # Errors
/// Returns `Error::UnsupportedSelector` for a selector the document cannot
/// evaluate, or the first `Error::Dom` raised while applying
pub fn apply<D: Document + ?Sized>(
    doc: &mut D,
    modification: &Modification,
) -> Result<Vec<D::Element>> {
    let elements = doc.query_selector_all(modification.selector())?;
    for element in &elements {
        apply_to_element(doc, element, modification)?;
    }
    Ok(elements)
}
