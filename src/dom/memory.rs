//! In-memory document: a flat list of elements matched by [`SelectorList`]

use super::selector::{CompoundSelector, SelectorList};
use super::Document;
use crate::Result;

/// Handle to an element of a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct MemoryElement {
    tag: String,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    text: String,
}

impl MemoryElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    fn matches(&self, step: &CompoundSelector) -> bool {
        if let Some(tag) = &step.tag {
            if !self.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &step.id {
            if self.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        let classes = self.classes();
        if step.classes.iter().any(|c| !classes.contains(&c.as_str())) {
            return false;
        }
        step.attrs
            .iter()
            .all(|cond| cond.matches(self.attribute(cond.key())))
    }
}

/// Element description used to populate a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct ElementSpec {
    element: MemoryElement,
}

impl ElementSpec {
    /// Element with the given tag name.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            element: MemoryElement {
                tag: tag.into().to_ascii_lowercase(),
                ..MemoryElement::default()
            },
        }
    }

    /// Set the id attribute.
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add a class token.
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let joined = match self.element.attribute("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.element.set_attribute("class", &joined);
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.element.set_attribute(name, value);
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.element.text = text.into();
        self
    }
}

/// Flat in-memory document.
///
/// There is no tree: selectors are compound-only, so document order is
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: Vec<MemoryElement>,
}

impl MemoryDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element, returning its handle.
    pub fn push(&mut self, spec: ElementSpec) -> NodeId {
        self.elements.push(spec.element);
        NodeId(self.elements.len() - 1)
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, spec: ElementSpec) -> Self {
        self.push(spec);
        self
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First element with the given id.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements
            .iter()
            .position(|e| e.attribute("id") == Some(id))
            .map(NodeId)
    }

    /// Text content of an element.
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.elements.get(node.0).map(|e| e.text.as_str())
    }

    /// Inline style property of an element.
    #[must_use]
    pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        self.elements.get(node.0).and_then(|e| {
            e.style
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Class tokens of an element.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.elements
            .get(node.0)
            .map(|e| e.classes().into_iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether an element carries a class token.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut MemoryElement> {
        self.elements.get_mut(node.0)
    }
}

impl Document for MemoryDocument {
    type Element = NodeId;

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| list.groups().iter().any(|step| e.matches(step)))
            .map(|(i, _)| NodeId(i))
            .collect())
    }

    fn element_id(&self, element: &NodeId) -> Option<String> {
        self.attribute(element, "id").filter(|id| !id.is_empty())
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.elements
            .get(element.0)
            .and_then(|e| e.attribute(name))
            .map(ToString::to_string)
    }

    fn set_style_property(&mut self, element: &NodeId, name: &str, value: &str) -> Result<()> {
        if let Some(e) = self.element_mut(*element) {
            match e.style.iter_mut().find(|(k, _)| k == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => e.style.push((name.to_string(), value.to_string())),
            }
        }
        Ok(())
    }

    fn set_text_content(&mut self, element: &NodeId, text: &str) {
        if let Some(e) = self.element_mut(*element) {
            e.text = text.to_string();
        }
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<()> {
        if let Some(e) = self.element_mut(*element) {
            e.set_attribute(name, value);
        }
        Ok(())
    }

    fn add_class(&mut self, element: &NodeId, class: &str) -> Result<()> {
        if let Some(e) = self.element_mut(*element) {
            let mut classes: Vec<String> = e.classes().into_iter().map(ToString::to_string).collect();
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
                e.set_attribute("class", &classes.join(" "));
            }
        }
        Ok(())
    }

    fn remove_class(&mut self, element: &NodeId, class: &str) -> Result<()> {
        if let Some(e) = self.element_mut(*element) {
            let remaining: Vec<&str> = e.classes().into_iter().filter(|c| *c != class).collect();
            let joined = remaining.join(" ");
            e.set_attribute("class", &joined);
        }
        Ok(())
    }
}
