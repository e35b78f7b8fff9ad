//! Constant source node.

use super::node::{InputRefs, Process};

/// A source that outputs a copy of a stored value.
///
/// Change the value through [`Node::update`](super::Node::update) so that
/// the node and everything downstream is invalidated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant<T> {
    value: T,
}

impl<T> Constant<T> {
    /// Create a constant holding `value`.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// The stored value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Clone + 'static> Process for Constant<T> {
    type Inputs = ();
    type Outputs = (T,);

    fn process(&self, _: InputRefs<'_, Self>) -> Self::Outputs {
        (self.value.clone(),)
    }
}
