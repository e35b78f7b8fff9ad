//! Dependency Algorithms
//!
//! Traversals over the "consumes from" relation: each node points at the
//! nodes returned by [`NodeBase::input_nodes`].
//!
//! All traversals use an explicit stack, so very deep graphs cannot exhaust
//! the call stack.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::NodeBase;
use crate::error::Result;

/// Whether `ancestor` is, directly or transitively, an input to `node`.
///
/// A node is not its own ancestor.
pub fn is_dependent_on(ancestor: &dyn NodeBase, node: &dyn NodeBase) -> bool {
    let target = ancestor.subscriber_id();
    let mut visited = HashSet::new();
    let mut stack = node.input_nodes();

    while let Some(current) = stack.pop() {
        let id = current.subscriber_id();
        if id == target {
            return true;
        }
        if visited.insert(id) {
            stack.extend(current.input_nodes());
        }
    }
    false
}

/// Feed input `input` of `consumer` from output `output` of `producer`.
///
/// Same as [`NodeBase::connect`]; refuses any edge that would close a cycle.
pub fn connect(
    consumer: &dyn NodeBase,
    producer: &dyn NodeBase,
    input: usize,
    output: usize,
) -> Result<()> {
    consumer.connect(producer, input, output)
}

/// The nodes that must be evaluated to bring `root` up to date, producers
/// first.
///
/// Valid nodes are left out together with everything upstream of them: a
/// Valid node only ever has Valid producers.
pub fn evaluation_order(root: Rc<dyn NodeBase>) -> Vec<Rc<dyn NodeBase>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    // (node, inputs already pushed)
    let mut stack = vec![(root, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if node.is_valid() || !visited.insert(node.subscriber_id()) {
            continue;
        }
        let inputs = node.input_nodes();
        stack.push((node, true));
        stack.extend(
            inputs
                .into_iter()
                .filter(|input| !visited.contains(&input.subscriber_id()))
                .map(|input| (input, false)),
        );
    }
    order
}

/// Evaluate `root` after everything it depends on.
///
/// Returns the number of nodes that were recomputed.
pub fn execute_node(root: Rc<dyn NodeBase>) -> Result<usize> {
    let order = evaluation_order(root);
    for node in &order {
        node.evaluate()?;
    }
    debug!(evaluated = order.len(), "executed");
    Ok(order.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Constant, InputRefs, Node, Process};

    struct Add;

    impl Process for Add {
        type Inputs = (i32, i32);
        type Outputs = (i32,);

        fn process(&self, (a, b): InputRefs<'_, Self>) -> Self::Outputs {
            (a + b,)
        }
    }

    #[test]
    fn dependencies_follow_inputs() {
        let n1 = Node::new(Constant::new(150));
        let n2 = Node::new(Constant::new(-54));
        let add = Node::new(Add);
        let top = Node::new(Add);
        connect(&*add, &*n1, 0, 0).unwrap();
        connect(&*add, &*n2, 1, 0).unwrap();
        connect(&*top, &*add, 0, 0).unwrap();

        assert!(!is_dependent_on(&*n1, &*n2));
        assert!(!is_dependent_on(&*n2, &*n1));
        assert!(is_dependent_on(&*n1, &*add));
        assert!(is_dependent_on(&*n2, &*add));
        assert!(is_dependent_on(&*n1, &*top));
        assert!(is_dependent_on(&*n2, &*top));
        assert!(!is_dependent_on(&*top, &*n1));
        assert!(!is_dependent_on(&*add, &*add));
    }

    #[test]
    fn order_puts_producers_first() {
        let n = Node::new(Constant::new(1));
        let left = Node::new(Add);
        let right = Node::new(Add);
        let top = Node::new(Add);
        left.connect(&*n, 0, 0).unwrap();
        left.connect(&*n, 1, 0).unwrap();
        right.connect(&*n, 0, 0).unwrap();
        right.connect(&*left, 1, 0).unwrap();
        top.connect(&*left, 0, 0).unwrap();
        top.connect(&*right, 1, 0).unwrap();

        let order: Vec<_> = evaluation_order(top.clone())
            .iter()
            .map(|node| node.subscriber_id())
            .collect();
        let position = |id| order.iter().position(|o| *o == id).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(n.subscriber_id()) < position(left.subscriber_id()));
        assert!(position(left.subscriber_id()) < position(right.subscriber_id()));
        assert!(position(right.subscriber_id()) < position(top.subscriber_id()));
    }

    #[test]
    fn execute_skips_valid_nodes() {
        let n1 = Node::new(Constant::new(2));
        let n2 = Node::new(Constant::new(3));
        let add = Node::new(Add);
        add.connect(&*n1, 0, 0).unwrap();
        add.connect(&*n2, 1, 0).unwrap();

        assert_eq!(execute_node(add.clone()).unwrap(), 3);
        assert_eq!(*add.outputs().0.get_data().unwrap(), 5);
        assert_eq!(execute_node(add.clone()).unwrap(), 0);

        n2.update(|c| c.set_value(10));
        assert_eq!(execute_node(add.clone()).unwrap(), 2);
        assert_eq!(*add.outputs().0.get_data().unwrap(), 12);
    }

    #[test]
    fn execute_fails_on_missing_input() {
        let n = Node::new(Constant::new(2));
        let add = Node::new(Add);
        add.connect(&*n, 0, 0).unwrap();

        assert_eq!(
            execute_node(add.clone()),
            Err(crate::PipelineError::NotReady)
        );
        // the producer still got evaluated
        assert!(n.is_valid());
    }
}
