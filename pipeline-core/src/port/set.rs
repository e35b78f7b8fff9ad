//! Port lists for tuples of value types.
//!
//! A node declares its inputs and outputs as tuples of value types, such as
//! `(i32, i32)` in and `(i32,)` out. The traits here turn such a tuple into
//! the matching tuple of ports, give indexed type-erased access to them, and
//! move values between ports and the node's process function.

use std::rc::{Rc, Weak};

use smallvec::{smallvec, SmallVec};

use super::{InputPort, InputPortBase, OutputPort, OutputPortBase, PlaceholderInput};
use crate::error::Result;
use crate::graph::NodeBase;

/// A tuple of input value types.
///
/// Implemented for `()` and for tuples of up to eight `'static` types.
pub trait InputSet: 'static {
    /// Number of declared inputs.
    const ARITY: usize;

    /// The ports backing this set.
    type Ports: Default + 'static;

    /// Shared handles to the current input values.
    type Values;

    /// References to the current input values, as passed to a process.
    type Refs<'a>
    where
        Self: 'a;

    /// The input port at `index`, if within the declared arity.
    fn port(ports: &Self::Ports, index: usize) -> Option<&dyn InputPortBase>;

    /// Every port, in order.
    ///
    /// A set with no inputs yields one [`PlaceholderInput`].
    fn ports(ports: &Self::Ports) -> SmallVec<[&dyn InputPortBase; 4]>;

    /// Collect the value of every input.
    fn values(ports: &Self::Ports) -> Result<Self::Values>;

    /// Borrow collected values.
    fn refs(values: &Self::Values) -> Self::Refs<'_>;
}

/// A non-empty tuple of output value types.
///
/// A process returns one value of this tuple per evaluation.
pub trait OutputSet: Sized + 'static {
    /// Number of declared outputs.
    const ARITY: usize;

    /// The ports backing this set.
    type Ports: 'static;

    /// Create empty ports owned by `owner`.
    fn create_ports(owner: &Weak<dyn NodeBase>) -> Self::Ports;

    /// The output port at `index`, if within the declared arity.
    fn port(ports: &Self::Ports, index: usize) -> Option<Rc<dyn OutputPortBase>>;

    /// Every port, in order.
    fn ports(ports: &Self::Ports) -> SmallVec<[&dyn OutputPortBase; 4]>;

    /// Move each value into its port.
    fn fill(ports: &Self::Ports, values: Self);
}

impl InputSet for () {
    const ARITY: usize = 0;
    type Ports = PlaceholderInput;
    type Values = ();
    type Refs<'a> = () where Self: 'a;

    fn port(_ports: &Self::Ports, _index: usize) -> Option<&dyn InputPortBase> {
        None
    }

    fn ports(ports: &Self::Ports) -> SmallVec<[&dyn InputPortBase; 4]> {
        smallvec![ports as &dyn InputPortBase]
    }

    fn values(_ports: &Self::Ports) -> Result<Self::Values> {
        Ok(())
    }

    fn refs(_values: &Self::Values) -> Self::Refs<'_> {}
}

macro_rules! impl_port_sets {
    ($arity:expr; $($T:ident $idx:tt),+) => {
        impl<$($T: 'static),+> InputSet for ($($T,)+) {
            const ARITY: usize = $arity;
            type Ports = ($(InputPort<$T>,)+);
            type Values = ($(Rc<$T>,)+);
            type Refs<'a> = ($(&'a $T,)+) where Self: 'a;

            fn port(ports: &Self::Ports, index: usize) -> Option<&dyn InputPortBase> {
                match index {
                    $($idx => Some(&ports.$idx as &dyn InputPortBase),)+
                    _ => None,
                }
            }

            fn ports(ports: &Self::Ports) -> SmallVec<[&dyn InputPortBase; 4]> {
                smallvec![$(&ports.$idx as &dyn InputPortBase),+]
            }

            fn values(ports: &Self::Ports) -> Result<Self::Values> {
                Ok(($(ports.$idx.get_data()?,)+))
            }

            fn refs(values: &Self::Values) -> Self::Refs<'_> {
                ($(&*values.$idx,)+)
            }
        }

        impl<$($T: 'static),+> OutputSet for ($($T,)+) {
            const ARITY: usize = $arity;
            type Ports = ($(Rc<OutputPort<$T>>,)+);

            fn create_ports(owner: &Weak<dyn NodeBase>) -> Self::Ports {
                ($(Rc::new(OutputPort::<$T>::new(owner.clone())),)+)
            }

            fn port(ports: &Self::Ports, index: usize) -> Option<Rc<dyn OutputPortBase>> {
                match index {
                    $($idx => Some(ports.$idx.clone() as Rc<dyn OutputPortBase>),)+
                    _ => None,
                }
            }

            fn ports(ports: &Self::Ports) -> SmallVec<[&dyn OutputPortBase; 4]> {
                smallvec![$(&*ports.$idx as &dyn OutputPortBase),+]
            }

            fn fill(ports: &Self::Ports, values: Self) {
                $(ports.$idx.fill_data(values.$idx);)+
            }
        }
    };
}

impl_port_sets!(1; A 0);
impl_port_sets!(2; A 0, B 1);
impl_port_sets!(3; A 0, B 1, C 2);
impl_port_sets!(4; A 0, B 1, C 2, D 3);
impl_port_sets!(5; A 0, B 1, C 2, D 3, E 4);
impl_port_sets!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_port_sets!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_port_sets!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_set_uses_placeholder() {
        let ports = PlaceholderInput;
        assert_eq!(<() as InputSet>::ARITY, 0);
        assert!(<() as InputSet>::port(&ports, 0).is_none());

        let all = <() as InputSet>::ports(&ports);
        assert_eq!(all.len(), 1);
        assert!(all[0].is_connected());
    }

    #[test]
    fn input_ports_are_indexed_in_order() {
        type Set = (i32, String, f64);
        let ports: <Set as InputSet>::Ports = Default::default();

        assert_eq!(<Set as InputSet>::ARITY, 3);
        assert_eq!(<Set as InputSet>::ports(&ports).len(), 3);
        assert!(<Set as InputSet>::port(&ports, 2).is_some());
        assert!(<Set as InputSet>::port(&ports, 3).is_none());
        assert!(<Set as InputSet>::values(&ports).is_err());
    }
}
