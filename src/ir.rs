//! Intermediate representation of a stack.
//!
//! A [`ResourceGraph`] is the validated, engine-agnostic form of a
//! `Stackfile`: one [`ResourceNode`] per declaration, with properties whose
//! cross-resource values are deferred [`Output`]s. Generators turn it into an
//! engine program, a DOT view or an apply plan.
//!
//! # Examples
//!
//! ```
//! use azstack::ir::{Attribute, Property, ResourceGraph, ResourceKind, ResourceNode};
//!
//! let mut graph = ResourceGraph::new("demo", "dev");
//! graph.nodes.insert("rg".into(), ResourceNode::new("rg", ResourceKind::ResourceGroup));
//! let mut id = ResourceNode::new("id", ResourceKind::ManagedIdentity);
//! id.properties
//!     .insert("resourceGroupName".into(), Property::attribute("rg", Attribute::Name));
//! id.dependencies.push("rg".into());
//! graph.nodes.insert("id".into(), id);
//! assert!(graph.validate().is_ok());
//! ```

mod cycle;
mod from_manifest;
mod graph;
mod kind;
mod order;
mod output;
mod preview;
mod rules;

pub use from_manifest::BuildContext;
pub use graph::{IrGenError, Property, ResourceGraph, ResourceNode, Violation};
pub use kind::{Attribute, ResourceKind, UnknownAttributeName};
pub use order::{Wave, apply_waves, teardown_waves};
pub use output::{AttrRef, AttributeSource, InterpolationError, Output, Resolution, Segment};
pub use preview::PreviewAttributes;
