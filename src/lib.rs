//! azstack core library.
//!
//! Loads a `Stackfile` describing the Azure resources behind a Django app,
//! builds a validated resource graph from it and renders that graph as a
//! Pulumi YAML program, a Graphviz view or an apply plan. The [`runner`]
//! module hands the program to the `pulumi` executable.

pub mod ast;
pub mod cli;
pub mod dot_gen;
pub mod hasher;
pub mod ir;
pub mod manifest;
pub mod program_gen;
pub mod runner;
pub mod secrets;
