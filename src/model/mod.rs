//! Data model for nested heterogeneous values
//!
//! This module provides the [`Value`] sum type, the container shapes it can
//! hold and the [`ContainerAdapter`] capability every traversal and write
//! goes through.

#![warn(missing_docs)]

pub mod adapter;
pub mod collection;
pub mod record;
pub mod type_coercion;
pub mod value;

pub use adapter::{ContainerAdapter, ContainerKind, CustomContainer, parse_index};
pub use collection::Collection;
pub use record::{Record, RecordSchema};
pub use type_coercion::{CoercionError, CoercionResult, TypeCoercion};
pub use value::{Map, Value};
