//! Dot-path access and template mapping for nested data
//!
//! Read and write nested maps, lists and records with paths like
//! `users.*.email`, and reshape whole documents with templates such as
//! `{"names": "{{ users.*.name | upper }}"}`.

pub mod accessor;
pub mod ast;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod mapper;
pub mod model;
pub mod mutator;
pub mod parser;
pub mod pipeline;
pub mod registry;

// Re-export main types
pub use accessor::{Accessor, Lookup};
pub use ast::{Expression, Path, ResolvedPath, Segment};
pub use config::{EngineConfig, MapperConfig};
pub use engine::{DataEngine, EngineCacheStats};
pub use error::{Error, Result};
pub use evaluator::{ExpressionEvaluator, WildcardMatches, WildcardResolver};
pub use mapper::{Mapping, MappingEngine, MappingHooks};
pub use model::{ContainerAdapter, Value};
pub use mutator::{Mutator, WritePolicy};
pub use parser::{ExpressionParser, PathParser, parse_expression, parse_path};
pub use pipeline::Pipeline;
pub use registry::{FilterRegistry, Transformer};
