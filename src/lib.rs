pub mod graph;
pub mod pipeline;
pub mod sast;
pub mod symbols;
pub mod toolchain;

// Re-export commonly used types
pub use graph::{Graph, GraphBuilder};
pub use sast::{DeclaredAt, NodeKind, Position, SastNode};
pub use symbols::{DefInfo, SymbolTable};
pub use toolchain::{Toolchain, TypeInfo};
