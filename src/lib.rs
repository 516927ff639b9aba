// flagrule - Rule-driven feature flag storage for Rust
//
// Flags are split into a global state per resource and a local list per actor,
// both kept as sets in a key-value store and combined by a pluggable rule.

// Re-export core functionality
pub use flagrule_core::*;

// Re-export optional crates
#[cfg(feature = "redis")]
pub use flagrule_redis;

// Prelude for common imports
pub mod prelude {
    pub use flagrule_core::prelude::*;
    pub use flagrule_core::{Evaluation, FlagAccessorBuilder, RuleBuilder, StoreType};
}
