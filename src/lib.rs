//! Workspace root package.
//!
//! Holds workspace-level tooling such as the `rusty-hook` pre-commit
//! configuration. The gateway itself lives in the crates under `crates/`.
