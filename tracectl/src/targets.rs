// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of the tracing targets of every crate of the binary

use crate::LevelFilter;
use linkme::distributed_slice;

/// How a target was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// a module path, named by [`trace_target!`]
    Module,
    /// an arbitrary target, e.g. of a third-party crate, from [`custom_target!`]
    Custom,
}

/// A target declaration, collected in [`TRACING_TARGETS`]
pub struct TargetDecl {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) kind: TargetKind,
}

impl TargetDecl {
    #[must_use]
    pub const fn module(
        module: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target: module,
            name,
            level,
            tags,
            kind: TargetKind::Module,
        }
    }

    #[must_use]
    pub const fn custom(
        target: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name: target,
            level,
            tags,
            kind: TargetKind::Custom,
        }
    }
}

#[distributed_slice]
pub static TRACING_TARGETS: [TargetDecl];

#[doc(hidden)]
#[macro_export]
macro_rules! trace_target_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{TRACING_TARGETS, TargetDecl};
    };
}

/// Declare the calling module as a tracing target, with a short name, a default level and tags.
///
/// The caller needs `linkme` among its dependencies.
#[macro_export]
macro_rules! trace_target {
    // a const scope keeps the imports away from the caller's
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static DECL: TargetDecl = TargetDecl::module(module_path!(), $name, $level, $tags);
        };
    };
}

/// Declare a target which is not a module of ours
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static DECL: TargetDecl = TargetDecl::custom($target, $level, $tags);
        };
    };
}
