// piglit-framework/src/platform/unix/mod.rs
//
//! Native window-system plumbing for Linux.

pub(crate) mod gbm;
pub(crate) mod wayland;
#[cfg(x11)]
pub(crate) mod x11;
