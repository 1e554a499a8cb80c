//! Host collaborator interfaces
//!
//! Everything this crate needs from the simulation client goes through the
//! traits here. Host-owned memory is never addressed by raw offset outside
//! [`view`]; interception points are resolved once by [`hooks`] into a
//! [`HostCapabilities`] before any session logic runs.
//!
//! - [`ReplayModule`] - the host's duty recorder, as a typed interface
//! - [`PacketSink`] - where captured packets are written while recording
//! - [`ContentTypeLookup`], [`AccountProvider`], [`ConditionFlags`] - ambient host state

pub mod hooks;
mod module;
pub mod view;

pub use hooks::{
    BytePatch, HookError, HookHandle, HookPoint, HostCapabilities, Signature,
    SignatureResolver,
};
pub use module::{
    AccountProvider, ClientCommand, ConditionFlag, ConditionFlags, ContentTypeLookup, Host,
    PacketSink, ReplayModule,
};
