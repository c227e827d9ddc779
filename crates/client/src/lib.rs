//! Offline cache manager for shellcache.
//!
//! This crate provides the network seam, the cache lifecycle controller, the
//! request router with its serving strategies, fallback responses, and the
//! [`Registration`] that ties them together for the server.

pub mod batch;
pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod registration;
pub mod router;

pub use batch::{join_all, join_best_effort};
pub use fetch::{CacheMode, Destination, FetchConfig, HttpNetwork, Network, Request, RequestMode, Response};
pub use lifecycle::{
    ActivateReport, CacheNames, CacheUpdate, Controller, InstallReport, Manifest, Phase, UpdateReport,
};
pub use messages::{ControlMessage, MessageOutcome};
pub use notify::{ClickOutcome, Notification, NotificationAction, PushPayload};
pub use registration::{RegisterReport, Registration, RegistrationStatus, VersionStatus};
pub use router::{Route, Router, Served, Source};
