//! Data model: releases, tickets and method records.

mod method;
mod release;
mod ticket;

pub use method::MethodRecord;
pub use release::{normalize_version_name, order_releases, Release, ReleaseEntry};
pub use ticket::{FixVersion, Ticket};
