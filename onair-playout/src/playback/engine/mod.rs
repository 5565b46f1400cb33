//! Playout engine module
//!
//! **Module Structure:**
//! - `core.rs`: Construction, channel runtimes, effect application, ticker restart
//! - `commands.rs`: Session commands, player notifications, status overrides
//! - `queries.rs`: Current program, upcoming, session and status queries

mod commands;
mod core;
mod queries;

pub use self::commands::PlayoutCommand;
pub use self::core::PlayoutEngine;
pub(crate) use self::core::{ChannelRuntime, EffectSink};
pub use self::queries::{ChannelOverview, CurrentProgram};
