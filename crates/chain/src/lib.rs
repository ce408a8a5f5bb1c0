//! # DPoS Chain Core Library
//!
//! Ledger state and the chain maintenance engine of a delegated
//! proof-of-stake chain.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `state` | `ChainState`: accounts, balances, assets, candidates, globals |
//! | `params` | Consensus parameters, upgrade schedule, TOML config |
//! | `error` | `MaintenanceError`, fatal pass errors |
//! | `maintenance` | The per-interval pass and its phases |
//! | `maintenance::stake` | Voting stake of an account |
//! | `maintenance::tally` | Per-slot vote totals and set-size histograms |
//! | `maintenance::election` | Witness and committee selection |
//! | `maintenance::son` | SON selection, wallets, SON pay |
//! | `maintenance::authority` | Multisig authorities from vote totals |
//! | `maintenance::special_authority` | Top-holder controlled authorities |
//! | `maintenance::budget` | Treasury budget and supply change |
//! | `maintenance::worker` | Worker votes and pay |
//! | `maintenance::dividend` | Dividend scheduling and payouts |
//! | `maintenance::fba` | Fee-backed asset splits |
//!
//! ## Determinism
//!
//! Every node must reach the same state from the same block. The engine
//! therefore uses integer arithmetic only, with `u128`/`i128`
//! intermediates and explicit truncation, and iterates `BTreeMap`s in key
//! order.
//!
//! ## Usage
//!
//! ```text
//! let cfg = ChainConfig::load("chain.toml")?;
//! let mut state = ChainState::new(cfg.parameters, cfg.schedule, max_supply);
//! for block in blocks {
//!     if let Some(report) = maybe_perform_maintenance(&mut state, block.num, block.time)? {
//!         // publish report
//!     }
//! }
//! ```

pub mod error;
pub mod maintenance;
pub mod params;
pub mod state;

pub use error::{MaintenanceError, MaintenanceResult};
pub use maintenance::authority::{Authority, AuthorityWeighting};
pub use maintenance::election::Role;
pub use maintenance::{
    maybe_perform_maintenance, next_maintenance_time, perform_chain_maintenance,
    MaintenancePhase, MaintenanceReport,
};
pub use params::{ChainConfig, GlobalParameters, ProtocolSchedule};
pub use state::ChainState;
