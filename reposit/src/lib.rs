//! reposit — a generic async repository layer over SQLx.
//!
//! This facade crate re-exports the reposit sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use reposit::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                         |
//! |-------------|---------|-------------------------------|
//! | `data`      | via `sqlite` | `reposit-data` (abstractions) |
//! | `data-sqlx` | via `sqlite` | `reposit-data-sqlx`      |
//! | `sqlite`    | **yes** | `reposit-data-sqlx/sqlite`    |
//! | `postgres`  | no      | `reposit-data-sqlx/postgres`  |

pub extern crate reposit_core;

// Re-export everything from reposit-core at the top level for convenience.
pub use reposit_core::*;

#[cfg(feature = "data")]
pub use reposit_data;

#[cfg(feature = "data-sqlx")]
pub use reposit_data_sqlx;

/// Unified prelude — import everything with `use reposit::prelude::*`.
pub mod prelude {
    pub use reposit_core::{init_tracing, DatabaseConfig, RepositConfig};

    #[cfg(feature = "data")]
    pub use reposit_data::prelude::*;

    #[cfg(feature = "data-sqlx")]
    pub use reposit_data_sqlx::prelude::*;
}
