//! Project and asset storage for Dreamright.
//!
//! A project is a directory holding a `project.json` plus an `assets/`
//! tree of generated images and their metadata sidecars:
//!
//! ```text
//! my-project/
//! ├── project.json
//! └── assets/
//!     ├── characters/
//!     │   └── mina-park/
//!     │       ├── portrait.png
//!     │       └── portrait.json
//!     ├── locations/
//!     │   └── rooftop-cafe/
//!     │       ├── day.png
//!     │       └── day.json
//!     └── panels/
//!         └── chapter-1/
//!             └── scene-1/
//!                 ├── panel-1.png
//!                 └── panel-1.json
//! ```
//!
//! Asset paths stored in `project.json` are relative to `assets/` so
//! project directories stay portable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod json_storage;
mod manager;
mod slug;

pub use json_storage::JsonStorage;
pub use manager::ProjectManager;
pub use slug::slugify;
