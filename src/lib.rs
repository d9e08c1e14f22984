//! # Pickup Sheet
//!
//! Looks up a customer in a spreadsheet "database" and fills a pickup-slip
//! template with that customer and the shipment entered at generation time.
//!
//! ## Features
//!
//! - **Lookup engine**: substring search over one key column, capturing
//!   four-row customer blocks ([`lookup::RECORD_ROW_SPAN`])
//! - **Template projector**: writes the date, the customer, and the shipment
//!   into configured cells and saves a new workbook, leaving the template
//!   untouched
//! - **Layout as configuration**: sheet names, key column, and target cells
//!   come from a TOML file, so another template only needs another config
//! - **Pure Rust XLSX access**: worksheets are streamed with quick-xml out of
//!   the zip package; only the edited worksheet part is rewritten
//!
//! ## Flow
//!
//! ```text
//! keyword ──> find_matches ──> LookupOutcome ──(Selector)──> CustomerRecord
//!                                                                 │
//!          ShipmentInput + date ──> project_to_file <─────────────┘
//!                                        │
//!                                 OutputDocument ──> deliver_first
//! ```
//!
//! Every fault is a [`PickupError`] that ends the current action only; zero or
//! several hits are [`LookupOutcome`] variants rather than faults.
pub mod config;
pub mod delivery;
pub mod error;
pub(crate) mod helpers;
pub mod lookup;
pub mod naming;
pub mod selection;
pub mod service;
pub mod spreadsheet;
pub mod template;

pub use config::Config;
pub use error::PickupError;
pub use error::SheetError;
pub use lookup::find_matches;
pub use lookup::find_matches_in_file;
pub use lookup::CustomerRecord;
pub use lookup::LookupOutcome;
pub use lookup::SearchResults;
pub use lookup::RECORD_ROW_SPAN;
pub use service::PickupService;
pub use template::project;
pub use template::project_to_file;
pub use template::OutputDocument;
pub use template::ShipmentInput;
pub use template::Temperature;
pub use template::TemplateLayout;
