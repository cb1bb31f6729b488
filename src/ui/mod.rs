//! UI-agnostic client-state core.
//!
//! The pieces a front-end shell composes to drive the schema-driven CRUD
//! workflow: per-form state (`form`), list/table state and cell rendering
//! (`list`), and transient alerts (`alerts`). Nothing here renders; a
//! shell maps this state onto widgets and calls back into it on events.

pub mod alerts;
pub mod form;
pub mod list;

pub use alerts::{Alert, AlertLevel, Alerts};
pub use form::{CloseOutcome, FormState, GuardianEditor};
pub use list::{render_cell, row_affordance, ListState, RowAffordance};
