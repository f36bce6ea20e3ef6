//! Panel controllers for the highlight pipeline.
//!
//! [`AnnotationPanel`] resolves annotation quotes against the active
//! original-language corpus and broadcasts highlight groups; the
//! [`ScripturePanel`] turns received groups into per-token colors and
//! republishes user clicks. Both are rendering-framework-free and talk only
//! through the [`glossa_bus::MessageHub`].

pub mod annotation_panel;
pub mod color;
pub mod filter;
pub mod scripture_panel;

pub use annotation_panel::{AnnotationPanel, PanelOptions, DEFAULT_DEBOUNCE_MS};
pub use color::{color_indices, DEFAULT_PALETTE_SIZE};
pub use filter::{stage1, ActiveFilterKind, AnnotationFilterEngine, FilterOutcome, FilterState};
pub use scripture_panel::ScripturePanel;
