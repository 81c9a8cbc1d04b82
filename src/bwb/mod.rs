pub mod loader;

pub use loader::{load_bwb_file, parse_bwb};

/// Property names used by the BWB WFS layer
pub mod keys {
    pub const NUMBER: &str = "trinkbrunnennummer";
    pub const TYPE: &str = "typ";
    pub const STREET: &str = "strasse";
    pub const INSTALLED: &str = "einbaujahr";
    pub const STATUS: &str = "betriebszustand";
    pub const OWNER: &str = "eigentuemer";
}
