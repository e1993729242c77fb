pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, hierarchy_line, info, muted, section, status, success, warn};
pub use progress::Spinner;
pub use table::{hierarchy_table, rows_table};
pub use theme::{theme, Theme};
