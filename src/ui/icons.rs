pub struct Icons;

impl Icons {
    pub const DOCUMENT: &str = "📄";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const TABLE: &str = "📋";
    pub const SAVE: &str = "💾";
    pub const BRANCH: &str = "└─";
    pub const CLOCK: &str = "⏱️";
}
