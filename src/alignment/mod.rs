pub mod anchors;
pub mod canonical;
pub mod layout;
pub mod report;
