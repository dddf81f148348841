use super::Widget;

/// A widget with no capabilities of its own. Useful as a transform parent, a
/// clip boundary or the scene root.
#[derive(Debug, Default, Clone, Copy)]
pub struct Group;

impl Widget for Group {}
