//! Widget capability traits and the reference widgets built on them.

pub mod flex;
pub mod group;
pub mod rectangle;
pub mod widget;

pub use flex::{column, row, CrossAxisAlignment, Flex, MainAxisAlignment};
pub use group::Group;
pub use rectangle::{rectangle, RectVertex, Rectangle};
pub use widget::{Color, Drawable, GeometryCx, Layout, Widget, WidgetProps};
