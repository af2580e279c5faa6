pub mod connect;
pub mod data;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod id;
pub mod layout;
pub mod lint;
pub mod model;
pub mod path;
pub mod registry;
pub mod selection;
pub mod transform;
pub mod tree;

pub use connect::{ConnectOptions, ConnectionIndex, create_connect_line, refresh_connect_lines};
pub use data::{DiagramData, Document, copy_diagrams, paste_diagrams};
pub use error::{DataError, GeometryError, ModelError};
pub use geometry::{Bounds, OrientedBox, Point};
pub use hit::{diagrams_in_rect, hit_test};
pub use id::DiagramId;
pub use lint::{LintDiagnostic, LintSeverity, lint_diagrams};
pub use model::*;
pub use path::{PathCmd, build_path, path_to_svg_d};
pub use registry::DiagramRegistry;
pub use selection::{StackOrderChange, cleanup_groups, get_selected_diagrams};
pub use transform::{calculate_transformed_center, propagate_transform};
