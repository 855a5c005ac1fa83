pub mod inspect;
pub mod new;
pub mod store;
pub mod validate;
pub mod widgets;

pub use inspect::{inspect, InspectArgs};
pub use new::{new_document, NewArgs};
pub use store::{pull, push, PullArgs, PushArgs};
pub use validate::{validate, ValidateArgs};
pub use widgets::widgets;

use std::path::Path;

/// Content id implied by a blob file name (`lessons/intro.json` → `intro`)
pub(crate) fn content_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}
