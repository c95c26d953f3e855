//! Request and response models.

mod file;
mod pagination;

pub use file::{CreateFileRequest, File, FOLDER_MIME_TYPE};
pub use pagination::{FileList, Paginated};
