pub mod directory;
pub mod fs;
mod record;
pub mod template;

pub use directory::{load_document, load_tree, save_document};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use record::{DocumentSettings, ItemRecord, LoadError};
pub use template::{BuiltinTemplates, DirectoryTemplates, Template, TemplateError, TemplateLoader};
