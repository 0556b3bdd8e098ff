mod file_mode;
mod io_gate;

pub use file_mode::{is_executable, EXEC_MASK, EXEC_MODE, FILE_MODE, SYMLINK_MODE};
pub use io_gate::{DirEntryInfo, FileContent, IoGate};
