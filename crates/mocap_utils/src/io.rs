use std::{
    fs::File,
    io::{BufReader, Result},
    path::Path,
};
pub struct FileLoader {}
impl FileLoader {
    /// Opens a file for buffered reading
    /// # Errors
    /// Returns the underlying io error if the path cannot be opened
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<BufReader<File>> {
        File::open(file_path).map(BufReader::new)
    }
}
