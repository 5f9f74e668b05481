use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tails a JSON-lines perception feed.
///
/// Only newline-terminated lines are consumed; a partially written last line
/// stays in the file until its writer finishes it.
pub struct FeedTailer {
    file: File,
    position: u64,
    path: PathBuf,
}

impl FeedTailer {
    pub fn open(path: impl AsRef<Path>, from_start: bool) -> io::Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)?;
        let position = if from_start { 0 } else { file.metadata()?.len() };
        Ok(Self {
            file,
            position,
            path: path_ref.to_path_buf(),
        })
    }

    pub fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let len = self.file.metadata()?.len();
        if len < self.position {
            // Truncated or replaced in place
            log::info!("Feed {} shrank, reading from start", self.path.display());
            self.position = 0;
        }

        let mut lines = Vec::new();

        self.file.seek(SeekFrom::Start(self.position))?;
        let mut reader = BufReader::new(&self.file);
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            let bytes_read = reader.read_until(b'\n', &mut buffer)?;
            if bytes_read == 0 || buffer.last() != Some(&b'\n') {
                break;
            }
            self.position += bytes_read as u64;
            // Invalid UTF-8 is kept (lossily) so the frame parser rejects that line alone
            let line = String::from_utf8_lossy(&buffer);
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
        }

        Ok(lines)
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.position = 0;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
