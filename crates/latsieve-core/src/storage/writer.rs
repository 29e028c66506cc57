//! Append-only writer for the relations file.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// What to do with a final record that has no terminating newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingRecord {
    /// Copy it verbatim and count it (the siever finished normally).
    Keep,
    /// Discard it (the siever died, the record may be cut short).
    Drop,
}

/// Handle to the cumulative relations file. Opened in append mode; only the
/// controller holds one.
pub struct ResultStore {
    file: File,
    path: PathBuf,
    compressed: bool,
}

impl ResultStore {
    /// Open (or create) the store at `path`. Existing content is kept.
    pub fn open(path: &Path, compressed: bool) -> Result<Self> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open relations file: {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            compressed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Current length in bytes (compressed length for `.gz` stores).
    pub fn len(&self) -> Result<u64> {
        let meta = self
            .file
            .metadata()
            .with_context(|| format!("stat {}", self.path.display()))?;
        Ok(meta.len())
    }

    /// Cut the store back to `len` bytes, discarding anything appended after
    /// the checkpoint that recorded that length.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .with_context(|| format!("truncate {} to {} bytes", self.path.display(), len))?;
        self.sync()
    }

    /// Start appending one batch. Call `finish` on the returned appender,
    /// then `sync` before checkpointing.
    pub fn begin_batch(&mut self) -> BatchAppender<'_> {
        let buffered = BufWriter::new(&self.file);
        let sink = if self.compressed {
            Sink::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Sink::Plain(buffered)
        };
        BatchAppender { sink, records: 0 }
    }

    /// Flush file data to disk.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .with_context(|| format!("sync {}", self.path.display()))
    }
}

enum Sink<'a> {
    Plain(BufWriter<&'a File>),
    Gzip(GzEncoder<BufWriter<&'a File>>),
}

impl Write for Sink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// What one `append_file` call copied.
#[derive(Debug)]
pub struct Appended {
    /// Records written to the relations file.
    pub records: u64,
    /// Why the source could not be read to the end, if it could not.
    pub read_error: Option<io::Error>,
}

/// Appends the per-unit files of one batch, in the order they are given.
pub struct BatchAppender<'a> {
    sink: Sink<'a>,
    records: u64,
}

impl BatchAppender<'_> {
    /// Append every record of `src`. A record is a `\n`-terminated line;
    /// the final unterminated one is handled per `trailing`.
    ///
    /// Failing to open or read `src` is reported in the returned `Appended`,
    /// keeping the complete records read before the failure. Only writes to
    /// the relations file are errors.
    pub fn append_file(&mut self, src: &Path, trailing: TrailingRecord) -> Result<Appended> {
        let f = match File::open(src) {
            Ok(f) => f,
            Err(e) => {
                return Ok(Appended {
                    records: 0,
                    read_error: Some(e),
                })
            }
        };
        let mut reader = BufReader::new(f);
        let mut line = Vec::with_capacity(256);
        let mut records = 0u64;
        let mut read_error = None;
        loop {
            line.clear();
            let n = match reader.read_until(b'\n', &mut line) {
                Ok(n) => n,
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            };
            if n == 0 {
                break;
            }
            if line.last() != Some(&b'\n') && trailing == TrailingRecord::Drop {
                tracing::warn!(
                    path = %src.display(),
                    bytes = line.len(),
                    "dropping incomplete trailing record"
                );
                break;
            }
            self.sink.write_all(&line).context("append to relations file")?;
            records += 1;
        }
        self.records += records;
        Ok(Appended {
            records,
            read_error,
        })
    }

    /// Flush buffered data (and close the gzip member). Returns the batch's record count.
    pub fn finish(self) -> Result<u64> {
        match self.sink {
            Sink::Plain(mut w) => w.flush().context("flush relations file")?,
            Sink::Gzip(enc) => {
                let mut w = enc.finish().context("finish gzip member")?;
                w.flush().context("flush relations file")?;
            }
        }
        Ok(self.records)
    }
}
