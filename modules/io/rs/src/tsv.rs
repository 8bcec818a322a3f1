use std::fmt::Display;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;

use eyre::{ensure, Result};
use itertools::Itertools;

use crate::compression::{self, CompressedStream};
use crate::WriteRecord;

/// Tab-delimited writer for records that render themselves as a single line via `Display`.
pub struct Writer<W, R> {
    writer: W,
    written: usize,
    _phantom: PhantomData<R>,
}

impl<W: Write, R> Writer<W, R> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            _phantom: PhantomData,
        }
    }

    /// Write a `#`-prefixed header line. Must precede the first record.
    pub fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        ensure!(
            self.written == 0,
            "The header must be written before any record"
        );
        writeln!(self.writer, "#{}", columns.iter().join("\t"))?;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<R> Writer<CompressedStream, R> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(compression::write_file(path)?))
    }

    /// Close the file, completing the gzip stream if there is one.
    pub fn finish(self) -> Result<()> {
        self.writer.finish()
    }
}

impl<W: Write, R: Display> WriteRecord for Writer<W, R> {
    type Record = R;

    fn write_record(&mut self, record: &R) -> Result<()> {
        writeln!(self.writer, "{}", record)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
