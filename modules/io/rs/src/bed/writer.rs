use std::io::Write;
use std::path::Path;

use eyre::Result;

use super::record::Bed6;
use crate::compression::{self, CompressedStream};
use crate::WriteRecord;

pub struct Writer<W> {
    writer: W,
}

impl<W: Write> Writer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Writer<CompressedStream> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(compression::write_file(path)?))
    }

    pub fn finish(self) -> Result<()> {
        self.writer.finish()
    }
}

impl<W: Write> WriteRecord for Writer<W> {
    type Record = Bed6;

    fn write_record(&mut self, record: &Bed6) -> Result<()> {
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.seqid,
            record.start,
            record.end,
            record.name,
            record.score,
            record.orientation
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
