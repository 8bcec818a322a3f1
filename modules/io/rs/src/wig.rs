//! Variable-step WIG tracks.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use derive_getters::Dissolve;
use derive_more::Constructor;
use eyre::{ensure, Result};

use crate::compression::{self, CompressedStream};
use crate::WriteRecord;

/// Value of a single step starting at a 0-based coordinate.
#[derive(Clone, PartialEq, Debug, Constructor, Dissolve)]
pub struct Step {
    pub chrom: Arc<str>,
    pub start: u64,
    pub value: f64,
}

/// Writes steps of a fixed span. Steps of one chromosome must be consecutive, a new
/// `variableStep` section starts whenever the chromosome changes.
pub struct Writer<W> {
    writer: W,
    span: u64,
    chrom: Option<Arc<str>>,
}

impl<W: Write> Writer<W> {
    /// Write the track line of a track called `name`.
    pub fn new(mut writer: W, name: &str, span: u64) -> Result<Self> {
        ensure!(span > 0, "WIG span must be positive");
        ensure!(
            !name.contains(char::is_whitespace),
            "WIG track name can't contain whitespace: {name:?}"
        );
        writeln!(writer, "track type=wiggle_0 name={name}")?;
        Ok(Self {
            writer,
            span,
            chrom: None,
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Writer<CompressedStream> {
    pub fn from_path(path: impl AsRef<Path>, name: &str, span: u64) -> Result<Self> {
        Self::new(compression::write_file(path)?, name, span)
    }

    pub fn finish(self) -> Result<()> {
        self.writer.finish()
    }
}

impl<W: Write> WriteRecord for Writer<W> {
    type Record = Step;

    fn write_record(&mut self, step: &Step) -> Result<()> {
        if self.chrom.as_deref() != Some(step.chrom.as_ref()) {
            writeln!(
                self.writer,
                "variableStep chrom={} span={}",
                step.chrom, self.span
            )?;
            self.chrom = Some(step.chrom.clone());
        }
        // WIG positions are 1-based
        writeln!(self.writer, "{}\t{}", step.start + 1, step.value)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(chrom: &str, start: u64, value: f64) -> Step {
        Step::new(Arc::from(chrom), start, value)
    }

    #[test]
    fn test_sections_per_chromosome() -> Result<()> {
        let mut writer = Writer::new(Vec::new(), "sample-W200", 200)?;
        writer.write_records(&[
            step("chr1", 0, 1.5),
            step("chr1", 400, 12.0),
            step("chrX", 200, 0.25),
        ])?;
        writer.flush()?;

        let content = String::from_utf8(writer.into_inner())?;
        assert_eq!(
            content,
            "track type=wiggle_0 name=sample-W200\n\
             variableStep chrom=chr1 span=200\n\
             1\t1.5\n\
             401\t12\n\
             variableStep chrom=chrX span=200\n\
             201\t0.25\n"
        );
        Ok(())
    }

    #[test]
    fn test_empty_track() -> Result<()> {
        let writer = Writer::new(Vec::new(), "empty", 50)?;
        assert_eq!(writer.into_inner(), b"track type=wiggle_0 name=empty\n");
        Ok(())
    }

    #[test]
    fn test_invalid_track() {
        assert!(Writer::new(Vec::new(), "two words", 200).is_err());
        assert!(Writer::new(Vec::new(), "track", 0).is_err());
    }

    #[test]
    fn test_gzip_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("track.wig.gz");
        let mut writer = Writer::from_path(&path, "gz", 100)?;
        writer.write_record(&step("chr2", 100, 3.0))?;
        writer.finish()?;

        let mut content = String::new();
        std::io::Read::read_to_string(
            &mut compression::read_file(&path)?.box_bufread(),
            &mut content,
        )?;
        assert_eq!(
            content,
            "track type=wiggle_0 name=gz\nvariableStep chrom=chr2 span=100\n101\t3\n"
        );
        Ok(())
    }
}
