use std::io::BufRead;
use std::path::Path;

use eyre::{ensure, OptionExt, Result, WrapErr};

use super::record::Bed6;
use crate::compression;
use crate::ReadRecord;

pub mod parse {
    use super::*;
    use isle_core_rs::loc::Orientation;

    pub fn seqid<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<String> {
        let seqid = parts.next().ok_or_eyre("Missing BED seqid")?;
        ensure!(!seqid.is_empty(), "Empty BED seqid");
        Ok(seqid.to_owned())
    }

    pub fn coordinates<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<(u64, u64)> {
        let start = parts.next().ok_or_eyre("Missing BED start")?;
        let start = start.parse::<u64>().wrap_err("Invalid BED start")?;

        let end = parts.next().ok_or_eyre("Missing BED end")?;
        let end = end.parse::<u64>().wrap_err("Invalid BED end")?;
        Ok((start, end))
    }

    pub fn name<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<String> {
        let name = parts.next().ok_or_eyre("Missing BED name")?;
        Ok(name.to_owned())
    }

    pub fn score<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<f64> {
        let score = parts.next().ok_or_eyre("Missing BED score")?;
        let score = score.parse::<f64>().wrap_err("Invalid BED score")?;
        ensure!(score.is_finite(), "BED score must be finite");
        Ok(score)
    }

    pub fn orientation<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<Orientation> {
        let orientation = parts.next().ok_or_eyre("Missing BED strand")?;
        orientation.parse().wrap_err("Invalid BED strand")
    }

    pub fn bed6<'a>(parts: &mut impl Iterator<Item = &'a str>, into: &mut Bed6) -> Result<()> {
        into.seqid = seqid(parts)?;
        (into.start, into.end) = coordinates(parts)?;
        into.name = name(parts)?;
        into.score = score(parts)?;
        into.orientation = orientation(parts)?;
        Ok(())
    }
}

fn is_header(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

pub struct Reader<R> {
    reader: R,
    buffer: String,
    line: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            line: 0,
        }
    }
}

impl Reader<Box<dyn BufRead + Send + Sync + 'static>> {
    /// Open a BED file, plain or gzip-compressed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = compression::read_file(path)
            .wrap_err_with(|| format!("Failed to open BED file {}", path.display()))?;
        Ok(Self::new(stream.box_bufread()))
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Bed6;

    fn read_record(&mut self, into: &mut Bed6) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || is_header(line) {
                continue;
            }

            let mut parts = line.split('\t');
            parse::bed6(&mut parts, into).wrap_err_with(|| {
                format!("Failed to parse BED record at line {}: {}", self.line, line)
            })?;
            ensure!(
                parts.next().is_none(),
                "BED record at line {} has more than 6 fields: {}",
                self.line,
                line
            );
            return Ok(true);
        }
    }
}
