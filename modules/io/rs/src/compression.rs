use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

pub enum DecompressedStream {
    PlainText(File),
    Gzip(MultiGzDecoder<File>),
}

impl DecompressedStream {
    pub fn box_bufread(self) -> Box<dyn BufRead + Send + Sync + 'static> {
        match self {
            DecompressedStream::PlainText(file) => Box::new(BufReader::new(file)),
            DecompressedStream::Gzip(decoder) => Box::new(BufReader::new(decoder)),
        }
    }
}

/// Open a file for reading, transparently decompressing gzip content.
/// The compression is detected from the file signature, not from the extension.
pub fn read_file(path: impl AsRef<Path>) -> Result<DecompressedStream> {
    let path = path.as_ref();
    ensure!(path.exists(), "File {} does not exist", path.display());

    let kind = infer::get_from_path(path)
        .wrap_err_with(|| format!("Failed to sniff the file type of {}", path.display()))?;
    let file = File::open(path)?;

    let stream = match kind.map(|x| (x.extension(), x.mime_type())) {
        Some(("gz", "application/gzip")) => DecompressedStream::Gzip(MultiGzDecoder::new(file)),
        // Anything else is treated as plain text
        _ => DecompressedStream::PlainText(file),
    };
    Ok(stream)
}

pub enum CompressedStream {
    PlainText(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl CompressedStream {
    /// Flush the buffers and, for gzip, write the stream trailer. Dropping the stream without
    /// calling `finish` silently discards any error raised while closing it.
    pub fn finish(self) -> Result<()> {
        let mut inner = match self {
            CompressedStream::PlainText(writer) => writer,
            CompressedStream::Gzip(encoder) => encoder
                .finish()
                .wrap_err("Failed to finish the gzip stream")?,
        };
        inner.flush()?;
        Ok(())
    }
}

impl Write for CompressedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            CompressedStream::PlainText(writer) => writer.write(buf),
            CompressedStream::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            CompressedStream::PlainText(writer) => writer.flush(),
            CompressedStream::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Create a file for writing. Paths ending with `.gz` are gzip-compressed on the fly.
pub fn write_file(path: impl AsRef<Path>) -> Result<CompressedStream> {
    let path = path.as_ref();
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create {}", path.display()))?;

    let gzipped = path.extension().is_some_and(|ext| ext == "gz");
    let stream = if gzipped {
        CompressedStream::Gzip(GzEncoder::new(BufWriter::new(file), Compression::default()))
    } else {
        CompressedStream::PlainText(BufWriter::new(file))
    };
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn roundtrip(name: &str) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(name);
        let mut writer = write_file(&path)?;
        writer.write_all(b"chr1\t0\t10\n")?;
        writer.finish()?;

        let mut content = String::new();
        read_file(&path)?.box_bufread().read_to_string(&mut content)?;
        Ok(content)
    }

    #[test]
    fn test_plain_and_gzip_round_trip() -> Result<()> {
        assert_eq!(roundtrip("reads.bed")?, "chr1\t0\t10\n");
        assert_eq!(roundtrip("reads.bed.gz")?, "chr1\t0\t10\n");
        Ok(())
    }

    #[test]
    fn test_gzip_is_detected_by_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reads.bed.gz");
        let mut writer = write_file(&path)?;
        writer.write_all(b"payload")?;
        assert!(matches!(writer, CompressedStream::Gzip(_)));
        writer.finish()?;
        assert!(matches!(read_file(&path)?, DecompressedStream::Gzip(_)));

        let renamed = dir.path().join("reads.txt");
        std::fs::rename(&path, &renamed)?;
        assert!(matches!(read_file(&renamed)?, DecompressedStream::Gzip(_)));
        Ok(())
    }

    #[test]
    fn test_finish_after_flush() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rows.tsv.gz");

        let mut writer = write_file(&path)?;
        writer.write_all(b"x\t7\n")?;
        writer.flush()?;
        writer.write_all(b"y\t8\n")?;
        writer.finish()?;

        let mut content = String::new();
        read_file(&path)?.box_bufread().read_to_string(&mut content)?;
        assert_eq!(content, "x\t7\ny\t8\n");
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(read_file("/definitely/not/here.bed").is_err());
    }
}
