use eyre::Result;

/// Reader of structured records, modeled after `std::io::Read`.
pub trait ReadRecord {
    /// The type of the records that will be read.
    type Record;

    /// Read the next record into the provided buffer.
    /// Returns `false` once the input is exhausted; the buffer is left untouched in that case.
    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool>;

    /// Read all remaining records and append them to `into`. Returns the number of records read.
    fn read_to_end(&mut self, into: &mut Vec<Self::Record>) -> Result<usize>
    where
        Self::Record: Default,
    {
        let mut total = 0;
        loop {
            let mut record = Self::Record::default();
            if !self.read_record(&mut record)? {
                return Ok(total);
            }
            into.push(record);
            total += 1;
        }
    }
}

/// Writer of structured records, modeled after `std::io::Write`.
pub trait WriteRecord {
    type Record;

    /// Write a single record.
    fn write_record(&mut self, record: &Self::Record) -> Result<()>;

    /// Write all records in order, stopping at the first failure.
    fn write_records<'a>(&mut self, records: impl IntoIterator<Item = &'a Self::Record>) -> Result<()>
    where
        Self::Record: 'a,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush the output.
    fn flush(&mut self) -> Result<()>;
}
