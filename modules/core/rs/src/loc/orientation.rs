use std::fmt::Display;
use std::str::FromStr;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use eyre::{bail, Report, Result};

/// Strand of a read or a feature in the genome
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i8)]
pub enum Orientation {
    /// Forward (positive, Watson) strand.
    Forward,
    /// Reverse (negative, Crick) strand.
    Reverse,
    /// Unstranded or both strands.
    #[default]
    Dual,
}

impl Orientation {
    /// BED-style symbol of the orientation.
    pub fn symbol(&self) -> char {
        match self {
            Orientation::Forward => '+',
            Orientation::Reverse => '-',
            Orientation::Dual => '.',
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<char> for Orientation {
    type Error = Report;

    fn try_from(value: char) -> Result<Self> {
        match value {
            '+' => Ok(Orientation::Forward),
            '-' => Ok(Orientation::Reverse),
            '.' | '=' => Ok(Orientation::Dual),
            _ => bail!("Unknown strand symbol: {value:?}"),
        }
    }
}

impl FromStr for Orientation {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => Orientation::try_from(symbol),
            _ => bail!("Strand must be a single symbol, got {s:?}"),
        }
    }
}
