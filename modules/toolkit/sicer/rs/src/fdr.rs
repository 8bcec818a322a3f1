use eyre::Result;

use crate::error::Error;
use crate::island::Island;

/// Benjamini-Hochberg step-up adjustment.
///
/// The p-values are ranked in ascending order (ties keep their input order), each one is scaled by
/// `n / rank`, and the running minimum is taken from the largest rank downwards so that the result
/// is monotone in the p-value. Values are capped at 1 and returned in the input order.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let total = pvalues.len();
    let mut order = (0..total).collect::<Vec<_>>();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));

    let mut adjusted = vec![0.0; total];
    let mut running = 1.0f64;
    for (rank, &ind) in order.iter().enumerate().rev() {
        let scaled = pvalues[ind] * total as f64 / (rank + 1) as f64;
        running = running.min(scaled);
        adjusted[ind] = running;
    }
    adjusted
}

/// Write the BH-adjusted p-value of every island into its `fdr` field.
/// All islands must be scored; the correction is applied jointly over the whole collection.
pub fn correct<'a>(islands: impl IntoIterator<Item = &'a mut Island>) -> Result<()> {
    let mut islands = islands.into_iter().collect::<Vec<_>>();

    let mut pvalues = Vec::with_capacity(islands.len());
    for island in islands.iter() {
        match island.pvalue {
            Some(pvalue) => pvalues.push(pvalue),
            None => {
                return Err(Error::Unscored {
                    chrom: island.chrom.to_string(),
                    start: island.start,
                    end: island.end,
                }
                .into())
            }
        }
    }

    for (island, fdr) in islands.iter_mut().zip(benjamini_hochberg(&pvalues)) {
        island.fdr = Some(fdr);
    }
    Ok(())
}
