//! Inline bar strip of transactions per block

use crate::domain::BlockRecord;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One bar per block, oldest on the left. `blocks` is newest-first, as the
/// feeds hold it.
pub fn tx_activity(blocks: &[BlockRecord], width: usize) -> String {
    let counts: Vec<usize> = blocks.iter().take(width).map(|b| b.tx_count).rev().collect();
    let Some(&max) = counts.iter().max() else {
        return String::new();
    };
    let max = max.max(1);

    counts
        .iter()
        .map(|&count| {
            let scaled = ((count as f64 / max as f64) * 7.0).round() as usize;
            BARS[scaled.min(7)]
        })
        .collect()
}
