use indicatif::{ProgressBar, ProgressStyle};
use summa::{Progress, Stage};

const TEMPLATE: &str = "{spinner:.green} {msg:>11} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// One indicatif bar per stage, counting chunks.
#[derive(Default)]
pub struct ChunkBars {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl ChunkBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bars that track positions without drawing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self { bar: None, hidden: true }
    }

    #[cfg(test)]
    pub fn position(&self) -> Option<(u64, Option<u64>)> {
        self.bar.as_ref().map(|bar| (bar.position(), bar.length()))
    }
}

fn label(stage: Stage) -> &'static str {
    match stage {
        Stage::Generation => "generating",
        Stage::References => "references",
    }
}

impl Progress for ChunkBars {
    fn start(&mut self, stage: Stage, chunks: usize) {
        let bar = if self.hidden { ProgressBar::hidden() } else { ProgressBar::new(chunks as u64) };
        bar.set_length(chunks as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(label(stage));
        self.bar = Some(bar);
    }

    fn advance(&mut self, _stage: Stage, _rows: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&mut self, stage: Stage) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!("{} done", label(stage)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_count_chunks_per_stage() {
        let mut bars = ChunkBars::hidden();
        assert_eq!(bars.position(), None);

        bars.start(Stage::Generation, 3);
        bars.advance(Stage::Generation, 2);
        bars.advance(Stage::Generation, 2);
        assert_eq!(bars.position(), Some((2, Some(3))));
        bars.advance(Stage::Generation, 1);
        bars.finish(Stage::Generation);
        assert_eq!(bars.position(), Some((3, Some(3))));

        bars.start(Stage::References, 3);
        assert_eq!(bars.position(), Some((0, Some(3))));
    }
}
