//! Picking one record out of an ambiguous search.
//!
//! A selector sees the results and answers with a key; the chosen record is
//! then moved out of the results, so nothing is shared between the two.
use crate::lookup::CustomerRecord;
use crate::lookup::LookupOutcome;
use crate::lookup::SearchResults;
use std::io::BufRead;
use std::io::Write;
use tracing::debug;
use tracing::warn;

pub trait Selector {
    /// Chooses one key of `results`, `None` to cancel.
    fn select(&mut self, results: &SearchResults) -> Option<String>;
}

/// Picks the n-th result (1-based), for non-interactive use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSelector(pub usize);

impl Selector for IndexSelector {
    fn select(&mut self, results: &SearchResults) -> Option<String> {
        let index = self.0.checked_sub(1)?;
        results.keys().nth(index).map(str::to_owned)
    }
}

/// Lists the results on `writer` and reads the chosen number from `reader`.
/// An empty answer or end of input cancels.
pub struct PromptSelector<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        PromptSelector { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn prompt(&mut self, results: &SearchResults) -> std::io::Result<Option<String>> {
        writeln!(self.writer, "找到 {} 位匹配的客户:", results.len())?;
        for (number, (key, record)) in results.iter().enumerate() {
            writeln!(
                self.writer,
                "{:>3}. {}  {}  {}  {}",
                number + 1,
                key,
                record.phone,
                record.address,
                record.extra
            )?;
        }

        loop {
            write!(self.writer, "请输入编号 (1-{}, 回车取消): ", results.len())?;
            self.writer.flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(number) if (1..=results.len()).contains(&number) => {
                    return Ok(IndexSelector(number).select(results));
                }
                _ => writeln!(self.writer, "无效的编号: {answer}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Selector for PromptSelector<R, W> {
    fn select(&mut self, results: &SearchResults) -> Option<String> {
        match self.prompt(results) {
            Ok(choice) => choice,
            Err(error) => {
                warn!(%error, "selection prompt failed");
                None
            }
        }
    }
}

/// Turns a search outcome into at most one record, asking `selector` when ambiguous.
pub fn resolve(outcome: LookupOutcome, selector: &mut dyn Selector) -> Option<CustomerRecord> {
    match outcome {
        LookupOutcome::NoMatch => None,
        LookupOutcome::Unique(record) => Some(record),
        LookupOutcome::Ambiguous(mut results) => {
            let key = selector.select(&results)?;
            debug!(key = %key, "record selected");
            results.take(&key)
        }
    }
}
