//! Per-tick trace lines.
//!
//! Handlers push what they saw and decided; the tick flushes everything to
//! the logger once it ends, successful or not. Nothing here feeds back into
//! control flow.

/// Lines collected during one tick.
#[derive(Debug, Default)]
pub struct ActionLog {
    lines: Vec<String>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Take every collected line, leaving the log empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_clears() {
        let mut log = ActionLog::new();
        log.push("[market] price: 100");
        log.push(String::from("[balances] base/quote: 5/500"));
        assert_eq!(log.lines().len(), 2);

        let lines = log.drain();
        assert_eq!(lines[0], "[market] price: 100");
        assert!(log.is_empty());
        assert!(log.drain().is_empty());
    }
}
