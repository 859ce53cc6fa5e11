use std::fmt::Write;

/// Waveform recorder for named single-bit signals.
///
/// Every snapshot appends one column per signal. Signals are listed in the order they were
/// first seen.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    names: Vec<(String, String)>,
    samples: usize,
    limit: Option<usize>,
}

impl Trace {
    pub fn new() -> Self {
        Trace::default()
    }

    /// Stops recording after `limit` snapshots
    pub fn with_limit(limit: usize) -> Self {
        Trace {
            limit: Some(limit),
            ..Trace::default()
        }
    }

    pub fn snapshot(&mut self, signals: &[(&str, bool)]) {
        if self.limit.map(|l| self.samples >= l).unwrap_or(false) {
            return;
        }

        for &(name, v) in signals {
            let index = match self.names.iter().position(|(n, _)| n == name) {
                Some(index) => index,
                None => {
                    // late signals are padded so columns stay aligned
                    self.names.push((name.to_owned(), "▁".repeat(self.samples)));
                    self.names.len() - 1
                },
            };

            self.names[index].1.push(if v { '█' } else { '▁' });
        }

        self.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Recorded levels of one signal, oldest first
    pub fn levels(&self, name: &str) -> Option<Vec<bool>> {
        self.names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, out)| out.chars().map(|c| c == '█').collect())
    }

    pub fn render(&self) -> String {
        let mut s = String::new();

        if self.names.is_empty() {
            s.push_str("(no signals)\n");
            return s;
        }

        let pad = self.names.iter().map(|(name, _)| name.len()).max().unwrap_or(0) + 1;

        for (name, out) in &self.names {
            let _ = writeln!(s, "{name:pad$}{out}", name=name, pad=pad, out=out);
        }

        s
    }

    pub fn show(&self) {
        print!("{}", self.render());
        println!("samples: {}", self.samples);
    }

    pub fn clear(&mut self) {
        for (_, out) in &mut self.names {
            out.clear();
        }

        self.samples = 0;
    }
}
