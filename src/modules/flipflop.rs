#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Remembers the previous level of a line and reports transitions.
#[derive(Copy, Clone, Debug, Default)]
pub struct EdgeDetector {
    prev: bool,
}

impl EdgeDetector {
    pub fn new(initial: bool) -> Self {
        EdgeDetector { prev: initial }
    }

    pub fn level(&self) -> bool {
        self.prev
    }

    pub fn update(&mut self, level: bool) -> Option<Edge> {
        let prev = std::mem::replace(&mut self.prev, level);

        match (prev, level) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        }
    }
}
