//! Hierarchical addressing into the solver's data tree

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hierarchical address of a named value inside the solver's data tree.
///
/// Paths are ordered name sequences such as
/// `Data/Streams/S1AOUT/Output/MOLEFLOW/MIXED/N-BUT-01`. They are built
/// through the constructor functions in this module rather than ad hoc
/// string concatenation, so every address the environments touch is a
/// pure function of entity names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityPath(Vec<String>);

impl EntityPath {
    /// Build a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The ordered segments of the path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Extend the path by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A block port: where streams attach to a unit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Port {
    /// Feed inlet, `F(IN)` in the data tree.
    FeedIn,
    /// Product outlet, `P(OUT)` in the data tree.
    ProductOut,
}

impl Port {
    /// The port's name in the data tree.
    #[must_use]
    pub fn node_name(self) -> &'static str {
        match self {
            Self::FeedIn => "F(IN)",
            Self::ProductOut => "P(OUT)",
        }
    }
}

/// The container holding every stream.
#[must_use]
pub fn streams() -> EntityPath {
    EntityPath::new(["Data", "Streams"])
}

/// The container holding every block.
#[must_use]
pub fn blocks() -> EntityPath {
    EntityPath::new(["Data", "Blocks"])
}

/// Solved mole flow of one chemical at a stream, `kmol/s`.
#[must_use]
pub fn stream_moleflow(stream: &str, chemical: &str) -> EntityPath {
    EntityPath::new([
        "Data", "Streams", stream, "Output", "MOLEFLOW", "MIXED", chemical,
    ])
}

/// A scalar input spec of a stream (`TEMP`, `PRES`, `TOTFLOW`, `NPHASE`, `PHASE`).
#[must_use]
pub fn stream_input(stream: &str, field: &str) -> EntityPath {
    EntityPath::new(["Data", "Streams", stream, "Input", field, "MIXED"])
}

/// Input flow spec of one chemical in a stream, `kmol/s`.
#[must_use]
pub fn stream_component_flow(stream: &str, chemical: &str) -> EntityPath {
    EntityPath::new(["Data", "Streams", stream, "Input", "FLOW", "MIXED", chemical])
}

/// A block port container; stream names added here connect the stream.
#[must_use]
pub fn block_port(block: &str, port: Port) -> EntityPath {
    EntityPath::new(["Data", "Blocks", block, "Ports", port.node_name()])
}

/// The controllable temperature input of a block, `K`.
#[must_use]
pub fn block_temp(block: &str) -> EntityPath {
    EntityPath::new(["Data", "Blocks", block, "Input", "TEMP"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_segments() {
        let path = stream_moleflow("S1AOUT", "N-BUT-01");
        assert_eq!(
            path.to_string(),
            "Data/Streams/S1AOUT/Output/MOLEFLOW/MIXED/N-BUT-01"
        );
    }

    #[test]
    fn port_paths_use_tree_names() {
        assert_eq!(
            block_port("B1A", Port::FeedIn).to_string(),
            "Data/Blocks/B1A/Ports/F(IN)"
        );
        assert_eq!(
            block_port("B1A", Port::ProductOut).to_string(),
            "Data/Blocks/B1A/Ports/P(OUT)"
        );
    }

    #[test]
    fn child_extends_without_mutating() {
        let base = blocks();
        let extended = base.child("TC1");
        assert_eq!(base.segments().len(), 2);
        assert_eq!(extended.to_string(), "Data/Blocks/TC1");
    }
}
