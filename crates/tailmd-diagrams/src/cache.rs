//! Diagram cache key computation.

use sha2::{Digest, Sha256};

/// Everything that affects a rendered diagram.
#[derive(Debug, Clone, Copy)]
pub struct DiagramKey<'a> {
    /// Diagram source code.
    pub source: &'a str,
    /// Kroki endpoint (e.g., "plantuml", "mermaid").
    pub endpoint: &'a str,
}

impl DiagramKey<'_> {
    /// Hex SHA-256 of `"{endpoint}:svg:{source}"`.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!("{}:svg:{}", self.endpoint, self.source);
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_key_hash() {
        let key1 = DiagramKey {
            source: "A -> B",
            endpoint: "plantuml",
        };
        let key2 = DiagramKey { ..key1 };
        let key3 = DiagramKey {
            source: "C -> D",
            ..key1
        };

        assert_eq!(key1.compute_hash(), key2.compute_hash());
        assert_ne!(key1.compute_hash(), key3.compute_hash());
        assert_eq!(key1.compute_hash().len(), 64);
        assert!(key1.compute_hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_diagram_key_endpoint_matters() {
        let mermaid = DiagramKey {
            source: "graph TD; A-->B",
            endpoint: "mermaid",
        };
        let dot = DiagramKey {
            endpoint: "graphviz",
            ..mermaid
        };
        assert_ne!(mermaid.compute_hash(), dot.compute_hash());
    }
}
