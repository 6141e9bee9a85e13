//! Diagram languages rendered through Kroki.

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramLanguage {
    PlantUml,
    C4PlantUml,
    Mermaid,
    GraphViz,
    D2,
    Ditaa,
    BlockDiag,
    SeqDiag,
    ActDiag,
    NwDiag,
    Erd,
    Nomnoml,
    Svgbob,
    Vega,
    VegaLite,
    WaveDrom,
}

/// Kroki endpoint per language, in enum order.
const ENDPOINTS: &[(DiagramLanguage, &str)] = &[
    (DiagramLanguage::PlantUml, "plantuml"),
    (DiagramLanguage::C4PlantUml, "c4plantuml"),
    (DiagramLanguage::Mermaid, "mermaid"),
    (DiagramLanguage::GraphViz, "graphviz"),
    (DiagramLanguage::D2, "d2"),
    (DiagramLanguage::Ditaa, "ditaa"),
    (DiagramLanguage::BlockDiag, "blockdiag"),
    (DiagramLanguage::SeqDiag, "seqdiag"),
    (DiagramLanguage::ActDiag, "actdiag"),
    (DiagramLanguage::NwDiag, "nwdiag"),
    (DiagramLanguage::Erd, "erd"),
    (DiagramLanguage::Nomnoml, "nomnoml"),
    (DiagramLanguage::Svgbob, "svgbob"),
    (DiagramLanguage::Vega, "vega"),
    (DiagramLanguage::VegaLite, "vegalite"),
    (DiagramLanguage::WaveDrom, "wavedrom"),
];

/// Fence names that differ from the endpoint.
const ALIASES: &[(&str, DiagramLanguage)] = &[
    ("puml", DiagramLanguage::PlantUml),
    ("dot", DiagramLanguage::GraphViz),
];

impl DiagramLanguage {
    /// Parse the language word of a fence info string.
    ///
    /// Accepts endpoint names (`mermaid`), a few aliases (`dot`, `puml`) and
    /// `kroki-` prefixed names (`kroki-mermaid`). Matching is case-insensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("kroki-").unwrap_or(&lower);

        ENDPOINTS
            .iter()
            .find(|(_, endpoint)| *endpoint == name)
            .map(|(lang, _)| *lang)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, lang)| *lang)
            })
    }

    /// Kroki endpoint name for this diagram type.
    #[must_use]
    pub fn kroki_endpoint(self) -> &'static str {
        ENDPOINTS[self as usize].1
    }
}
