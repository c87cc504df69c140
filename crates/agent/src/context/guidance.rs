//! Reading guidance by document type.
//!
//! A cheap keyword check over the start of a document picks one of a few
//! known kinds. Each kind adds a short paragraph telling the model what to
//! look for. Kinds are checked in declaration order; the first match wins.

/// Characters inspected when classifying a document.
pub const PREVIEW_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ResearchPaper,
    Business,
    Legal,
    TechnicalManual,
}

impl DocumentKind {
    const ALL: [DocumentKind; 4] = [
        Self::ResearchPaper,
        Self::Business,
        Self::Legal,
        Self::TechnicalManual,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::ResearchPaper => &["abstract", "methodology", "references", "hypothesis", "research"],
            Self::Business => &["revenue", "profit", "strategy", "market", "business plan"],
            Self::Legal => &["contract", "agreement", "legal", "clause", "terms"],
            Self::TechnicalManual => &["procedure", "manual", "installation", "configuration", "technical"],
        }
    }

    /// Classify a document by keywords in its first [`PREVIEW_CHARS`] characters.
    pub fn detect(text: &str) -> Option<Self> {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect::<String>().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|kw| preview.contains(kw)))
    }

    pub fn guidance(self) -> &'static str {
        match self {
            Self::ResearchPaper => {
                "The document looks like a research paper. When answering, identify the \
                 research question, summarize the method and findings, and mention stated \
                 limitations."
            }
            Self::Business => {
                "The document looks like a business document. When answering, pull out key \
                 metrics and objectives, strategic recommendations, financial implications, \
                 and action items."
            }
            Self::Legal => {
                "The document looks like a legal document. When answering, point to the \
                 relevant provisions, parties, dates and obligations, and note that this is \
                 not legal advice."
            }
            Self::TechnicalManual => {
                "The document looks like technical documentation. When answering, focus on \
                 procedures, specifications and requirements, and call out safety warnings."
            }
        }
    }
}
