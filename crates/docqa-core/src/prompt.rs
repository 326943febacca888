//! Question-answering prompt template.
//!
//! A template carries exactly the two slots `{context_str}` and `{query_str}`
//! (each may appear more than once). It is parsed once at construction and
//! formatted in a single pass, so slot markers inside the supplied context or
//! question are emitted verbatim rather than expanded.

use std::fs;
use std::path::Path;

use crate::config::{resolve_with_base, PromptSettings};
use crate::error::{Error, Result};

pub const CONTEXT_SLOT: &str = "{context_str}";
pub const QUERY_SLOT: &str = "{query_str}";

pub const DEFAULT_QA_TEMPLATE: &str = "Les informations contextuelles ci-dessous proviennent des documents.\n\
----------------------\n\
{context_str}\n\
----------------------\n\
En utilisant UNIQUEMENT les informations contextuelles ci-dessus, sans utiliser de connaissances antérieures, \
répondez à la question suivante de manière détaillée.\n\
NE FAITES PAS de distinction entre majuscules et minuscules.\n\
Il peut y avoir des erreurs de frappe dans la question.\n\
Répondez dans la même langue que la question.\n\
Si vous ne trouvez pas la réponse dans les informations fournies, dites simplement :\n\
Je ne trouve pas cette information dans les documents fournis.\n\
Ne tentez PAS d'inventer une réponse.\n\
Question: {query_str}\n\
Réponse: ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Context,
    Query,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Fails unless both slots are present.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let source = template.into();
        let segments = parse(&source);
        let missing: Vec<&str> = [(CONTEXT_SLOT, Segment::Context), (QUERY_SLOT, Segment::Query)]
            .into_iter()
            .filter(|(_, slot)| !segments.contains(slot))
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Template(format!("missing slot(s) {}", missing.join(", "))));
        }
        Ok(Self { source, segments })
    }

    /// Inline template, then template file, then the built-in default.
    pub fn from_settings(settings: &PromptSettings, base_dir: &Path) -> Result<Self> {
        if let Some(inline) = &settings.template {
            return Self::new(inline.clone());
        }
        if let Some(file) = &settings.template_file {
            let path = resolve_with_base(base_dir, file);
            let text = fs::read_to_string(&path)
                .map_err(|e| Error::Template(format!("cannot read {}: {}", path.display(), e)))?;
            return Self::new(text);
        }
        Ok(Self::default())
    }

    pub fn format(&self, context: &str, query: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + context.len() + query.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Context => out.push_str(context),
                Segment::Query => out.push_str(query),
            }
        }
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { source: DEFAULT_QA_TEMPLATE.to_string(), segments: parse(DEFAULT_QA_TEMPLATE) }
    }
}

fn parse(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;
    loop {
        let next = [(CONTEXT_SLOT, Segment::Context), (QUERY_SLOT, Segment::Query)]
            .into_iter()
            .filter_map(|(slot, segment)| rest.find(slot).map(|at| (at, slot.len(), segment)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, len, segment)) => {
                if at > 0 {
                    segments.push(Segment::Text(rest[..at].to_string()));
                }
                segments.push(segment);
                rest = &rest[at + len..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest.to_string()));
                }
                return segments;
            }
        }
    }
}
