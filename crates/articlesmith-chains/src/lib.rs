//! The thirteen prompt chains driving article generation.
//!
//! Every chain is a pure `(prompt_template, tier, parser)` triple; none of
//! them know about the orchestrator's state machine, retry policy, or
//! progress events above them.

pub mod chain;
pub mod classifier;
pub mod closing;
pub mod hallucination;
pub mod lead;
pub mod outline;
pub mod parser;
pub mod prompt;
pub mod query_gen;
pub mod rewriter;
pub mod section;
pub mod style_analyzer;
pub mod style_checker;
pub mod structure_analyzer;
pub mod title;

pub use chain::{effective_tier, Chain, JSON_ONLY_SYSTEM_PREAMBLE};
pub use classifier::ClassifierChain;
pub use closing::{ClosingGeneratorChain, ClosingInput, GeneratedClosing};
pub use hallucination::{HallucinationDetectorChain, HallucinationInput};
pub use lead::{GeneratedLead, LeadGeneratorChain, LeadInput};
pub use outline::{OutlineGeneratorChain, OutlineInput};
pub use parser::InputParserChain;
pub use query_gen::{keyword_join_fallback, GeneratedQuery, QueryGenInput, QueryGeneratorChain};
pub use rewriter::{should_rewrite, AutoRewriterChain, RewriteInput, RewrittenDraft};
pub use section::{SectionGeneratorChain, SectionInput};
pub use style_analyzer::StyleAnalyzerChain;
pub use style_checker::{StyleCheckInput, StyleCheckerChain};
pub use structure_analyzer::StructureAnalyzerChain;
pub use title::{GeneratedTitles, TitleGeneratorChain, TitleInput};
