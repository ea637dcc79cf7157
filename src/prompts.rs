//! System prompt registry.
//!
//! Prompts live as Markdown files in the `prompts/` directory at the project
//! root so they can be tuned without recompiling; every prompt also carries a
//! built-in default used when the file is absent (tests, containers).

use std::path::PathBuf;

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Knowledge triple extraction (JSON array of start/relation/end).
    TripleExtraction,
    /// One-sentence factual image description.
    ImageDescription,
    /// Single-paragraph document summary.
    Summarizer,
    /// Natural language to read-only Cypher translation.
    CypherGeneration,
    /// Short answer synthesis over retrieved rows.
    AnswerSynthesis,
}

impl Prompt {
    /// Prompt file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::TripleExtraction => "triple_extraction.md",
            Prompt::ImageDescription => "image_description.md",
            Prompt::Summarizer => "summarizer.md",
            Prompt::CypherGeneration => "cypher_generation.md",
            Prompt::AnswerSynthesis => "answer_synthesis.md",
        }
    }

    /// Built-in default text.
    pub fn default_text(&self) -> &'static str {
        match self {
            Prompt::TripleExtraction => TRIPLE_EXTRACTION,
            Prompt::ImageDescription => IMAGE_DESCRIPTION,
            Prompt::Summarizer => SUMMARIZER,
            Prompt::CypherGeneration => CYPHER_GENERATION,
            Prompt::AnswerSynthesis => ANSWER_SYNTHESIS,
        }
    }

    /// Load the prompt from its file, falling back to the built-in text.
    pub fn load(&self) -> String {
        let path = prompts_dir().join(self.filename());
        std::fs::read_to_string(&path).unwrap_or_else(|_| self.default_text().to_string())
    }
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("prompts"),
        PathBuf::from("../prompts"),
        PathBuf::from("../../prompts"),
    ];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// List of all available prompts.
pub fn list_prompts() -> Vec<Prompt> {
    vec![
        Prompt::TripleExtraction,
        Prompt::ImageDescription,
        Prompt::Summarizer,
        Prompt::CypherGeneration,
        Prompt::AnswerSynthesis,
    ]
}

const TRIPLE_EXTRACTION: &str = r#"You are an expert information extraction agent. Your task is to analyze the user's text and extract knowledge triples.

Output ONLY a valid JSON array of objects. Each object represents a single relationship and must have three keys: "start", "relation", and "end".

- The "relation" value must be descriptive, uppercase, and snake_case (e.g., PROPOSED, PROPOSED_IN, IS_A).
- Do not add any explanations or introductory text outside of the main JSON array.

Example for "Alan Turing proposed the universal machine in 1936.":
[
  {
    "start": "Alan Turing",
    "relation": "PROPOSED",
    "end": "universal machine"
  },
  {
    "start": "universal machine",
    "relation": "PROPOSED_IN",
    "end": "1936"
  }
]
"#;

const IMAGE_DESCRIPTION: &str = "Directly describe the content of this image in one factual, declarative sentence. Start the sentence with the main subject. Do not use phrases like 'This image shows' or 'The diagram depicts'.";

const SUMMARIZER: &str = "Analyze the following. Synthesize its core subject and key points into a single, concise, and factual paragraph. Describe the content directly as if explaining it, starting with the main subject. Do not use third-person language like 'This text is about' or 'The author discusses'.";

const CYPHER_GENERATION: &str = r#"You are an assistant that converts natural language questions into read-only Neo4j Cypher queries.

The graph schema:
- Nodes labeled :Entity with properties `name` and `user_scope`.
- Nodes labeled :Episode with properties `id`, `source_file`, `summary`, `user_scope`.
- Relationships between entities carry an `episode_id` property; relationship types are uppercase snake_case (e.g. WORKS_AT, COLLABORATED_WITH). Episodes link to entities via :MENTIONS.

Output ONLY a valid JSON object with exactly two keys:
- "query": a single Cypher statement using only MATCH, OPTIONAL MATCH, WHERE, WITH, UNWIND, RETURN, ORDER BY, SKIP and LIMIT clauses, with every value referenced as a named parameter (e.g. $name). The statement must end with `LIMIT $row_limit`.
- "params": an object mapping each parameter name (without the $) to its value. Values must be strings or numbers.

Never use CREATE, MERGE, DELETE, SET, REMOVE, DROP or any procedure call. Do not add explanations outside the JSON object.
"#;

const ANSWER_SYNTHESIS: &str = "You answer questions using only the data rows provided. Answer in simple natural language, in at most three sentences. If the rows do not contain the answer, say that the graph holds no matching information. Never invent facts that are not present in the rows.";
