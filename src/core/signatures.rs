//! Registry of recognized AI/ML usage shapes.
//!
//! The registry is a plain immutable value handed to the matcher. The
//! built-in table covers LangChain, Hugging Face, the vendor SDKs and the
//! common vector stores; tests build their own registries with the same
//! builder methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inventory collection a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Model,
    Dataset,
    Tool,
    Framework,
    Prompt,
}

impl Category {
    /// Fixed output order of the inventory collections.
    pub const ALL: [Category; 5] = [
        Category::Model,
        Category::Dataset,
        Category::Tool,
        Category::Framework,
        Category::Prompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Model => "model",
            Category::Dataset => "dataset",
            Category::Tool => "tool",
            Category::Framework => "framework",
            Category::Prompt => "prompt",
        }
    }

    /// Key of the inventory document section holding this category.
    pub fn section(self) -> &'static str {
        match self {
            Category::Model => "models",
            Category::Dataset => "datasets",
            Category::Tool => "tools",
            Category::Framework => "frameworks",
            Category::Prompt => "prompts",
        }
    }

    /// Field carrying the matched symbol in serialized entries.
    pub fn symbol_field(self) -> &'static str {
        match self {
            Category::Model | Category::Dataset | Category::Prompt => "type",
            Category::Tool | Category::Framework => "name",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Category::Model),
            "dataset" => Ok(Category::Dataset),
            "tool" => Ok(Category::Tool),
            "framework" => Ok(Category::Framework),
            "prompt" => Ok(Category::Prompt),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// How a resolved dotted call name is compared against a signature symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Last segment equals the symbol: `langchain_openai.ChatOpenAI`.
    Leaf,
    /// Any segment equals the symbol; the reported symbol keeps the rest of
    /// the chain: `FAISS.from_documents`.
    Segment,
    /// Last segment contains the symbol, case-insensitively: `create_react_agent`.
    LeafContains,
}

/// One argument worth extracting from a matched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    /// Canonical attribute name in the inventory.
    pub name: String,
    /// Keyword names accepted for this argument, canonical name first.
    pub keywords: Vec<String>,
    /// Positional index, if the argument may be passed positionally.
    pub position: Option<usize>,
    /// Replace resolved values with `redacted` unless capture is enabled.
    pub redact: bool,
}

impl ArgSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: vec![name.to_string()],
            position: None,
            redact: false,
        }
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        if !self.keywords.iter().any(|k| k == keyword) {
            self.keywords.push(keyword.to_string());
        }
        self
    }

    pub fn keywords(self, keywords: &[&str]) -> Self {
        keywords.iter().fold(self, |spec, k| spec.keyword(k))
    }

    pub fn position(mut self, index: usize) -> Self {
        self.position = Some(index);
        self
    }

    pub fn redacted(mut self) -> Self {
        self.redact = true;
        self
    }
}

/// A recognized call shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub symbol: String,
    pub category: Category,
    pub rule: MatchRule,
    pub args: Vec<ArgSpec>,
    /// Argument whose resolved value becomes part of the identity key.
    pub primary: Option<String>,
    /// External service the symbol talks to, if any.
    pub provider: Option<String>,
}

impl Signature {
    pub fn new(symbol: &str, category: Category) -> Self {
        Self {
            symbol: symbol.to_string(),
            category,
            rule: MatchRule::Leaf,
            args: Vec::new(),
            primary: None,
            provider: None,
        }
    }

    pub fn rule(mut self, rule: MatchRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Add an argument and mark it as the identity argument.
    pub fn primary_arg(mut self, spec: ArgSpec) -> Self {
        self.primary = Some(spec.name.clone());
        self.args.push(spec);
        self
    }

    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// Match a resolved dotted call name; returns the symbol to report.
    pub fn match_name(&self, qualified: &str) -> Option<String> {
        if qualified.is_empty() {
            return None;
        }
        let segments: Vec<&str> = qualified.split('.').collect();
        let leaf = segments.last().copied().unwrap_or_default();
        match self.rule {
            MatchRule::Leaf => (leaf == self.symbol).then(|| leaf.to_string()),
            MatchRule::Segment => segments
                .iter()
                .position(|segment| *segment == self.symbol)
                .map(|index| segments[index..].join(".")),
            MatchRule::LeafContains => {
                let needle = self.symbol.to_lowercase();
                (!leaf.is_empty() && leaf.to_lowercase().contains(&needle))
                    .then(|| leaf.to_string())
            }
        }
    }
}

/// A framework recognized from plain imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkSignature {
    pub name: String,
    /// Top-level import names that count as this framework.
    pub import_roots: Vec<String>,
    /// Installed distribution names to query for a version, in order.
    pub distributions: Vec<String>,
    pub provider: Option<String>,
}

impl FrameworkSignature {
    pub fn new(name: &str, import_roots: &[&str], distributions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            import_roots: import_roots.iter().map(|s| s.to_string()).collect(),
            distributions: distributions.iter().map(|s| s.to_string()).collect(),
            provider: None,
        }
    }

    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }
}

/// Immutable set of signatures and framework aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureRegistry {
    signatures: Vec<Signature>,
    frameworks: Vec<FrameworkSignature>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn with_framework(mut self, framework: FrameworkSignature) -> Self {
        self.frameworks.push(framework);
        self
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn frameworks(&self) -> &[FrameworkSignature] {
        &self.frameworks
    }

    /// First matching signature per category, in registry order.
    pub fn match_call<'r>(&'r self, qualified: &str) -> Vec<(&'r Signature, String)> {
        let mut matched: Vec<(&Signature, String)> = Vec::new();
        for signature in &self.signatures {
            if matched.iter().any(|(s, _)| s.category == signature.category) {
                continue;
            }
            if let Some(symbol) = signature.match_name(qualified) {
                matched.push((signature, symbol));
            }
        }
        matched
    }

    /// Framework owning an import root such as `langchain_openai`.
    pub fn framework_for_root(&self, root: &str) -> Option<&FrameworkSignature> {
        self.frameworks
            .iter()
            .find(|fw| fw.import_roots.iter().any(|r| r == root))
    }

    /// Built-in registry used by the CLI.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        for (symbol, provider) in MODEL_CLASSES {
            let mut signature =
                Signature::new(symbol, Category::Model).primary_arg(model_arg().position(0));
            if let Some(provider) = provider {
                signature = signature.provider(provider);
            }
            registry = registry.with_signature(signature);
        }
        for symbol in PRETRAINED_CLASSES {
            registry = registry.with_signature(
                Signature::new(symbol, Category::Model)
                    .rule(MatchRule::Segment)
                    .primary_arg(model_arg().position(0))
                    .provider("huggingface"),
            );
        }

        for (symbol, primary) in VECTOR_STORES {
            let mut signature = Signature::new(symbol, Category::Dataset).rule(MatchRule::Segment);
            for arg in VECTOR_STORE_ARGS {
                let spec = ArgSpec::new(arg);
                signature = if arg == *primary {
                    signature.primary_arg(spec)
                } else {
                    signature.arg(spec)
                };
            }
            if *symbol == "Pinecone" {
                signature = signature.provider("pinecone");
            }
            registry = registry.with_signature(signature);
        }
        for (symbol, path_arg) in DOCUMENT_LOADERS {
            registry = registry.with_signature(
                Signature::new(symbol, Category::Dataset)
                    .primary_arg(ArgSpec::new(path_arg).position(0))
                    .arg(ArgSpec::new("encoding")),
            );
        }
        registry = registry.with_signature(
            Signature::new("load_dataset", Category::Dataset)
                .primary_arg(ArgSpec::new("path").position(0))
                .arg(ArgSpec::new("name").position(1))
                .arg(ArgSpec::new("split"))
                .arg(ArgSpec::new("revision"))
                .provider("huggingface"),
        );

        registry = registry
            .with_signature(
                Signature::new("Tool", Category::Tool)
                    .primary_arg(ArgSpec::new("tool_name").keyword("name").position(0))
                    .arg(ArgSpec::new("description").position(2)),
            )
            .with_signature(
                Signature::new("StructuredTool", Category::Tool)
                    .rule(MatchRule::Segment)
                    .primary_arg(ArgSpec::new("tool_name").keyword("name"))
                    .arg(ArgSpec::new("description")),
            )
            .with_signature(
                Signature::new("load_tools", Category::Tool)
                    .primary_arg(ArgSpec::new("tool_names").position(0)),
            )
            .with_signature(
                Signature::new("initialize_agent", Category::Tool)
                    .arg(ArgSpec::new("agent").position(2)),
            );
        for (symbol, provider) in TOOL_CLASSES {
            let mut signature =
                Signature::new(symbol, Category::Tool).arg(ArgSpec::new("description"));
            if let Some(provider) = provider {
                signature = signature.provider(provider);
            }
            registry = registry.with_signature(signature);
        }
        registry = registry.with_signature(
            Signature::new("agent", Category::Tool).rule(MatchRule::LeafContains),
        );

        for symbol in ["ChatPromptTemplate", "PromptTemplate"] {
            registry = registry.with_signature(
                Signature::new(symbol, Category::Prompt)
                    .rule(MatchRule::Segment)
                    .primary_arg(ArgSpec::new("template").position(0).redacted())
                    .arg(ArgSpec::new("input_variables")),
            );
        }

        for (name, roots, distributions, provider) in FRAMEWORKS {
            let mut framework = FrameworkSignature::new(name, roots, distributions);
            if let Some(provider) = provider {
                framework = framework.provider(provider);
            }
            registry = registry.with_framework(framework);
        }

        registry
    }
}

fn model_arg() -> ArgSpec {
    ArgSpec::new("model").keywords(&[
        "model_name",
        "model_id",
        "repo_id",
        "checkpoint",
        "deployment_name",
        "azure_deployment",
        "engine",
        "pretrained_model_name_or_path",
    ])
}

const MODEL_CLASSES: &[(&str, Option<&str>)] = &[
    ("OpenAI", Some("openai")),
    ("ChatOpenAI", Some("openai")),
    ("OpenAIEmbeddings", Some("openai")),
    ("AzureChatOpenAI", Some("azure-openai")),
    ("AzureOpenAI", Some("azure-openai")),
    ("ChatAnthropic", Some("anthropic")),
    ("Anthropic", Some("anthropic")),
    ("Cohere", Some("cohere")),
    ("ChatCohere", Some("cohere")),
    ("Bedrock", Some("aws-bedrock")),
    ("ChatBedrock", Some("aws-bedrock")),
    ("VertexAI", Some("google-vertex-ai")),
    ("ChatVertexAI", Some("google-vertex-ai")),
    ("HuggingFaceHub", Some("huggingface")),
    ("HuggingFaceEndpoint", Some("huggingface")),
    ("HuggingFacePipeline", None),
    ("HuggingFaceEmbeddings", None),
    ("SentenceTransformer", None),
    ("Ollama", None),
    ("ChatOllama", None),
];

const PRETRAINED_CLASSES: &[&str] = &[
    "AutoModel",
    "AutoModelForCausalLM",
    "AutoModelForSeq2SeqLM",
    "AutoModelForSequenceClassification",
];

const VECTOR_STORES: &[(&str, &str)] = &[
    ("FAISS", "persist_directory"),
    ("Chroma", "persist_directory"),
    ("Pinecone", "index_name"),
    ("Weaviate", "index_name"),
    ("Milvus", "collection_name"),
    ("Qdrant", "collection_name"),
    ("PGVector", "collection_name"),
];

const VECTOR_STORE_ARGS: [&str; 5] = [
    "persist_directory",
    "folder_path",
    "index_name",
    "collection_name",
    "index_path",
];

const DOCUMENT_LOADERS: &[(&str, &str)] = &[
    ("TextLoader", "file_path"),
    ("CSVLoader", "file_path"),
    ("JSONLoader", "file_path"),
    ("PyPDFLoader", "file_path"),
    ("DirectoryLoader", "path"),
    ("WebBaseLoader", "web_path"),
];

const TOOL_CLASSES: &[(&str, Option<&str>)] = &[
    ("AgentExecutor", None),
    ("SerpAPIWrapper", Some("serpapi")),
    ("TavilySearchResults", Some("tavily")),
    ("DuckDuckGoSearchRun", Some("duckduckgo")),
    ("WikipediaQueryRun", Some("wikipedia")),
    ("RequestsGetTool", None),
    ("RequestsPostTool", None),
    ("ReadFileTool", None),
    ("WriteFileTool", None),
    ("ShellTool", None),
    ("PythonREPLTool", None),
];

type FrameworkRow = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    Option<&'static str>,
);

const FRAMEWORKS: &[FrameworkRow] = &[
    (
        "langchain",
        &[
            "langchain",
            "langchain_openai",
            "langchain_community",
            "langchain_core",
            "langchain_anthropic",
        ],
        &["langchain", "langchain-core"],
        None,
    ),
    ("transformers", &["transformers"], &["transformers"], None),
    ("torch", &["torch", "pytorch"], &["torch"], None),
    ("tensorflow", &["tensorflow"], &["tensorflow"], None),
    ("faiss", &["faiss", "faiss_cpu", "faiss_gpu"], &["faiss-cpu", "faiss-gpu", "faiss"], None),
    (
        "sentence_transformers",
        &["sentence_transformers"],
        &["sentence-transformers"],
        None,
    ),
    ("openai", &["openai"], &["openai"], Some("openai")),
    ("anthropic", &["anthropic"], &["anthropic"], Some("anthropic")),
    ("cohere", &["cohere"], &["cohere"], Some("cohere")),
    ("chromadb", &["chromadb"], &["chromadb"], None),
    ("llama_index", &["llama_index"], &["llama-index", "llama-index-core"], None),
    ("datasets", &["datasets"], &["datasets"], None),
    ("scikit-learn", &["sklearn", "scikit_learn"], &["scikit-learn"], None),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_rule_matches_last_segment_only() {
        let sig = Signature::new("ChatOpenAI", Category::Model);
        assert_eq!(
            sig.match_name("langchain_openai.ChatOpenAI").as_deref(),
            Some("ChatOpenAI")
        );
        assert_eq!(sig.match_name("ChatOpenAI.invoke"), None);
        assert_eq!(sig.match_name(""), None);
    }

    #[test]
    fn segment_rule_reports_chain_from_matched_segment() {
        let sig = Signature::new("FAISS", Category::Dataset).rule(MatchRule::Segment);
        assert_eq!(
            sig.match_name("langchain.vectorstores.FAISS.from_documents")
                .as_deref(),
            Some("FAISS.from_documents")
        );
        assert_eq!(sig.match_name("faiss.IndexFlatL2"), None);
    }

    #[test]
    fn leaf_contains_rule_is_case_insensitive() {
        let sig = Signature::new("agent", Category::Tool).rule(MatchRule::LeafContains);
        assert_eq!(
            sig.match_name("langchain.agents.create_react_agent").as_deref(),
            Some("create_react_agent")
        );
        assert_eq!(sig.match_name("AgentExecutor").as_deref(), Some("AgentExecutor"));
        assert_eq!(sig.match_name("agent.run"), None);
    }

    #[test]
    fn match_call_returns_first_signature_per_category() {
        let registry = SignatureRegistry::builtin();
        let matched = registry.match_call("initialize_agent");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].0.symbol, "initialize_agent");
    }

    #[test]
    fn builtin_registry_knows_providers() {
        let registry = SignatureRegistry::builtin();
        let model_provider = |symbol: &str| {
            registry
                .match_call(symbol)
                .into_iter()
                .find(|(s, _)| s.category == Category::Model)
                .and_then(|(s, _)| s.provider.clone())
        };
        assert_eq!(model_provider("ChatOpenAI").as_deref(), Some("openai"));
        assert_eq!(model_provider("Ollama"), None);
        assert_eq!(
            registry.framework_for_root("langchain_openai").map(|f| f.name.as_str()),
            Some("langchain")
        );
    }

    #[test]
    fn category_round_trips_through_strings() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("models".parse::<Category>().is_err());
    }
}
