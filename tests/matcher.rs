use aibom::core::literal::LiteralValue;
use aibom::core::matcher::PatternMatcher;
use aibom::core::signatures::{Category, FrameworkSignature, SignatureRegistry};
use aibom::core::versions::VersionLookup;
use aibom::core::Finding;
use aibom::parsers::python::PythonParser;
use std::path::Path;

fn run(code: &str) -> Vec<Finding> {
    run_with(code, false)
}

fn run_with(code: &str, include_prompts: bool) -> Vec<Finding> {
    let registry = SignatureRegistry::builtin();
    let parsed = PythonParser::new()
        .unwrap()
        .parse_source(Path::new("app.py"), code)
        .unwrap();
    let matcher = PatternMatcher::new(&registry).include_prompts(include_prompts);
    let findings: Vec<Finding> = matcher.matches(&parsed, "app.py").collect();
    findings
}

fn only(findings: &[Finding], category: Category) -> Vec<&Finding> {
    findings.iter().filter(|f| f.category == category).collect()
}

fn str_arg(finding: &Finding, name: &str) -> LiteralValue {
    finding.arguments.get(name).cloned().unwrap_or(LiteralValue::Unknown)
}

#[test]
fn aliased_import_resolves_to_canonical_symbol() {
    let findings = run(r#"
from langchain_openai import ChatOpenAI as LLM

llm = LLM(model="gpt-4")
"#);
    assert_eq!(findings.len(), 2);

    let framework = &findings[0];
    assert_eq!(framework.category, Category::Framework);
    assert_eq!(framework.symbol, "langchain");
    assert_eq!(framework.location.line, 2);

    let model = &findings[1];
    assert_eq!(model.category, Category::Model);
    assert_eq!(model.symbol, "ChatOpenAI");
    assert_eq!(model.qualified_name, "langchain_openai.ChatOpenAI");
    assert_eq!(model.call, "LLM");
    assert_eq!(model.provider.as_deref(), Some("openai"));
    assert_eq!(model.location.line, 4);
    assert_eq!(model.location.column, 7);
    assert_eq!(model.primary_value().as_deref(), Some("gpt-4"));
}

#[test]
fn module_alias_resolves_attribute_chain() {
    let findings = run(r#"
import langchain.vectorstores as vs
store = vs.FAISS.from_documents(docs, embeddings, persist_directory="./faiss_index")
"#);
    let datasets = only(&findings, Category::Dataset);
    assert_eq!(datasets.len(), 1);
    let store = datasets[0];
    assert_eq!(store.symbol, "FAISS.from_documents");
    assert_eq!(store.qualified_name, "langchain.vectorstores.FAISS.from_documents");
    assert_eq!(
        str_arg(store, "persist_directory"),
        LiteralValue::Str("./faiss_index".into())
    );
    // Unsupplied non-primary arguments are omitted.
    assert!(!store.arguments.contains_key("index_name"));
}

#[test]
fn variables_and_interpolated_strings_are_unknown() {
    let findings = run(r#"
name = "gpt-4"
a = ChatOpenAI(model=name)
b = ChatOpenAI(model=f"gpt-{version}")
c = ChatOpenAI(model="gpt-" "4o")
"#);
    let models = only(&findings, Category::Model);
    assert_eq!(models.len(), 3);
    assert_eq!(str_arg(models[0], "model"), LiteralValue::Unknown);
    assert_eq!(models[0].primary_value(), None);
    assert_eq!(str_arg(models[1], "model"), LiteralValue::Unknown);
    assert_eq!(str_arg(models[2], "model"), LiteralValue::Str("gpt-4o".into()));
}

#[test]
fn positional_and_alias_keywords_are_extracted() {
    let findings = run(r#"
a = HuggingFaceHub("google/flan-t5-xl")
b = HuggingFaceHub(repo_id="tiiuae/falcon-7b")
c = AutoModelForCausalLM.from_pretrained("meta-llama/Llama-2-7b-hf")
"#);
    let models = only(&findings, Category::Model);
    let values: Vec<Option<String>> = models.iter().map(|f| f.primary_value()).collect();
    assert_eq!(
        values,
        vec![
            Some("google/flan-t5-xl".to_string()),
            Some("tiiuae/falcon-7b".to_string()),
            Some("meta-llama/Llama-2-7b-hf".to_string()),
        ]
    );
    assert_eq!(models[2].symbol, "AutoModelForCausalLM.from_pretrained");
}

#[test]
fn splats_make_missing_arguments_unknown() {
    let findings = run(r#"
a = ChatOpenAI(*args)
b = ChatOpenAI(**settings)
c = ChatOpenAI()
"#);
    let models = only(&findings, Category::Model);
    assert_eq!(models.len(), 3);
    for model in models {
        // The primary argument is always present.
        assert_eq!(model.arguments.get("model"), Some(&LiteralValue::Unknown));
    }
}

#[test]
fn container_literals_resolve_element_wise() {
    let findings = run(r#"
tools = load_tools(["serpapi", "llm-math"], llm=llm)
bad = load_tools(["serpapi", extra])
"#);
    let tools = only(&findings, Category::Tool);
    assert_eq!(tools.len(), 2);
    assert_eq!(
        tools[0].primary_value().as_deref(),
        Some("[\"serpapi\",\"llm-math\"]")
    );
    assert_eq!(
        str_arg(tools[1], "tool_names"),
        LiteralValue::Seq(vec![LiteralValue::Str("serpapi".into()), LiteralValue::Unknown])
    );
    assert_eq!(tools[1].primary_value(), None);
}

#[test]
fn nested_calls_are_reported_outer_first() {
    let findings = run(r#"
db = Chroma(embedding_function=OpenAIEmbeddings(), persist_directory="db")
"#);
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].symbol, "Chroma");
    assert_eq!(findings[1].symbol, "OpenAIEmbeddings");
    assert_eq!(findings[1].category, Category::Model);
}

#[test]
fn agent_helpers_match_by_leaf_name() {
    let findings = run(r#"
from langchain.agents import create_react_agent
agent = create_react_agent(llm, tools, prompt)
executor = initialize_agent(tools, llm, agent="zero-shot-react-description")
"#);
    let tools = only(&findings, Category::Tool);
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].symbol, "create_react_agent");
    assert_eq!(tools[1].symbol, "initialize_agent");
    assert_eq!(
        str_arg(tools[1], "agent"),
        LiteralValue::Str("zero-shot-react-description".into())
    );
}

#[test]
fn prompt_templates_are_redacted_unless_requested() {
    let code = r#"
prompt = PromptTemplate.from_template("Answer {question} politely")
"#;
    let redacted = run(code);
    let prompt = only(&redacted, Category::Prompt)[0];
    assert_eq!(prompt.symbol, "PromptTemplate.from_template");
    assert_eq!(str_arg(prompt, "template"), LiteralValue::Str("redacted".into()));
    assert_eq!(prompt.primary_value(), None);

    let captured = run_with(code, true);
    let prompt = only(&captured, Category::Prompt)[0];
    assert_eq!(
        prompt.primary_value().as_deref(),
        Some("Answer {question} politely")
    );
}

#[test]
fn one_framework_finding_per_statement() {
    let findings = run(r#"
import langchain, langchain_core.messages
import torch as t
from transformers import pipeline
from .local import helper
import os
"#);
    let names: Vec<&str> = only(&findings, Category::Framework)
        .iter()
        .map(|f| f.symbol.as_str())
        .collect();
    assert_eq!(names, vec!["langchain", "torch", "transformers"]);
}

#[test]
fn unnameable_callees_are_skipped() {
    let findings = run(r#"
factory()(model="gpt-4")
clients[0](model="gpt-4")
"#);
    assert!(findings.is_empty());
}

#[test]
fn matching_is_restartable() {
    let code = r#"
import openai
from langchain_openai import ChatOpenAI
llm = ChatOpenAI(model="gpt-4", temperature=0)
"#;
    assert_eq!(run(code), run(code));
}

struct FixedVersion;

impl VersionLookup for FixedVersion {
    fn installed_version(&self, framework: &FrameworkSignature) -> Option<String> {
        (framework.name == "langchain").then(|| "0.2.1".to_string())
    }
}

#[test]
fn framework_findings_carry_installed_versions() {
    let registry = SignatureRegistry::builtin();
    let parsed = PythonParser::new()
        .unwrap()
        .parse_source(Path::new("app.py"), "import langchain\nimport torch\n")
        .unwrap();
    let lookup = FixedVersion;
    let matcher = PatternMatcher::new(&registry).with_versions(&lookup);
    let findings: Vec<Finding> = matcher.matches(&parsed, "app.py").collect();

    assert_eq!(findings.len(), 2);
    assert_eq!(
        findings[0].arguments.get("version"),
        Some(&LiteralValue::Str("0.2.1".into()))
    );
    assert!(findings[1].arguments.is_empty());
}

#[test]
fn custom_registry_is_respected() {
    use aibom::core::signatures::{ArgSpec, Signature};

    let registry = SignatureRegistry::new().with_signature(
        Signature::new("Embedder", Category::Model)
            .primary_arg(ArgSpec::new("checkpoint").position(0))
            .provider("in-house"),
    );
    let parsed = PythonParser::new()
        .unwrap()
        .parse_source(Path::new("m.py"), "e = Embedder('v3')\nChatOpenAI(model='gpt-4')\n")
        .unwrap();
    let matcher = PatternMatcher::new(&registry);
    let findings: Vec<Finding> = matcher.matches(&parsed, "m.py").collect();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].primary_value().as_deref(), Some("v3"));
    assert_eq!(findings[0].provider.as_deref(), Some("in-house"));
}
