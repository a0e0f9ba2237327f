use aibom::config::ScanConfig;
use aibom::core::inventory::InventoryMetadata;
use aibom::core::CodebaseAnalyzer;
use aibom::formatters::to_stable_string;
use aibom::storage::{load_inventory, persist_run, write_inventory};
use serde_json::Value;
use std::fs;
use std::path::Path;

fn analyzer() -> CodebaseAnalyzer {
    CodebaseAnalyzer::new(ScanConfig::new().with_version_lookup(false))
}

fn fixed_metadata() -> InventoryMetadata {
    InventoryMetadata::new("20250101T000000Z", "unknown")
}

fn write(root: &Path, relative: &str, code: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, code).unwrap();
}

#[test]
fn chat_model_and_framework_scenario() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "app.py",
        "import langchain\nfrom langchain_openai import ChatOpenAI\nllm = ChatOpenAI(model=\"gpt-4\")\n",
    );

    let inventory = analyzer().analyze(dir.path()).unwrap();

    assert_eq!(inventory.models.len(), 1);
    let model = &inventory.models[0];
    assert_eq!(model.symbol(), "ChatOpenAI");
    assert_eq!(model.attributes["model"], Value::from("gpt-4"));
    assert_eq!(model.key.to_string(), "model:ChatOpenAI:gpt-4");

    assert_eq!(inventory.frameworks.len(), 1);
    assert_eq!(inventory.frameworks[0].symbol(), "langchain");
    assert_eq!(inventory.frameworks[0].locations.len(), 2);

    assert_eq!(inventory.metadata.artifact_sha256.len(), 64);
    assert!(inventory.is_sealed().unwrap());
    assert_eq!(inventory.risk_findings.len(), 1);
    assert_eq!(inventory.risk_findings[0].id, "third-party:model:ChatOpenAI:gpt-4");
}

#[test]
fn vector_store_scenario() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "index.py",
        "from langchain.vectorstores import FAISS\nFAISS.from_documents(docs, emb, persist_directory=\"./faiss_index\")\n",
    );

    let inventory = analyzer().analyze(dir.path()).unwrap();
    assert!(inventory.analysis_warnings.is_empty());
    assert_eq!(inventory.datasets.len(), 1);
    let dataset = &inventory.datasets[0];
    assert_eq!(dataset.symbol(), "FAISS.from_documents");
    assert_eq!(dataset.attributes["persist_directory"], Value::from("./faiss_index"));

    let json = serde_json::to_value(dataset).unwrap();
    assert_eq!(json["type"], "FAISS.from_documents");
}

#[test]
fn identical_sources_give_identical_json() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "a.py", "from langchain_openai import ChatOpenAI\nChatOpenAI(model='gpt-4')\n");
    write(dir.path(), "pkg/b.py", "import torch\nfrom langchain.tools import Tool\nTool('search', run, 'web search')\n");
    write(dir.path(), "pkg/c.py", "from langchain_openai import ChatOpenAI\nChatOpenAI(model='gpt-4', temperature=0)\n");

    let first = analyzer()
        .analyze_with_metadata(dir.path(), fixed_metadata())
        .unwrap();
    let second = analyzer()
        .analyze_with_metadata(dir.path(), fixed_metadata())
        .unwrap();

    assert_eq!(
        to_stable_string(&first).unwrap(),
        to_stable_string(&second).unwrap()
    );
    assert_eq!(first.metadata.artifact_sha256, second.metadata.artifact_sha256);
}

#[test]
fn same_identity_across_files_merges() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "a.py", "ChatOpenAI(model='gpt-4')\n");
    write(dir.path(), "b.py", "\n\nChatOpenAI(model='gpt-4')\n");

    let inventory = analyzer().analyze(dir.path()).unwrap();
    assert_eq!(inventory.models.len(), 1);

    let model = &inventory.models[0];
    let files: Vec<&str> = model.source_files.iter().map(String::as_str).collect();
    assert_eq!(files, vec!["a.py", "b.py"]);
    let lines: Vec<usize> = model.locations.iter().map(|l| l.line).collect();
    assert_eq!(lines, vec![1, 3]);
}

#[test]
fn broken_file_becomes_a_warning() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "good.py", "ChatOpenAI(model='gpt-4')\n");
    write(dir.path(), "bad.py", "def broken(:\n    pass\n");

    let inventory = analyzer().analyze(dir.path()).unwrap();
    assert_eq!(inventory.models.len(), 1);
    assert_eq!(inventory.analysis_warnings.len(), 1);
    assert!(inventory.analysis_warnings.contains_key("bad.py"));
}

#[test]
fn ignored_directories_are_not_scanned() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), ".venv/lib/site.py", "ChatOpenAI(model='vendored')\n");
    write(dir.path(), "node_modules/x.py", "ChatOpenAI(model='vendored')\n");
    write(dir.path(), "src/app.py", "ChatOpenAI(model='mine')\n");

    let inventory = analyzer().analyze(dir.path()).unwrap();
    assert_eq!(inventory.models.len(), 1);
    assert_eq!(inventory.models[0].key.to_string(), "model:ChatOpenAI:mine");
}

#[test]
fn written_inventory_validates_and_reloads() {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        dir.path(),
        "app.py",
        "from langchain.prompts import PromptTemplate\np = PromptTemplate(template='Hi {x}', input_variables=['x'])\n",
    );

    let inventory = analyzer().analyze(dir.path()).unwrap();
    let out = dir.path().join("AI_BOM.json");
    write_inventory(&inventory, &out).unwrap();

    let reloaded = load_inventory(&out).unwrap();
    assert_eq!(reloaded, inventory);
    assert_eq!(reloaded.prompts.len(), 1);
    assert_eq!(reloaded.prompts[0].attributes["template"], Value::from("redacted"));

    let run = persist_run(dir.path(), &inventory).unwrap();
    assert!(run.starts_with(dir.path().join(".aibom/runs")));
    assert!(dir.path().join(".aibom/latest.json").is_file());

    fs::write(dir.path().join(".aibom/runs/stray.py"), "ChatOpenAI(model='x')\n").unwrap();
    let again = analyzer().analyze(dir.path()).unwrap();
    assert!(again.models.is_empty());
}

#[test]
fn deeply_nested_source_does_not_abort_the_scan() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "good.py", "ChatOpenAI(model='gpt-4o')\n");
    let chain = format!("a{}.ChatOpenAI(model='gpt-4')\n", ".b".repeat(5000));
    write(dir.path(), "deep_chain.py", &chain);
    let nested = format!(
        "ChatOpenAI(model={}'x'{})\n",
        "[".repeat(500),
        "]".repeat(500)
    );
    write(dir.path(), "deep_literal.py", &nested);

    let inventory = analyzer()
        .analyze_with_metadata(dir.path(), fixed_metadata())
        .unwrap();

    let keys: Vec<String> = inventory.models.iter().map(|m| m.key.to_string()).collect();
    assert!(keys.contains(&"model:ChatOpenAI:gpt-4o".to_string()), "{keys:?}");
    assert!(keys.contains(&"model:ChatOpenAI:gpt-4".to_string()), "{keys:?}");
    assert_eq!(inventory.models.len(), 3, "{keys:?}");
    assert!(inventory.analysis_warnings.is_empty());
}
