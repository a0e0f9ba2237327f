use aibom::config::ScanConfig;
use aibom::core::inventory::InventoryMetadata;
use aibom::core::{CodebaseAnalyzer, Inventory};
use aibom::formatters::{CycloneDxFormatter, SpdxFormatter};
use serde_json::Value;
use std::fs;

fn scanned() -> Inventory {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.py"),
        r#"
import langchain
from langchain_openai import ChatOpenAI
from langchain.vectorstores import FAISS
from langchain.prompts import PromptTemplate

llm = ChatOpenAI(model="gpt-4")
store = FAISS.from_documents(docs, emb, persist_directory="./idx")
tools = load_tools(["serpapi"])
prompt = PromptTemplate.from_template("Hello {name}")
"#,
    )
    .unwrap();
    CodebaseAnalyzer::new(ScanConfig::new().with_version_lookup(false))
        .analyze_with_metadata(dir.path(), InventoryMetadata::new("20250102T030405Z", "unknown"))
        .unwrap()
}

#[test]
fn spdx_export_lists_every_non_prompt_entry() {
    let inventory = scanned();
    assert_eq!(inventory.prompts.len(), 1);

    let doc = SpdxFormatter::new()
        .with_namespace_base("https://example.test/aibom")
        .format_value(&inventory);

    assert_eq!(doc["spdxVersion"], "SPDX-2.3");
    assert_eq!(doc["dataLicense"], "CC0-1.0");
    assert_eq!(doc["creationInfo"]["created"], "2025-01-02T03:04:05Z");
    assert_eq!(
        doc["documentNamespace"],
        Value::from(format!(
            "https://example.test/aibom/{}",
            inventory.metadata.artifact_sha256
        ))
    );

    let packages = doc["packages"].as_array().unwrap();
    let ids: Vec<&str> = packages.iter().map(|p| p["SPDXID"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        vec![
            "SPDXRef-Dataset-FAISS-from-documents---idx",
            "SPDXRef-Framework-langchain",
            "SPDXRef-Model-ChatOpenAI-gpt-4",
            "SPDXRef-Tool-load-tools---serpapi--",
        ]
    );

    let model = &packages[2];
    assert_eq!(model["versionInfo"], "gpt-4");
    assert_eq!(model["supplier"], "Organization: openai");
    assert_eq!(model["downloadLocation"], "NOASSERTION");
}

#[test]
fn cyclonedx_export_maps_categories_to_component_types() {
    let inventory = scanned();
    let doc = CycloneDxFormatter::new().format_value(&inventory);

    assert_eq!(doc["bomFormat"], "CycloneDX");
    assert_eq!(doc["specVersion"], "1.5");

    let components = doc["components"].as_array().unwrap();
    let kinds: Vec<(&str, &str)> = components
        .iter()
        .map(|c| (c["name"].as_str().unwrap(), c["type"].as_str().unwrap()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("ChatOpenAI", "machine-learning-model"),
            ("FAISS.from_documents", "data"),
            ("langchain", "library"),
            ("load_tools", "application"),
        ]
    );
    assert_eq!(components[0]["bom-ref"], "model:ChatOpenAI:gpt-4");
    assert_eq!(components[0]["publisher"], "openai");
}

#[test]
fn exports_are_written_as_stable_json() {
    let inventory = scanned();
    let dir = tempfile::TempDir::new().unwrap();
    let spdx = dir.path().join("out/SPDX.json");
    let cdx = dir.path().join("out/bom.cdx.json");

    SpdxFormatter::new().format_to_file(&inventory, &spdx).unwrap();
    CycloneDxFormatter::new().format_to_file(&inventory, &cdx).unwrap();

    for path in [&spdx, &cdx] {
        let text = fs::read_to_string(path).unwrap();
        assert!(text.ends_with("}\n"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value.is_object());
    }

    let again = dir.path().join("again.json");
    SpdxFormatter::new().format_to_file(&inventory, &again).unwrap();
    assert_eq!(fs::read(&spdx).unwrap(), fs::read(&again).unwrap());
}
