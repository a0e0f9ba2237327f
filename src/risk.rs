//! Heuristic risk overlay.
//!
//! Findings are hints for a reviewer, not verdicts. Each rule is a pure
//! function of the inventory.

use serde::{Deserialize, Serialize};

use crate::core::inventory::Inventory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub id: String,
    pub category: String,
    pub owasp_llm: String,
    pub severity: Severity,
    pub rationale: String,
    /// Identity key of the entry that triggered the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

const EXFIL_TOOLS: [&str; 5] = [
    "ReadFileTool",
    "WriteFileTool",
    "SerpAPIWrapper",
    "ShellTool",
    "PythonREPLTool",
];

fn is_exfil_tool(name: &str) -> bool {
    name.starts_with("Requests") || EXFIL_TOOLS.contains(&name)
}

/// Risk findings for an inventory, sorted by id.
pub fn assess(inventory: &Inventory) -> Vec<RiskFinding> {
    let mut findings = Vec::new();

    for model in &inventory.models {
        let Some(provider) = &model.provider else {
            continue;
        };
        findings.push(RiskFinding {
            id: format!("third-party:{}", model.key),
            category: "third-party dependency".to_string(),
            owasp_llm: "LLM05 Supply Chain Vulnerabilities".to_string(),
            severity: Severity::Medium,
            rationale: format!("Model is served by external provider '{provider}'."),
            subject: Some(model.key.to_string()),
        });
    }

    for tool in &inventory.tools {
        if !is_exfil_tool(tool.symbol()) {
            continue;
        }
        findings.push(RiskFinding {
            id: format!("exfil:{}", tool.key),
            category: "exfil surface".to_string(),
            owasp_llm: "LLM06 Sensitive Information Disclosure".to_string(),
            severity: Severity::High,
            rationale: "Tool may read or write data or reach the network.".to_string(),
            subject: Some(tool.key.to_string()),
        });
    }

    if !inventory.prompts.is_empty() {
        findings.push(RiskFinding {
            id: "prompt-injection-surface".to_string(),
            category: "prompt injection surface".to_string(),
            owasp_llm: "LLM01 Prompt Injection".to_string(),
            severity: Severity::Medium,
            rationale: "Prompt templates detected; review source trust boundaries.".to_string(),
            subject: None,
        });
    }

    findings.sort_by(|a, b| a.id.cmp(&b.id));
    findings
}
