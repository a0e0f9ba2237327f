use aibom::config::ScanConfig;
use aibom::core::CodebaseAnalyzer;
use aibom::drift::diff;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;
use tempfile::TempDir;

fn write_sources(dir: &Path, count: usize) {
    for i in 0..count {
        let content = format!(
            r#"
import langchain
from langchain_openai import ChatOpenAI as LLM
from langchain.vectorstores import FAISS
from langchain.prompts import PromptTemplate

MODEL = "gpt-4"

class Pipeline{i}:
    def __init__(self, docs, emb):
        self.llm = LLM(model="gpt-4o-{i}", temperature=0)
        self.store = FAISS.from_documents(docs, emb, persist_directory="./idx_{i}")
        self.prompt = PromptTemplate.from_template("Answer {{question}}")

    def run(self, question):
        tools = load_tools(["serpapi", "llm-math"], llm=self.llm)
        return initialize_agent(tools, self.llm, agent="zero-shot-react-description")
"#
        );
        std::fs::write(dir.join(format!("pipeline_{i}.py")), content).unwrap();
    }
}

fn analyzer() -> CodebaseAnalyzer {
    CodebaseAnalyzer::new(ScanConfig::new().with_version_lookup(false))
}

fn benchmark_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("codebase_analysis");

    let small = TempDir::new().unwrap();
    write_sources(small.path(), 10);
    group.bench_function("small_codebase", |b| {
        b.iter(|| black_box(analyzer().analyze(black_box(small.path()))))
    });

    let large = TempDir::new().unwrap();
    write_sources(large.path(), 200);
    group.bench_function("large_codebase", |b| {
        b.iter(|| black_box(analyzer().analyze(black_box(large.path()))))
    });

    group.finish();
}

fn benchmark_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift");

    let before = TempDir::new().unwrap();
    write_sources(before.path(), 100);
    let after = TempDir::new().unwrap();
    write_sources(after.path(), 150);

    let baseline = analyzer().analyze(before.path()).unwrap();
    let current = analyzer().analyze(after.path()).unwrap();

    group.bench_function("diff_150_vs_100", |b| {
        b.iter(|| black_box(diff(black_box(&baseline), black_box(&current))))
    });

    group.finish();
}

criterion_group!(benches, benchmark_analysis, benchmark_diff);
criterion_main!(benches);
