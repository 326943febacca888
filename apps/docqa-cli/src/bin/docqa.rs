use std::env;
use std::io::{self, BufRead, Write};

use docqa_engine::{QueryEngine, QueryResponse};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = docqa_cli::init()?;
    let engine = docqa_engine::bootstrap(&settings).await?;
    if engine.index().is_none() {
        tracing::warn!("no index available; questions will fail until the document folder can be indexed");
    }

    let question: Vec<String> = env::args().skip(1).collect();
    if !question.is_empty() {
        return ask(&engine, &question.join(" ")).await;
    }

    let stdin = io::stdin();
    prompt_marker()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let question = line.trim();
        if !question.is_empty() {
            ask(&engine, question).await?;
        }
        prompt_marker()?;
    }
    Ok(())
}

async fn ask(engine: &QueryEngine, question: &str) -> anyhow::Result<()> {
    let response = engine.query(question).await?;
    print_response(&response);
    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!("\n{}\n", response.answer.trim());
    println!("📚 Sources:");
    for (i, hit) in response.sources.iter().enumerate() {
        println!("  {}. score={:.4}  {}  ({})", i + 1, hit.score, hit.id, hit.doc_path);
    }
    println!();
}

fn prompt_marker() -> io::Result<()> {
    print!("❓ ");
    io::stdout().flush()
}
