//! REPL (Read-Eval-Print Loop) for interactive and single-question modes.

use deepresearch_core::config::AppConfig;
use deepresearch_core::research::{ResearchCallback, ResearchLoop, ResearchPhase, ResearchReport};
use deepresearch_core::types::{SearchRound, preview};
use deepresearch_core::{LlmProvider, MockLlmProvider, TerminationReason, create_provider};
use deepresearch_tools::ArxivSearchTool;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const EXAMPLES: &str = "\
Example questions

  Foundations
    • What is the attention mechanism?
    • How do deep learning and classical machine learning differ?
    • 什么是注意力机制？

  Techniques
    • How does the Transformer architecture work?
    • Convolutional neural networks in computer vision
    • 循环神经网络处理序列数据的方法

  Frontiers
    • Recent progress in large language models
    • Applications of generative adversarial networks
    • Reinforcement learning breakthroughs in game AI

  Comparisons
    • BERT vs GPT vs T5
    • Performance of different optimization algorithms

Specific questions give sharper reports.";

const HELP: &str = "\
Commands
  <question>          research a question
  help                show this help
  examples            show example questions
  quit | exit | q     leave

Each question runs up to the configured number of search rounds against arXiv.
The report cites papers inline as [citation:N] and ends with a citation index.";

/// Output options shared by both modes.
pub(crate) struct RunOptions {
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

/// Prints research progress to stderr.
struct ProgressCallback;

impl ResearchCallback for ProgressCallback {
    fn on_phase_change(&self, phase: ResearchPhase) {
        match phase {
            ResearchPhase::Planning => eprintln!("\x1b[36m  planning...\x1b[0m"),
            ResearchPhase::Reporting => eprintln!("\x1b[36m  writing report...\x1b[0m"),
            _ => {}
        }
    }

    fn on_round_start(&self, round: usize, queries: &[String]) {
        eprintln!("\x1b[1m  Round {}\x1b[0m: {}", round, queries.join(" | "));
    }

    fn on_query_complete(&self, query: &str, papers_found: usize) {
        eprintln!("\x1b[90m    [{}] {} papers\x1b[0m", query, papers_found);
    }

    fn on_round_analysis(&self, round: &SearchRound, analysis: &str) {
        if !analysis.is_empty() {
            eprintln!(
                "\x1b[90m    round {} analysis: {}\x1b[0m",
                round.round_number,
                preview(analysis.trim(), 160).replace('\n', " ")
            );
        }
    }

    fn on_terminated(&self, reason: TerminationReason, rounds: usize) {
        eprintln!("\x1b[90m  stopped after {} round(s): {}\x1b[0m", rounds, reason);
    }
}

pub(crate) fn print_examples() {
    println!("{EXAMPLES}");
}

fn build_provider(config: &AppConfig) -> Arc<dyn LlmProvider> {
    match create_provider(&config.llm) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("LLM provider init failed: {}. Using mock.", e);
            Arc::new(MockLlmProvider::new())
        }
    }
}

/// One loop and one search tool per question, so sessions never share state.
fn build_session(
    config: &AppConfig,
    llm: Arc<dyn LlmProvider>,
    quiet: bool,
) -> anyhow::Result<ResearchLoop> {
    let search = Arc::new(ArxivSearchTool::new(&config.search)?);
    let research = ResearchLoop::new(llm, search, config.research.clone());
    Ok(if quiet {
        research
    } else {
        research.with_callback(Arc::new(ProgressCallback))
    })
}

/// Quality label for a report by its inline citation count.
fn quality_label(citations: usize) -> &'static str {
    if citations > 20 {
        "excellent"
    } else if citations > 10 {
        "good"
    } else {
        "fair"
    }
}

fn print_statistics(report: &ResearchReport, elapsed_secs: f64) {
    let citations = report.citation_marker_count();
    println!("\n\x1b[1mRun statistics\x1b[0m");
    println!("  Elapsed:    {:.1} s", elapsed_secs);
    println!("  Characters: {}", report.content.chars().count());
    println!("  Citations:  {}", citations);
    println!("  Quality:    {}", quality_label(citations));
    println!(
        "\x1b[90m  [{} rounds, {} papers, {}]\x1b[0m",
        report.rounds, report.papers, report.termination
    );
}

async fn research_once(
    research: &ResearchLoop,
    question: &str,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let report = research.run(question).await?;
    let elapsed = started.elapsed().as_secs_f64();

    println!("\n{}", report.content);
    print_statistics(&report, elapsed);

    if let Some(path) = &options.output {
        std::fs::write(path, &report.content)?;
        println!("\x1b[90m  report written to {}\x1b[0m", path.display());
    }
    Ok(())
}

/// Research a single question and exit.
pub(crate) async fn run_single(
    question: &str,
    config: AppConfig,
    options: RunOptions,
) -> anyhow::Result<()> {
    let llm = build_provider(&config);
    if !options.quiet {
        eprintln!(
            "  Model: {} | Max rounds: {} | Strategy: {}",
            llm.model_name(),
            config.research.max_rounds,
            config.research.strategy
        );
    }
    let research = build_session(&config, llm, options.quiet)?;
    research_once(&research, question, &options).await
}

/// Read questions from stdin until `quit`.
pub(crate) async fn run_interactive(config: AppConfig, options: RunOptions) -> anyhow::Result<()> {
    let llm = build_provider(&config);
    println!("\x1b[1;32m  Deep Researcher\x1b[0m");
    println!(
        "  Model: {} | Max rounds: {} | Strategy: {}",
        llm.model_name(),
        config.research.max_rounds,
        config.research.strategy
    );
    println!("  Type a question, 'help' for commands, 'quit' to exit\n");

    let stdin = io::stdin();
    let mut count = 0usize;
    loop {
        print!("\x1b[1;34m[{}] > \x1b[0m", count + 1);
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("{HELP}");
                continue;
            }
            "examples" => {
                print_examples();
                continue;
            }
            _ => {}
        }

        let research = build_session(&config, llm.clone(), options.quiet)?;
        match research_once(&research, input, &options).await {
            Ok(()) => count += 1,
            Err(e) => println!("\x1b[31mError: {}\x1b[0m", e),
        }
    }

    Ok(())
}
