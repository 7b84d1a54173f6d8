use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use content_pipeline::agents::AgentRegistry;
use content_pipeline::{
    ContentType, GeneratorConfig, Invoker, MessagesClient, PipelineRuntime, RetryPolicy,
    WorkflowRequest, WorkflowStore,
};

#[derive(Parser)]
#[command(name = "content-pipeline", about = "Run a content brief through the agent pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow end to end and print the final content
    Run {
        /// What the content is about
        #[arg(long)]
        topic: String,
        /// Who the content is for
        #[arg(long)]
        audience: String,
        /// What the content should achieve
        #[arg(long)]
        goals: String,
        /// blog, social, landing or email
        #[arg(long, default_value = "blog")]
        content_type: ContentType,
        #[arg(long)]
        tone: Option<String>,
        /// Comma-separated target keywords
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        /// Comma-separated social platforms
        #[arg(long, value_delimiter = ',')]
        platforms: Vec<String>,
        /// Override the configured model for this run
        #[arg(long)]
        model: Option<String>,
        /// Print the full result as JSON instead of a text report
        #[arg(long)]
        json: bool,
    },
    /// Verify the generation endpoint answers a canary prompt
    HealthCheck,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            topic,
            audience,
            goals,
            content_type,
            tone,
            keywords,
            platforms,
            model,
            json,
        } => {
            let request = WorkflowRequest {
                topic,
                audience,
                goals,
                content_type,
                tone,
                brand_guidelines: None,
                keywords,
                platforms,
            };
            run_workflow(request, model, json).await
        }
        Command::HealthCheck => health_check().await,
    }
}

async fn run_workflow(request: WorkflowRequest, model: Option<String>, json: bool) -> Result<()> {
    let runtime = build_runtime(model).context("failed to initialize the pipeline")?;
    let engine = runtime.create(request);
    engine
        .run()
        .await
        .with_context(|| format!("workflow {} failed", engine.id()))?;

    let content = engine.content()?;
    let quality = engine.quality()?;

    if json {
        let report = serde_json::json!({
            "workflow_id": engine.id(),
            "content": content,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("# {}\n", content.title);
    println!("{}\n", content.body);
    println!("Summary: {}", content.summary);
    if !content.keywords.is_empty() {
        println!("Keywords: {}", content.keywords.join(", "));
    }
    for post in &content.social_posts {
        println!("\n[{}] {}", post.platform, post.text);
        if !post.hashtags.is_empty() {
            println!("  {}", post.hashtags.join(" "));
        }
    }

    println!("\nQuality:");
    for (name, pct) in quality.as_percentages() {
        println!("  {:<16} {:>5.1}%", name, pct);
    }
    for rec in &quality.recommendations {
        println!("  - {}", rec);
    }
    Ok(())
}

async fn health_check() -> Result<()> {
    let config = GeneratorConfig::from_env()?;
    let backend = Arc::new(MessagesClient::new(config.clone()));
    // Single fast attempt; a health check should not sit in a retry loop
    let invoker = Arc::new(Invoker::new(backend, &config).with_policy(RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(0),
        max_jitter: Duration::from_millis(0),
    }));
    let registry = AgentRegistry::with_all_agents(invoker);

    let mut ids = registry.ids();
    ids.sort_by_key(|id| id.as_str());
    let mut failures = 0usize;
    for id in ids {
        let agent = registry.get(id)?;
        match agent.health_check().await {
            Ok(()) => println!("{:<26} ok", id.as_str()),
            Err(err) => {
                failures += 1;
                println!("{:<26} FAILED: {}", id.as_str(), err);
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{} agent health checks failed", failures);
    }
    Ok(())
}

fn build_runtime(model: Option<String>) -> Result<PipelineRuntime> {
    let mut config = GeneratorConfig::from_env()?;
    if let Some(model) = model {
        config.model = model;
    }
    let backend = Arc::new(MessagesClient::new(config.clone()));
    let invoker = Arc::new(Invoker::new(backend, &config));
    let registry = Arc::new(AgentRegistry::with_all_agents(invoker));
    Ok(PipelineRuntime::new(registry, WorkflowStore::new()))
}
