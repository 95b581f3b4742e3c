//! Basic question/answer walkthrough against a local Ollama server.
//!
//! Run with:
//! ```bash
//! # optional, defaults to http://localhost:11434
//! export OLLAMA_HOST="127.0.0.1:11434"
//! RUST_LOG=ollama_stream=debug cargo run --example basic_chat
//! ```

use std::io::Write;

use futures::StreamExt;
use nonempty::nonempty;
use ollama_stream::client::{Client, StreamingClient};
use ollama_stream::model::Message;
use ollama_stream::options::{HttpTransport, ModelOptions, OllamaModel, TransportOptions};
use ollama_stream::providers::OllamaClient;
use tracing_subscriber::EnvFilter;

fn banner(title: &str) {
    println!("{}", "=".repeat(50));
    println!("{title}");
    println!("{}", "=".repeat(50));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let client = OllamaClient::new(
        ModelOptions::new(OllamaModel::default()).with_model("llama2".to_string()),
        TransportOptions::new(HttpTransport::from_env()),
    );

    // Example 1: Simple question
    banner("Example 1: Simple Question");
    let question = "What is the capital of France?";
    let reply = client.generate(question.to_string()).await?;
    println!("Question: {question}");
    println!("Answer: {}", reply.response);
    println!();

    // Example 2: Streaming response
    banner("Example 2: Streaming Response");
    let question = "Explain quantum computing in simple terms.";
    println!("Question: {question}");
    print!("Answer: ");
    std::io::stdout().flush()?;

    let mut reader = client.generate_stream(question.to_string()).await?;
    while let Some(fragment) = reader.next().await {
        print!("{}", fragment?);
        std::io::stdout().flush()?;
    }
    println!("\n");

    // Example 3: Chat with history
    banner("Example 3: Conversation with History");
    let mut history = nonempty![
        Message::system("You are a helpful AI assistant."),
        Message::user("What is machine learning?")
    ];

    let reply = client.chat(history.clone()).await?;
    println!("User: What is machine learning?");
    println!("Assistant: {}", reply.message.content);

    history.push(reply.message);
    history.push(Message::user("Can you give me an example?"));

    let reply = client.chat(history).await?;
    println!("\nUser: Can you give me an example?");
    println!("Assistant: {}", reply.message.content);
    println!();

    // Example 4: Different models
    banner("Example 4: Comparing Models");
    let prompt = "Write a haiku about AI";

    for model in ["llama2", "mistral"] {
        let options = ModelOptions::new(OllamaModel::default()).with_model(model.to_string());
        match client.generate_with_options(prompt.to_string(), &options).await {
            Ok(reply) => {
                println!("\n{}:", model.to_uppercase());
                println!("{}", reply.response);
            }
            Err(e) => println!("\n{}: Model not available ({e})", model.to_uppercase()),
        }
    }

    Ok(())
}
