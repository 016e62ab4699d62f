use anyhow::Result;
use colored::*;
use std::time::Instant;

use crate::output::{print_reply, TestResult};
use crate::webhook_client::{rtms_started_payload, WebhookClient, WebhookReply};

fn check(scenario: &str, start: Instant, expected: &str, passed: bool, reply: &WebhookReply) -> TestResult {
    if passed {
        println!("{} {}", "✓".green(), expected);
    } else {
        println!("{} expected {}", "✗".red(), expected);
    }
    TestResult {
        scenario: scenario.to_string(),
        passed,
        message: (!passed).then(|| format!("got {} {}", reply.status, reply.body)),
        duration: start.elapsed(),
    }
}

/// A stream-started notification is acknowledged with `200 {"status":"ok"}`.
pub async fn test_acknowledge(client: &WebhookClient) -> Result<TestResult> {
    let start = Instant::now();
    println!("\n{}", "=== TEST: Acknowledge ===".bright_cyan().bold());
    println!("{} Posting meeting.rtms_started to {}", "→".blue(), client.url());

    let reply = client
        .post_json(&rtms_started_payload("test-meeting", "test-stream", "wss://localhost"))
        .await?;
    print_reply("acknowledge", &reply);

    let passed = reply.status == 200
        && reply.content_type.as_deref() == Some("application/json")
        && reply.json().ok() == Some(serde_json::json!({"status": "ok"}));
    Ok(check("acknowledge", start, "200 {\"status\":\"ok\"}", passed, &reply))
}

pub async fn test_invalid_json(client: &WebhookClient) -> Result<TestResult> {
    let start = Instant::now();
    println!("\n{}", "=== TEST: Invalid JSON ===".bright_cyan().bold());

    let reply = client.post_raw("{\"event\": ").await?;
    print_reply("invalid-json", &reply);

    let passed = reply.status == 400 && reply.body == "Invalid JSON received";
    Ok(check("invalid_json", start, "400 Invalid JSON received", passed, &reply))
}

pub async fn test_wrong_method(client: &WebhookClient) -> Result<TestResult> {
    let start = Instant::now();
    println!("\n{}", "=== TEST: Wrong Method ===".bright_cyan().bold());

    let reply = client.get().await?;
    print_reply("wrong-method", &reply);

    let passed = reply.status == 404;
    Ok(check("wrong_method", start, "404 Not Found", passed, &reply))
}

/// Posts to a path next to the configured one.
pub async fn test_wrong_path(base_url: &str) -> Result<TestResult> {
    let start = Instant::now();
    println!("\n{}", "=== TEST: Wrong Path ===".bright_cyan().bold());

    let client = WebhookClient::new(format!("{}/not-the-webhook", base_url.trim_end_matches('/')));
    let reply = client.post_json(&serde_json::json!({})).await?;
    print_reply("wrong-path", &reply);

    let passed = reply.status == 404;
    Ok(check("wrong_path", start, "404 Not Found", passed, &reply))
}
